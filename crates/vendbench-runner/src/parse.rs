//! LLM response parsing.
//!
//! The decision protocol expects a JSON object with a `thought` string and
//! an `action` object holding `tool` and `parameters`. Models often wrap
//! the JSON in a markdown fence or leave trailing commas, so parsing tries
//! several recovery strategies before giving up:
//!
//! 1. Direct `serde_json` parse
//! 2. Extract JSON from a markdown code block
//! 3. Strip trailing commas and retry
//! 4. Code block, then strip trailing commas

use serde_json::Value;
use vendbench_types::Action;

use crate::error::RunnerError;

/// Thought used when the response has none.
pub const NO_THOUGHT: &str = "No thought provided.";

/// A successfully parsed decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDecision {
    /// The model's reasoning.
    pub thought: String,
    /// The proposed action.
    pub action: Action,
}

/// Parse a decision response.
///
/// Missing `action`, missing or non-string `action.tool`, or text that is
/// not JSON under any strategy is a [`RunnerError::Parse`]. `parameters`
/// defaults to `{}`.
pub fn parse_decision(raw: &str) -> Result<ParsedDecision, RunnerError> {
    let json = parse_json_object(raw)?;

    let thought = json
        .get("thought")
        .and_then(Value::as_str)
        .unwrap_or(NO_THOUGHT)
        .to_owned();

    let action = json
        .get("action")
        .filter(|a| a.is_object())
        .ok_or_else(|| RunnerError::Parse("Response missing 'action' object.".to_owned()))?;
    let tool = action
        .get("tool")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| RunnerError::Parse("Action missing 'tool' name.".to_owned()))?;
    let parameters = action
        .get("parameters")
        .filter(|p| !p.is_null())
        .cloned()
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

    Ok(ParsedDecision {
        thought,
        action: Action::new(tool, parameters),
    })
}

/// Parse `raw` into a JSON object using the recovery strategies.
pub fn parse_json_object(raw: &str) -> Result<Value, RunnerError> {
    let trimmed = raw.trim();

    let candidates = [
        Some(trimmed.to_owned()),
        extract_json_from_codeblock(trimmed).map(ToOwned::to_owned),
        Some(strip_trailing_commas(trimmed)),
        extract_json_from_codeblock(trimmed).map(strip_trailing_commas),
    ];
    for candidate in candidates.iter().flatten() {
        if let Ok(value) = serde_json::from_str::<Value>(candidate)
            && value.is_object()
        {
            return Ok(value);
        }
    }

    Err(RunnerError::Parse(format!(
        "all parse strategies failed for: {trimmed}"
    )))
}

/// Extract the body of the first markdown code block.
fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    // Look for ```json ... ``` or ``` ... ```
    let body_start = |tag: &str| {
        text.find(tag).map(|i| {
            let after_tag = i.saturating_add(tag.len());
            text.get(after_tag..)
                .and_then(|s| s.find('\n'))
                .and_then(|nl| after_tag.checked_add(nl))
                .and_then(|pos| pos.checked_add(1))
                .unwrap_or(after_tag)
        })
    };

    let start = body_start("```json").or_else(|| body_start("```"))?;
    let remaining = text.get(start..)?;
    let end = remaining.find("```")?;
    remaining.get(..end).map(str::trim)
}

/// Strip trailing commas before closing braces and brackets.
fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len());

    for (i, &c) in chars.iter().enumerate() {
        if c == ',' {
            let next = chars
                .iter()
                .skip(i.saturating_add(1))
                .find(|ch| !ch.is_whitespace());
            if matches!(next, Some('}' | ']')) {
                continue;
            }
        }
        result.push(c);
    }
    result
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parse_clean_json() {
        let raw = r#"{"thought": "Restock soda", "action": {"tool": "restock_machine", "parameters": {"items": [{"name": "Soda", "quantity": 10}]}}}"#;
        let Ok(decision) = parse_decision(raw) else {
            panic!("clean JSON should parse");
        };
        assert_eq!(decision.thought, "Restock soda");
        assert_eq!(decision.action.tool, "restock_machine");
        assert_eq!(
            decision.action.parameters,
            json!({"items": [{"name": "Soda", "quantity": 10}]})
        );
    }

    #[test]
    fn parse_fenced_json_with_trailing_commas() {
        let raw = "Sure!\n```json\n{\"thought\": \"t\", \"action\": {\"tool\": \"idle\", \"parameters\": {},},}\n```\nDone.";
        let decision = parse_decision(raw);
        assert_eq!(decision.map(|d| d.action.tool).ok().as_deref(), Some("idle"));
    }

    #[test]
    fn defaults_for_thought_and_parameters() {
        let Ok(decision) = parse_decision(r#"{"action": {"tool": "collect_cash"}}"#) else {
            panic!("action without parameters should parse");
        };
        assert_eq!(decision.thought, NO_THOUGHT);
        assert_eq!(decision.action.parameters, json!({}));
    }

    #[test]
    fn missing_action_or_tool_is_an_error() {
        assert!(parse_decision(r#"{"thought": "hmm"}"#).is_err());
        assert!(parse_decision(r#"{"thought": "hmm", "action": {"parameters": {}}}"#).is_err());
        assert!(parse_decision(r#"{"action": "idle"}"#).is_err());
        assert!(parse_decision("I think I will idle.").is_err());
        assert!(parse_decision("[1, 2]").is_err());
    }

    #[test]
    fn strip_trailing_commas_basic() {
        assert_eq!(strip_trailing_commas(r#"{"a": 1, "b": 2,}"#), r#"{"a": 1, "b": 2}"#);
        assert_eq!(strip_trailing_commas("[1, 2, 3,\n]"), "[1, 2, 3\n]");
    }

    #[test]
    fn extract_unlabelled_codeblock() {
        assert_eq!(extract_json_from_codeblock("```\n{\"a\": 1}\n```"), Some("{\"a\": 1}"));
        assert_eq!(extract_json_from_codeblock("no fence"), None);
    }
}
