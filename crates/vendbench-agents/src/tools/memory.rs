//! Tools reading and writing the agent's long-term memory.
//!
//! Memory types: `scratchpad`, `kv_store`, and `vector_db` (alias
//! `vector_database`) for similarity-searchable notes.

use serde_json::Value;

use super::{ToolContext, ToolHandler, integer_value, str_param};
use crate::error::ToolError;

/// Default number of notes returned by a search.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Hard cap on notes returned by a search.
pub const MAX_SEARCH_LIMIT: usize = 10;

const INVALID_TYPE: &str =
    "Invalid 'memory_type'. Must be 'scratchpad', 'kv_store', or 'vector_db'.";

/// `write_to_memory {memory_type, content, key?}`.
#[derive(Debug, Clone, Copy)]
pub struct WriteToMemory;

impl ToolHandler for WriteToMemory {
    fn execute(&self, params: &Value, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        let memory_type = str_param(params, "memory_type").to_lowercase();
        let content = str_param(params, "content");
        if content.is_empty() {
            return Err(ToolError::missing("'content' parameter cannot be empty."));
        }

        match memory_type.as_str() {
            "scratchpad" => {
                ctx.memory.update_scratchpad(content);
                Ok(format!(
                    "Successfully updated scratchpad with {} characters.",
                    content.chars().count()
                ))
            }
            "kv_store" => {
                let key = str_param(params, "key");
                if key.is_empty() {
                    return Err(ToolError::missing("'key' parameter is required for kv_store."));
                }
                ctx.memory.save_value(key, content);
                Ok(format!("Successfully saved value for key '{key}'."))
            }
            "vector_db" | "vector_database" => {
                let id = ctx.memory.store_note(content);
                Ok(format!(
                    "Successfully stored in vector database with ID: {id} (Total entries: {})",
                    ctx.memory.note_count()
                ))
            }
            _ => Err(ToolError::missing(INVALID_TYPE)),
        }
    }
}

/// `read_from_memory {memory_type, key?, query?, limit?}`.
#[derive(Debug, Clone, Copy)]
pub struct ReadFromMemory;

impl ToolHandler for ReadFromMemory {
    fn execute(&self, params: &Value, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        let memory_type = str_param(params, "memory_type").to_lowercase();
        match memory_type.as_str() {
            "scratchpad" => {
                let text = ctx.memory.scratchpad();
                if text.is_empty() {
                    Ok(String::from("Scratchpad is empty."))
                } else {
                    Ok(format!("Scratchpad content:\n{text}"))
                }
            }
            "kv_store" => {
                let key = str_param(params, "key");
                if key.is_empty() {
                    let keys = ctx.memory.keys();
                    if keys.is_empty() {
                        return Ok(String::from("Key-value store is empty."));
                    }
                    return Ok(format!("Available keys: {}", keys.join(", ")));
                }
                Ok(ctx
                    .memory
                    .value(key)
                    .map_or_else(|| format!("No value found for key: {key}"), str::to_owned))
            }
            "vector_db" | "vector_database" => {
                let query = str_param(params, "query");
                if query.is_empty() {
                    return Err(ToolError::missing(
                        "'query' parameter is required for vector_db search.",
                    ));
                }
                let limit = integer_value(params.get("limit"))
                    .and_then(|l| usize::try_from(l).ok())
                    .unwrap_or(DEFAULT_SEARCH_LIMIT)
                    .clamp(1, MAX_SEARCH_LIMIT);
                let hits = ctx.memory.search(query, limit);
                if hits.is_empty() {
                    return Ok(format!("No relevant memories found for query: {query}"));
                }
                let texts: Vec<&str> = hits.iter().map(|entry| entry.text.as_str()).collect();
                Ok(format!(
                    "Relevant memories for '{query}':\n{}",
                    texts.join("\n---\n")
                ))
            }
            _ => Err(ToolError::missing(INVALID_TYPE)),
        }
    }
}
