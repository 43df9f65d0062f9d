//! Prompt template loading and rendering via `minijinja`.
//!
//! Every template ships built into the binary. [`PromptEngine::from_dir`]
//! layers a directory on top: any file found there replaces the built-in
//! template of the same name, so operators can tune prompts without
//! recompiling.

use std::path::Path;

use minijinja::Environment;
use serde::Serialize;

use crate::error::RunnerError;

/// Built-in templates as `(file name, source)`.
const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("system.j2", include_str!("../templates/system.j2")),
    ("reply_system.j2", include_str!("../templates/reply_system.j2")),
    ("decision.j2", include_str!("../templates/decision.j2")),
    ("instruction.j2", include_str!("../templates/instruction.j2")),
    ("demand.j2", include_str!("../templates/demand.j2")),
    ("reply.j2", include_str!("../templates/reply.j2")),
];

/// The prompts this crate renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Next action for the decision agent.
    Decision,
    /// Operator free text to a single action.
    Instruction,
    /// Initial demand parameters for one item.
    Demand,
    /// Simulated email reply from a contact.
    Reply,
}

impl PromptKind {
    const fn user_template(self) -> &'static str {
        match self {
            Self::Decision => "decision.j2",
            Self::Instruction => "instruction.j2",
            Self::Demand => "demand.j2",
            Self::Reply => "reply.j2",
        }
    }

    const fn system_template(self) -> &'static str {
        match self {
            Self::Reply => "reply_system.j2",
            Self::Decision | Self::Instruction | Self::Demand => "system.j2",
        }
    }

    /// Whether the response must be a JSON object.
    pub const fn expects_json(self) -> bool {
        !matches!(self, Self::Reply)
    }
}

/// The complete rendered prompt ready to send to an LLM backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    /// System message.
    pub system: String,
    /// User message.
    pub user: String,
    /// Whether the backend should request JSON output.
    pub expects_json: bool,
}

/// Holds the prompt templates.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl std::fmt::Debug for PromptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptEngine").finish_non_exhaustive()
    }
}

impl PromptEngine {
    /// Engine with only the built-in templates.
    pub fn builtin() -> Result<Self, RunnerError> {
        let mut env = Environment::new();
        for (name, source) in BUILTIN_TEMPLATES {
            add_template(&mut env, name, (*source).to_owned())?;
        }
        Ok(Self { env })
    }

    /// Built-in templates, overridden by any same-named file in `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self, RunnerError> {
        let mut engine = Self::builtin()?;
        for (name, _) in BUILTIN_TEMPLATES {
            let path = dir.join(name);
            if !path.is_file() {
                continue;
            }
            let source = std::fs::read_to_string(&path).map_err(|e| {
                RunnerError::Template(format!("failed to read {}: {e}", path.display()))
            })?;
            add_template(&mut engine.env, name, source)?;
            tracing::info!(template = name, path = %path.display(), "Prompt template overridden");
        }
        Ok(engine)
    }

    /// Render `kind` with `context`.
    pub fn render<C: Serialize>(&self, kind: PromptKind, context: &C) -> Result<RenderedPrompt, RunnerError> {
        Ok(RenderedPrompt {
            system: self.render_template(kind.system_template(), context)?,
            user: self.render_template(kind.user_template(), context)?,
            expects_json: kind.expects_json(),
        })
    }

    fn render_template<C: Serialize>(&self, name: &str, context: &C) -> Result<String, RunnerError> {
        self.env
            .get_template(name)
            .map_err(|e| RunnerError::Template(format!("missing {name} template: {e}")))?
            .render(context)
            .map_err(|e| RunnerError::Template(format!("{name} render failed: {e}")))
    }
}

fn add_template(env: &mut Environment<'static>, name: &str, source: String) -> Result<(), RunnerError> {
    env.add_template_owned(name.to_owned(), source)
        .map_err(|e| RunnerError::Template(format!("failed to add {name} template: {e}")))
}
