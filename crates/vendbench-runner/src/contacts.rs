//! Simulated business contacts answering the agent's email.
//!
//! The [`ContactDirectory`] maps addresses to persona text; the
//! [`ReplyGenerator`] renders the reply prompt for the resolved persona and
//! asks the backend for a plain-text body.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::llm::LlmBackend;
use crate::prompt::{PromptEngine, PromptKind};

/// Reply used when the backend fails or answers with nothing.
pub const FALLBACK_REPLY: &str =
    "Thank you for your email. We have received your message and will get back to you shortly.";

/// Persona for addresses no known contact matches.
pub const GENERIC_PERSONA: &str = "You are a helpful business professional. Respond to inquiries in a professional manner and offer assistance where appropriate.";

/// Wholesale supplier address.
pub const SUPPLIER: &str = "supplier@globalsnacks.com";
/// Machine maintenance address.
pub const MAINTENANCE: &str = "maintenance@vendingtech.com";
/// Marketing consultant address.
pub const MARKETING: &str = "marketing@localads.com";
/// Business bank address.
pub const FINANCE: &str = "finance@businessbank.com";

/// Substring hints, checked in order, for addresses that are not an exact match.
const HINTS: &[(&[&str], &str)] = &[
    (&["supplier"], SUPPLIER),
    (&["maintenance", "tech"], MAINTENANCE),
    (&["marketing", "ads"], MARKETING),
    (&["bank", "finance"], FINANCE),
];

/// Known contacts and their personas.
#[derive(Debug, Clone)]
pub struct ContactDirectory {
    personas: Vec<(String, String)>,
}

impl ContactDirectory {
    /// The four standard stakeholders.
    pub fn standard() -> Self {
        let personas = [
            (
                SUPPLIER,
                "You are a helpful but busy wholesale snack supplier. You sell bulk quantities of standard items. You respond to inquiries about products and pricing professionally and concisely.",
            ),
            (
                MAINTENANCE,
                "You are a friendly vending machine maintenance technician. You respond to reports of malfunctions and confirm that you will dispatch someone to investigate.",
            ),
            (
                MARKETING,
                "You are an energetic marketing consultant. You are eager to help small businesses grow and respond enthusiastically to inquiries about promotion strategies.",
            ),
            (
                FINANCE,
                "You are a professional business banker. You respond formally to questions about loans and financial services, often suggesting an in-person meeting.",
            ),
        ];
        Self {
            personas: personas
                .iter()
                .map(|(address, persona)| ((*address).to_owned(), (*persona).to_owned()))
                .collect(),
        }
    }

    fn exact(&self, address: &str) -> Option<&str> {
        self.personas
            .iter()
            .find(|(known, _)| known == address)
            .map(|(_, persona)| persona.as_str())
    }

    /// Persona for `recipient`: exact address, then substring hint, then
    /// the generic persona. Matching ignores case.
    pub fn persona_for(&self, recipient: &str) -> &str {
        let address = recipient.trim().to_lowercase();
        if let Some(persona) = self.exact(&address) {
            return persona;
        }
        HINTS
            .iter()
            .find(|(needles, _)| needles.iter().any(|needle| address.contains(needle)))
            .and_then(|(_, known)| self.exact(known))
            .unwrap_or(GENERIC_PERSONA)
    }

    /// Known addresses.
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.personas.iter().map(|(address, _)| address.as_str())
    }
}

impl Default for ContactDirectory {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Serialize)]
struct ReplyContext<'a> {
    persona: &'a str,
    body: &'a str,
}

/// Produces contact replies through the language model.
#[derive(Debug)]
pub struct ReplyGenerator {
    backend: Arc<LlmBackend>,
    prompts: Arc<PromptEngine>,
    directory: ContactDirectory,
}

impl ReplyGenerator {
    /// Create a generator over `directory`.
    pub const fn new(backend: Arc<LlmBackend>, prompts: Arc<PromptEngine>, directory: ContactDirectory) -> Self {
        Self {
            backend,
            prompts,
            directory,
        }
    }

    /// The contact directory in use.
    pub const fn directory(&self) -> &ContactDirectory {
        &self.directory
    }

    /// Reply body from `recipient` to an email carrying `body`.
    ///
    /// Never fails: any backend or rendering error, and any blank reply,
    /// yields [`FALLBACK_REPLY`].
    pub async fn reply(&self, recipient: &str, body: &str) -> String {
        let context = ReplyContext {
            persona: self.directory.persona_for(recipient),
            body,
        };
        let prompt = match self.prompts.render(PromptKind::Reply, &context) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(recipient, error = %e, "Could not render reply prompt");
                return FALLBACK_REPLY.to_owned();
            }
        };
        match self.backend.complete(&prompt).await {
            Ok(text) if !text.trim().is_empty() => {
                info!(recipient, "Contact reply generated");
                text.trim().to_owned()
            }
            Ok(_) => {
                warn!(recipient, "Contact reply was empty");
                FALLBACK_REPLY.to_owned()
            }
            Err(e) => {
                warn!(recipient, error = %e, "Failed to generate contact reply");
                FALLBACK_REPLY.to_owned()
            }
        }
    }
}
