pub mod locks;
pub mod store;

use serde::{Deserialize, Serialize};

/// Server-assigned prompt identifier.
pub type PromptId = i64;

pub(crate) const PROMPTS_PATH: &str = "/api/v1/prompts";

/// A named template record targeting a generation model.
///
/// `id` is assigned by the remote store and never changes after creation.
/// Field contents are not validated on the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: PromptId,
    pub key: String,
    pub prompt: String,
    pub model: String,
}

/// Payload for creating a prompt. The remote store validates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPrompt {
    pub key: String,
    pub prompt: String,
    pub model: String,
}

impl NewPrompt {
    pub fn new(key: impl Into<String>, prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            prompt: prompt.into(),
            model: model.into(),
        }
    }
}

/// Partial update. Fields left as `None` are omitted from the request body,
/// so the remote store keeps its current value for them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl PromptUpdate {
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_none() && self.prompt.is_none() && self.model.is_none()
    }
}

pub(crate) fn prompt_path(id: PromptId) -> String {
    format!("{PROMPTS_PATH}/{id}")
}
