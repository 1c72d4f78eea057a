use crate::config::AiConfig;
use crate::error::{AiError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// A decoded chat-completion body, kept whole so callers can echo it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletion {
    body: Value,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletion {
    pub fn from_value(body: Value) -> Self {
        Self { body }
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn pretty(&self) -> String {
        serde_json::to_string_pretty(&self.body).unwrap_or_else(|_| self.body.to_string())
    }

    /// Content of the first choice.
    ///
    /// `Ok(None)` when `choices` is absent or empty. A first choice without a
    /// `message` object is a malformed reply and becomes a request error.
    pub fn first_reply(&self) -> Result<Option<String>> {
        let Some(first) = self
            .body
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
        else {
            return Ok(None);
        };

        let choice: Choice = serde_json::from_value(first.clone())
            .map_err(|e| AiError::Request(format!("malformed choice in response: {e}")))?;
        Ok(Some(choice.message.content.unwrap_or_default()))
    }
}

/// One blocking chat round-trip against an OpenAI-compatible endpoint.
///
/// The configuration is passed on every call, so implementations always see
/// the caller's current settings.
pub trait ChatClient {
    fn chat(&self, config: &AiConfig, messages: &[Message]) -> Result<ChatCompletion>;
}

impl<T: ChatClient + ?Sized> ChatClient for Box<T> {
    fn chat(&self, config: &AiConfig, messages: &[Message]) -> Result<ChatCompletion> {
        (**self).chat(config, messages)
    }
}
