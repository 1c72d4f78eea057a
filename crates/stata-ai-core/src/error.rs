use thiserror::Error;

#[derive(Error, Debug)]
pub enum AiError {
    #[error("Failed to load configuration: {0}")]
    ConfigLoad(String),

    #[error("Failed to save configuration: {0}")]
    ConfigSave(String),

    #[error("Unknown config key: {0}")]
    UnknownConfigKey(String),

    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Coercion {
        key: String,
        value: String,
        reason: String,
    },

    #[error("API key is not set")]
    MissingApiKey,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request error: {0}")]
    Request(String),

    #[error("No valid response received")]
    EmptyResponse,
}

impl AiError {
    pub fn coercion(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Coercion {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// True when the failure text suggests the request outgrew the model's context window.
    pub fn hints_context_overflow(&self) -> bool {
        self.to_string().to_lowercase().contains("context")
    }
}

pub type Result<T> = std::result::Result<T, AiError>;
