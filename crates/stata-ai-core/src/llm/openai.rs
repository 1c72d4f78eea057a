use crate::config::AiConfig;
use crate::error::{AiError, Result};
use crate::llm::traits::*;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Blocking client for `POST {base_url}/chat/completions`.
///
/// One attempt per call, no retries. Connection, DNS and timeout failures are
/// network errors; a non-2xx reply is an API error carrying the status.
/// The connection pool lives for the whole session; the timeout comes from
/// the configuration on each call.
#[derive(Debug, Clone)]
pub struct HttpChatClient {
    client: reqwest::blocking::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f64,
    stream: bool,
}

impl HttpChatClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }

    pub fn endpoint(base_url: &str) -> String {
        format!("{}/chat/completions", base_url.trim_end_matches('/'))
    }
}

impl Default for HttpChatClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatClient for HttpChatClient {
    fn chat(&self, config: &AiConfig, messages: &[Message]) -> Result<ChatCompletion> {
        let url = Self::endpoint(&config.base_url);

        let request_body = ChatRequest {
            model: &config.model,
            messages,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            stream: false,
        };

        tracing::debug!(
            "POST {} (model={}, messages={})",
            url,
            config.model,
            messages.len()
        );

        let response = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(config.timeout))
            .header("Authorization", format!("Bearer {}", config.api_key))
            .json(&request_body)
            .send()
            .map_err(classify_transport_error)?;

        let status = response.status();
        let response_text = response.text().map_err(classify_transport_error)?;

        if !status.is_success() {
            tracing::debug!("chat request failed with status {}", status);
            return Err(AiError::Api {
                status: status.as_u16(),
                message: extract_error_message(&response_text),
            });
        }

        let body: Value = serde_json::from_str(&response_text)
            .map_err(|e| AiError::Request(format!("failed to decode response: {e}")))?;

        Ok(ChatCompletion::from_value(body))
    }
}

/// `error.message` from a JSON error body, or the raw body text.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            json.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

fn classify_transport_error(e: reqwest::Error) -> AiError {
    if e.is_connect() || e.is_timeout() {
        AiError::Network(error_chain(&e))
    } else {
        AiError::Request(error_chain(&e))
    }
}

/// The error and its sources, outermost first.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut text = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_trims_trailing_slash() {
        assert_eq!(
            HttpChatClient::endpoint("https://api.openai.com/v1/"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            HttpChatClient::endpoint("http://localhost:11434/v1"),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[test]
    fn error_message_prefers_json_field() {
        assert_eq!(
            extract_error_message(r#"{"error":{"message":"invalid api key","type":"auth"}}"#),
            "invalid api key"
        );
    }

    #[test]
    fn error_message_falls_back_to_raw_body() {
        assert_eq!(extract_error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(
            extract_error_message(r#"{"error":"quota exceeded"}"#),
            r#"{"error":"quota exceeded"}"#
        );
    }

    #[test]
    fn request_body_shape() {
        let messages = vec![Message::system("s"), Message::user("q")];
        let body = serde_json::to_value(ChatRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            max_tokens: 4096,
            temperature: 0.7,
            stream: false,
        })
        .unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["stream"], false);
    }
}
