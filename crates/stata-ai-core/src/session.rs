use std::path::{Path, PathBuf};

use crate::config::{AiConfig, ConfigImport, ConfigKey, ConfigSummary, LoadOutcome};
use crate::console::{Console, StdoutConsole};
use crate::error::{AiError, Result};
use crate::history::{ConversationHistory, DEFAULT_MAX_HISTORY};
use crate::llm::{ChatClient, HttpChatClient, Message};

pub const MISSING_KEY_GUIDANCE: &str = r#"Set one with: ai, config(apikey "your-api-key")"#;
pub const CLEAR_HISTORY_HINT: &str =
    "Hint: the conversation history may be too long, try clearing it with: ai, clear";

const RULE_WIDTH: usize = 50;

/// Per-call switches for [`AiSession::query`].
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Replaces the default system prompt for this call only.
    pub system_prompt: Option<String>,
    /// Read and extend the stored conversation.
    pub use_history: bool,
    /// Echo the decoded response body before the reply.
    pub show_raw: bool,
}

impl QueryOptions {
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn without_history(mut self) -> Self {
        self.use_history = false;
        self
    }

    pub fn with_raw(mut self) -> Self {
        self.show_raw = true;
        self
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            system_prompt: None,
            use_history: true,
            show_raw: false,
        }
    }
}

/// How a query call ended. The same information has already been shown on the console.
#[derive(Debug)]
pub enum QueryOutcome {
    Replied(String),
    MissingApiKey,
    EmptyResponse,
    Failed(AiError),
}

impl QueryOutcome {
    pub fn reply(&self) -> Option<&str> {
        match self {
            QueryOutcome::Replied(reply) => Some(reply),
            _ => None,
        }
    }
}

struct SessionState {
    config: AiConfig,
    history: ConversationHistory,
    load_outcome: LoadOutcome,
}

impl SessionState {
    fn build(config_path: &Path, max_history: usize) -> Self {
        let (config, load_outcome) = AiConfig::load_from(config_path);
        if let LoadOutcome::Failed { reason } = &load_outcome {
            tracing::warn!("starting with default config: {}", reason);
        }
        Self {
            config,
            history: ConversationHistory::new().with_max_history(max_history),
            load_outcome,
        }
    }
}

/// Configuration, conversation and chat client for one host integration.
///
/// State is built lazily on the first call that needs it and lives as long as
/// the session. Every user-visible message goes through the console.
pub struct AiSession<C = HttpChatClient, K = StdoutConsole> {
    client: C,
    console: K,
    config_path: PathBuf,
    max_history: usize,
    state: Option<SessionState>,
}

impl AiSession {
    /// HTTP client, stdout console, config at `~/.stata_ai/config.json`.
    pub fn new() -> Self {
        Self::with_parts(HttpChatClient::new(), StdoutConsole, AiConfig::default_path())
    }
}

impl Default for AiSession {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ChatClient, K: Console> AiSession<C, K> {
    pub fn with_parts(client: C, console: K, config_path: impl Into<PathBuf>) -> Self {
        Self {
            client,
            console,
            config_path: config_path.into(),
            max_history: DEFAULT_MAX_HISTORY,
            state: None,
        }
    }

    pub fn with_max_history(mut self, pairs: usize) -> Self {
        self.max_history = pairs;
        if let Some(state) = self.state.take() {
            self.state = Some(SessionState {
                history: state.history.with_max_history(pairs),
                ..state
            });
        }
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn console(&self) -> &K {
        &self.console
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// (Re)build configuration and history from scratch.
    pub fn init(&mut self) -> LoadOutcome {
        let state = SessionState::build(&self.config_path, self.max_history);
        let outcome = state.load_outcome.clone();
        self.state = Some(state);
        outcome
    }

    fn state(&mut self) -> &mut SessionState {
        self.state
            .get_or_insert_with(|| SessionState::build(&self.config_path, self.max_history))
    }

    fn parts(&mut self) -> (&mut SessionState, &C, &K) {
        let state = self
            .state
            .get_or_insert_with(|| SessionState::build(&self.config_path, self.max_history));
        (state, &self.client, &self.console)
    }

    pub fn load_outcome(&mut self) -> LoadOutcome {
        self.state().load_outcome.clone()
    }

    pub fn config(&mut self) -> &AiConfig {
        &self.state().config
    }

    pub fn history(&mut self) -> &ConversationHistory {
        &self.state().history
    }

    /// Set one field by name or alias and persist it.
    ///
    /// Unknown keys and failed writes are reported on the console. A value
    /// that does not coerce to the field's type is returned as an error.
    pub fn set_config(&mut self, key: &str, value: &str) -> Result<()> {
        let (state, _, console) = self.parts();
        match state.config.set(key, value) {
            Ok(_) => Ok(()),
            Err(e @ AiError::UnknownConfigKey(_)) => {
                console.display(&e.to_string());
                Ok(())
            }
            Err(e @ AiError::ConfigSave(_)) => {
                tracing::warn!("{}", e);
                console.display(&e.to_string());
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub fn set_api_key(&mut self, api_key: &str) -> Result<()> {
        self.set_config(ConfigKey::ApiKey.host_alias(), api_key)
    }

    pub fn set_model(&mut self, model: &str) -> Result<()> {
        self.set_config(ConfigKey::Model.host_alias(), model)
    }

    /// Replace all six fields with values stashed by the host. Not persisted.
    pub fn import_config(&mut self, values: ConfigImport) -> Result<()> {
        self.state().config.import(values)
    }

    pub fn show_config(&mut self) -> ConfigSummary {
        let (state, _, console) = self.parts();
        let summary = state.config.show();
        let rule = "=".repeat(RULE_WIDTH);
        console.display("");
        console.display(&rule);
        console.display("AI configuration");
        console.display(&rule);
        for line in summary.lines() {
            console.display(&line);
        }
        console.display(&rule);
        summary
    }

    pub fn clear_history(&mut self) {
        self.state().history.clear();
        tracing::debug!("conversation history cleared");
    }

    /// `query` with default options.
    pub fn ask(&mut self, question: &str) -> QueryOutcome {
        self.query(question, &QueryOptions::default())
    }

    /// Send one question and show the reply.
    ///
    /// Never fails outward: a missing key, an empty reply and any request
    /// failure are shown on the console and reported in the outcome.
    pub fn query(&mut self, question: &str, options: &QueryOptions) -> QueryOutcome {
        let (state, client, console) = self.parts();

        if !state.config.has_api_key() {
            console.display("");
            console.display(&format!("Error: {}", AiError::MissingApiKey));
            console.display(MISSING_KEY_GUIDANCE);
            console.display("");
            return QueryOutcome::MissingApiKey;
        }

        match Self::exchange(state, client, console, question, options) {
            Ok(Some(reply)) => {
                console.display(&reply);
                QueryOutcome::Replied(reply)
            }
            Ok(None) => {
                console.display(&format!("Error: {}", AiError::EmptyResponse));
                QueryOutcome::EmptyResponse
            }
            Err(e) => {
                tracing::debug!("query failed: {}", e);
                console.display("");
                console.display(&format!("Error: {e}"));
                if options.use_history && e.hints_context_overflow() {
                    console.display(CLEAR_HISTORY_HINT);
                }
                QueryOutcome::Failed(e)
            }
        }
    }

    fn exchange(
        state: &mut SessionState,
        client: &C,
        console: &K,
        question: &str,
        options: &QueryOptions,
    ) -> Result<Option<String>> {
        let system_prompt = options.system_prompt.as_deref();
        let messages = if options.use_history {
            state.history.add_user_message(question);
            state.history.assemble(system_prompt)
        } else {
            let prompt = system_prompt
                .filter(|p| !p.is_empty())
                .unwrap_or(state.history.system_prompt());
            vec![Message::system(prompt), Message::user(question)]
        };

        let completion = client.chat(&state.config, &messages)?;

        if options.show_raw {
            let rule = "=".repeat(RULE_WIDTH);
            console.display(&rule);
            console.display("Raw response:");
            console.display(&completion.pretty());
            console.display(&rule);
        }

        let reply = completion.first_reply()?;
        if let Some(content) = &reply {
            if options.use_history {
                state.history.add_assistant_message(content.clone());
            }
        }
        Ok(reply)
    }
}
