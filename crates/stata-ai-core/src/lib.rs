pub mod error;
pub mod config;
pub mod history;
pub mod llm;
pub mod console;
pub mod session;

// Re-export key types
pub use error::{AiError, Result};
pub use config::{AiConfig, ConfigImport, ConfigKey, ConfigSummary, LoadOutcome};
pub use history::ConversationHistory;
pub use llm::{ChatClient, ChatCompletion, HttpChatClient, Message, Role};
pub use console::{Console, MemoryConsole, StdoutConsole};
pub use session::{AiSession, QueryOptions, QueryOutcome};
