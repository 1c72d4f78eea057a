// Library interface for stata-ai-cli so integration tests can drive the chat loop.

pub mod commands;
pub mod repl;

pub use commands::{handle_command, CommandResult};
pub use repl::run_chat;
