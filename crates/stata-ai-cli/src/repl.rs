use std::io::{BufRead, Write};

use anyhow::Result;
use stata_ai_core::{AiSession, ChatClient, Console, QueryOptions};

use crate::commands::{handle_command, CommandResult};

/// Read questions line by line until EOF or `/exit`, keeping one conversation.
///
/// The prompt marker goes to `prompt`; everything else goes through the
/// session's console.
pub fn run_chat<C, K, R, W>(
    session: &mut AiSession<C, K>,
    options: &QueryOptions,
    mut input: R,
    mut prompt: W,
) -> Result<()>
where
    C: ChatClient,
    K: Console,
    R: BufRead,
    W: Write,
{
    loop {
        write!(prompt, "> ")?;
        prompt.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match handle_command(line) {
            CommandResult::Quit => break,
            CommandResult::Clear => {
                session.clear_history();
                session.console().display("Conversation history cleared.");
            }
            CommandResult::ShowConfig => {
                session.show_config();
            }
            CommandResult::SetConfig { key, value } => {
                if let Err(e) = session.set_config(&key, &value) {
                    session.console().display(&format!("Error: {e}"));
                }
            }
            CommandResult::Message(text) => session.console().display(&text),
            CommandResult::NotACommand => {
                session.query(line, options);
            }
        }
    }

    tracing::debug!("chat loop finished");
    Ok(())
}
