/// Result of processing a slash command typed in the chat loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Display a message to the user.
    Message(String),
    /// Clear the conversation history.
    Clear,
    /// Leave the chat loop.
    Quit,
    /// Show the masked configuration.
    ShowConfig,
    /// Set one config field and persist it.
    SetConfig { key: String, value: String },
    /// Not a command - send as a question.
    NotACommand,
}

pub fn handle_command(input: &str) -> CommandResult {
    let parts: Vec<&str> = input.trim().splitn(2, ' ').collect();
    let cmd = parts[0];
    let arg = parts.get(1).map(|s| s.trim()).unwrap_or("");

    match cmd {
        "/help" | "/h" => show_help(),
        "/exit" | "/quit" | "/q" => CommandResult::Quit,
        "/clear" => CommandResult::Clear,
        "/config" => {
            if arg.is_empty() {
                return CommandResult::ShowConfig;
            }
            match arg.split_once(char::is_whitespace) {
                Some((key, value)) => CommandResult::SetConfig {
                    key: key.to_string(),
                    value: unquote(value.trim()).to_string(),
                },
                None => CommandResult::Message(
                    "Usage: /config <key> <value>\nKeys: apikey, baseurl, model, max_tokens, temperature, timeout".into(),
                ),
            }
        }
        "/version" => CommandResult::Message(format!("Stata AI CLI v{}", env!("CARGO_PKG_VERSION"))),
        _ => {
            if input.trim_start().starts_with('/') {
                CommandResult::Message(format!("Unknown command: {cmd}. Type /help for commands."))
            } else {
                CommandResult::NotACommand
            }
        }
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn show_help() -> CommandResult {
    let help_text = "\
Commands:
  /config                   Show the current configuration
  /config <key> <value>     Set and save a config value
                            (apikey, baseurl, model, max_tokens, temperature, timeout)
  /clear                    Clear conversation history
  /version                  Show version information
  /help, /h                 Show this help message
  /exit, /quit, /q          Leave the chat

Anything else is sent to the model as a question.";

    CommandResult::Message(help_text.into())
}
