use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use stata_ai_core::{AiConfig, AiSession, HttpChatClient, QueryOptions, QueryOutcome, StdoutConsole};

#[derive(Parser)]
#[command(name = "stata-ai")]
#[command(about = "Stata AI - ask an OpenAI-compatible model about Stata")]
#[command(version)]
struct Cli {
    /// Config file to use instead of ~/.stata_ai/config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Set one config value and save it (keys: apikey, baseurl, model, max_tokens, temperature, timeout)
    Config { key: String, value: String },

    /// Show the current configuration with the API key masked
    Show,

    /// Ask a single question
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// System prompt for this question
        #[arg(short, long)]
        system: Option<String>,

        /// Do not send or record conversation history
        #[arg(long)]
        no_history: bool,

        /// Print the raw JSON response before the answer
        #[arg(long)]
        raw: bool,
    },

    /// Interactive conversation on stdin
    Chat {
        /// System prompt for the whole conversation
        #[arg(short, long)]
        system: Option<String>,

        /// Print the raw JSON response before each answer
        #[arg(long)]
        raw: bool,
    },
}

fn query_options(system: Option<String>, no_history: bool, raw: bool) -> QueryOptions {
    QueryOptions {
        system_prompt: system,
        use_history: !no_history,
        show_raw: raw,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(AiConfig::default_path);
    let mut session = AiSession::with_parts(HttpChatClient::new(), StdoutConsole, config_path);

    match cli.command {
        Command::Config { key, value } => session.set_config(&key, &value)?,
        Command::Show => {
            session.show_config();
        }
        Command::Ask {
            question,
            system,
            no_history,
            raw,
        } => {
            let options = query_options(system, no_history, raw);
            if !matches!(
                session.query(&question.join(" "), &options),
                QueryOutcome::Replied(_)
            ) {
                std::process::exit(1);
            }
        }
        Command::Chat { system, raw } => {
            let options = query_options(system, false, raw);
            let stdin = std::io::stdin();
            stata_ai_cli::run_chat(&mut session, &options, stdin.lock(), std::io::stdout())?;
        }
    }

    Ok(())
}
