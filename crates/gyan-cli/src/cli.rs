use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "gyan")]
#[command(about = "gyan - chat with Gemini from the terminal")]
#[command(version)]
pub struct Cli {
    /// Subcommand to execute (defaults to chat if not provided)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file path (defaults to <config dir>/gyan/config.toml)
    #[arg(short = 'C', long, global = true, env = "GYAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Model name (overrides config file and environment)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Total attempts per request, first attempt included
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    /// Initial backoff delay in milliseconds (doubles on every retry)
    #[arg(long, global = true)]
    pub base_delay_ms: Option<u64>,

    /// Skip the anonymous sign-in
    #[arg(long = "no-identity", global = true)]
    pub no_identity: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Interactive chat session (default)
    Chat,

    /// Send a single message and print the reply
    Ask {
        /// Message text; multiple words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration with secrets redacted
    Config,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
