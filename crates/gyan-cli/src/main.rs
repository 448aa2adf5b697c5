mod cli;
mod render;
mod repl;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use gyan::engine::config::default_config_path;
use gyan::engine::identity::spawn_identity_bootstrap;
use gyan::{AppConfig, ChatState, EngineResult, ReplyKind, SubmitOutcome};
use log::{debug, error};
use render::TerminalRenderer;
use std::io;
use std::process::ExitCode;
use std::sync::Arc;

/// Exit code for `ask` when the reply was a fallback message.
const EXIT_NO_ANSWER: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is normal; real environment variables still apply.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .format_timestamp_millis()
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            eprintln!("gyan: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> EngineResult<ExitCode> {
    if let Some(Commands::Completions { shell }) = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "gyan", &mut io::stdout());
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config(&cli)?;

    match cli.command {
        None | Some(Commands::Chat) => chat(&config).await,
        Some(Commands::Ask { text, json }) => ask(&config, &text.join(" "), json).await,
        Some(Commands::Config) => {
            match cli.config.clone().or_else(default_config_path) {
                Some(path) if path.is_file() => println!("# file: {}", path.display()),
                Some(path) => println!("# file: {} (not present, using defaults)", path.display()),
                None => println!("# file: none"),
            }
            print!("{}", config.redacted().to_toml()?);
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Completions { .. }) => Ok(ExitCode::SUCCESS),
    }
}

fn load_config(cli: &Cli) -> EngineResult<AppConfig> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(model) = &cli.model {
        config.gemini.model = model.clone();
    }
    if let Some(max_retries) = cli.max_retries {
        config.retry.max_retries = max_retries;
    }
    if let Some(base_delay_ms) = cli.base_delay_ms {
        config.retry.base_delay_ms = base_delay_ms;
    }
    if cli.no_identity {
        config.identity.enabled = false;
    }
    debug!("effective config:\n{}", config.redacted().to_toml()?);
    Ok(config)
}

async fn ask(config: &AppConfig, text: &str, json: bool) -> EngineResult<ExitCode> {
    let state = Arc::new(ChatState::new());
    let session = gyan::connect(config, state)?;

    let outcome = session.submit(text).await;
    let kind = outcome.reply_kind();
    match outcome {
        SubmitOutcome::Rejected(reason) => {
            eprintln!("gyan: nothing to send ({:?})", reason);
            return Ok(ExitCode::from(EXIT_NO_ANSWER));
        }
        SubmitOutcome::Replied { kind, text } => {
            if json {
                println!("{}", serde_json::json!({ "kind": kind, "reply": text }));
            } else {
                println!("{}", text);
            }
        }
    }

    Ok(if kind == Some(ReplyKind::Answered) {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_NO_ANSWER)
    })
}

async fn chat(config: &AppConfig) -> EngineResult<ExitCode> {
    let state = Arc::new(ChatState::new());
    let session = Arc::new(gyan::connect(config, state.clone())?);

    let renderer = Arc::new(TerminalRenderer::new(io::stdout()));
    state.subscribe(renderer.clone());
    renderer.welcome(&state.snapshot());

    let identity = match gyan::identity_provider(config)? {
        Some(provider) => Some(spawn_identity_bootstrap(state.clone(), provider)),
        None => None,
    };

    let end = repl::run(session, &renderer, repl::spawn_stdin_reader()).await;
    debug!("[chat] loop ended: {:?}", end);

    if let Some(handle) = identity {
        handle.abort();
    }
    Ok(ExitCode::SUCCESS)
}
