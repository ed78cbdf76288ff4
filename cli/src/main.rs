mod config;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use config::{Config, ConfigError, BASE_URL_VAR, TIMEOUT_VAR, TOKEN_VAR};
use linkwarden_core::{ApiError, LinkwardenClient, ToolError, ToolRegistry, UreqTransport};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "linkwarden",
    version,
    about = "Call Linkwarden bookmarking tools from the command line"
)]
struct Cli {
    /// Overrides API_BASE_URL.
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Overrides LINKWARDEN_ACCESS_TOKEN.
    #[arg(long, global = true)]
    token: Option<String>,
    /// Request timeout in seconds. Overrides LINKWARDEN_TIMEOUT_SECS.
    #[arg(long, global = true)]
    timeout: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the registered tools.
    Tools {
        /// Print full JSON definitions including schemas.
        #[arg(long)]
        schemas: bool,
    },
    /// Invoke a tool with JSON arguments.
    Call {
        tool: String,
        #[arg(default_value = "{}")]
        args: String,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] ApiError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("arguments are not valid JSON: {0}")]
    Arguments(#[source] serde_json::Error),

    #[error("failed to render output: {0}")]
    Output(#[source] serde_json::Error),
}

impl CliError {
    fn user_message(&self) -> String {
        match self {
            CliError::Tool(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}

fn main() -> ExitCode {
    // Before tracing, so RUST_LOG may come from the file.
    let env_file = dotenvy::dotenv().ok();
    init_tracing();
    if let Some(path) = env_file {
        debug!(path = %path.display(), "Loaded environment file");
    }
    let cli = Cli::parse();
    debug!(command = ?cli.command, "CLI arguments parsed");

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Command failed");
            eprintln!("{}", err.user_message());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Tools { schemas } => {
            let registry = ToolRegistry::<UreqTransport>::new();
            if *schemas {
                let definitions = Value::Array(registry.definitions());
                println!("{}", serde_json::to_string_pretty(&definitions).map_err(CliError::Output)?);
            } else {
                for tool in registry.iter() {
                    println!("{:<22} {}", tool.name, tool.description);
                }
            }
            Ok(())
        }
        Command::Call { tool, args } => {
            let arguments: Value = serde_json::from_str(args).map_err(CliError::Arguments)?;
            let config = resolve_config(cli)?;
            info!(base_url = %config.base_url, tool = %tool, "Calling tool");

            let client = LinkwardenClient::with_timeout(
                &config.base_url,
                &config.access_token,
                config.timeout,
            )?;
            let registry = ToolRegistry::new();
            let result = registry.invoke(&client, tool, arguments)?;
            println!("{}", serde_json::to_string_pretty(&result).map_err(CliError::Output)?);
            Ok(())
        }
    }
}

/// Command-line flags take precedence over the environment.
fn resolve_config(cli: &Cli) -> Result<Config, ConfigError> {
    Config::from_lookup(|var| {
        let flag = match var {
            BASE_URL_VAR => cli.base_url.clone(),
            TOKEN_VAR => cli.token.clone(),
            TIMEOUT_VAR => cli.timeout.map(|secs| secs.to_string()),
            _ => None,
        };
        flag.or_else(|| std::env::var(var).ok())
    })
}

/// Reads `RUST_LOG`, so any `.env` file must already be loaded.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn init_tracing() {
    fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}
