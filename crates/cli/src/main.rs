//! nexagent CLI.
//!
//! Commands:
//! - `serve`       Start the HTTP gateway
//! - `run`         Serve one request from the terminal
//! - `tools`       List registered tools
//! - `assistants`  List assistants
//! - `status`      Show effective settings and provider keys
//! - `config`      Show, locate, validate or initialize configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::run::RunArgs;

#[derive(Parser)]
#[command(
    name = "nexagent",
    about = "nexagent: tool-orchestrating LLM agent service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (default: ~/.nexagent/config.toml)
    #[arg(long, global = true, env = "NEXAGENT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Override the bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one request and print the answer
    Run(RunArgs),

    /// List tools registered by this configuration
    Tools {
        #[arg(long)]
        json: bool,
    },

    /// List assistants
    Assistants {
        #[arg(long)]
        json: bool,
    },

    /// Show effective settings
    Status,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (secrets redacted)
    Show,
    /// Print the config file path
    Path,
    /// Load the configuration and report problems
    Validate,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Serve { host, port } => {
            let config = commands::load_config(config_path)?;
            commands::serve::run(config, host, port).await?
        }
        Commands::Run(args) => {
            let config = commands::load_config(config_path)?;
            commands::run::run(&config, args).await?
        }
        Commands::Tools { json } => {
            let config = commands::load_config(config_path)?;
            commands::tools::run(&config, json)?
        }
        Commands::Assistants { json } => {
            let config = commands::load_config(config_path)?;
            commands::assistants::run(&config, json)?
        }
        Commands::Status => {
            let config = commands::load_config(config_path)?;
            commands::status::run(&config)
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config = commands::load_config(config_path)?;
                commands::config_cmd::show(&config)
            }
            ConfigAction::Path => commands::config_cmd::path(config_path),
            ConfigAction::Validate => commands::config_cmd::validate(config_path)?,
            ConfigAction::Init { force } => {
                commands::config_cmd::init(config_path, force)?;
            }
        },
    }

    Ok(())
}
