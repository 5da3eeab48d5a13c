//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use genie_core::{config, logging};

mod commands;

#[derive(Parser)]
#[command(name = "genie")]
#[command(version)]
#[command(about = "Terminal client for streaming multi-step agent sessions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sends a query and prints the agent's progress and answer
    Ask {
        /// The query to send
        query: String,

        /// Deep-think mode (thoughts go to the action panel)
        #[arg(long)]
        deep_think: bool,

        /// Let the agent search the web
        #[arg(long)]
        search: bool,

        /// Requested output style (e.g. html, docs)
        #[arg(long, value_name = "STYLE")]
        output_style: Option<String>,

        /// Continue an existing session instead of starting a new one
        #[arg(long, value_name = "ID")]
        session: Option<String>,

        /// Attach a file (repeatable)
        #[arg(long = "file", value_name = "PATH")]
        files: Vec<PathBuf>,

        /// Session list to record the query in [default: $GENIE_HOME/sessions.json]
        #[arg(long, value_name = "FILE")]
        sessions: Option<PathBuf>,
    },
    /// Manage the saved session list
    Sessions {
        #[command(subcommand)]
        command: SessionsCommands,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum SessionsCommands {
    /// Lists sessions grouped by recency
    List {
        /// Session list JSON file [default: $GENIE_HOME/sessions.json]
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
    },
    /// Renames a session
    Rename {
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
        #[arg(value_name = "ID")]
        id: String,
        #[arg(value_name = "TITLE")]
        title: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Deletes a session
    Delete {
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
        #[arg(value_name = "ID")]
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Prints the config file path
    Path,
    /// Writes a default config file
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        // config commands must work even when the file on disk is broken
        Commands::Config { command } => match command {
            ConfigCommands::Path => commands::config::path(),
            ConfigCommands::Init => commands::config::init(),
        },
        Commands::Ask {
            query,
            deep_think,
            search,
            output_style,
            session,
            files,
            sessions,
        } => {
            let sessions = sessions_file(sessions)?;
            let config = load_config()?;
            let _log_guard = logging::init(&config.logging).context("init logging")?;
            commands::ask::run(
                commands::ask::AskOptions {
                    query,
                    deep_think,
                    search,
                    output_style,
                    session,
                    files,
                    sessions,
                },
                &config,
            )
            .await
        }
        Commands::Sessions { command } => {
            let config = load_config()?;
            let _log_guard = logging::init(&config.logging).context("init logging")?;
            match command {
                SessionsCommands::List { file } => {
                    commands::sessions::list(&sessions_file(file)?)
                }
                SessionsCommands::Rename {
                    file,
                    id,
                    title,
                    yes,
                } => commands::sessions::rename(&sessions_file(file)?, &id, &title, yes),
                SessionsCommands::Delete { file, id, yes } => {
                    commands::sessions::delete(&sessions_file(file)?, &id, yes)
                }
            }
        }
    }
}

fn load_config() -> Result<config::Config> {
    config::Config::load().context("load config")
}

fn sessions_file(file: Option<PathBuf>) -> Result<PathBuf> {
    match file {
        Some(file) => Ok(file),
        None => config::paths::sessions_path().context("resolve sessions file"),
    }
}
