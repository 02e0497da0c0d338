//! EVOS CLI: drive the browser agent engine from a terminal.
//!
//! Commands:
//! - `onboard`  Create `~/.evos` and a default config
//! - `status`   Probe the engines and show which one is active
//! - `tools`    Print the browser tool catalogue
//! - `run`      Run a ReAct task against a page context
//! - `ask`      One-shot question about a page

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use evos_core::Mode;

mod bridge;
mod commands;

#[derive(Parser)]
#[command(
    name = "evos",
    about = "EVOS: browser agent engine",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Onboard,

    /// Show engine status
    Status,

    /// List the browser tools offered to the model
    Tools,

    /// Run a task through the ReAct loop
    Run {
        /// The instruction to carry out
        #[arg(short, long)]
        task: String,

        /// JSON file with the page context (url, title, content, interactive_elements)
        #[arg(short, long)]
        context: Option<PathBuf>,

        /// Switch to this engine before running
        #[arg(short, long)]
        mode: Option<Mode>,

        /// Override the step budget
        #[arg(long)]
        max_steps: Option<u32>,

        /// Execute actions through a JSON-lines bridge on stdin/stdout
        #[arg(long)]
        bridge: bool,

        /// Print the final task as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ask a quick question about the page
    Ask {
        #[arg(short, long)]
        message: String,

        #[arg(short, long)]
        context: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays usable for --json and --bridge
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Status => commands::status::run().await?,
        Commands::Tools => commands::tools::run().await?,
        Commands::Run {
            task,
            context,
            mode,
            max_steps,
            bridge,
            json,
        } => {
            commands::run::run(commands::run::RunArgs {
                task,
                context,
                mode,
                max_steps,
                bridge,
                json,
            })
            .await?
        }
        Commands::Ask { message, context } => commands::ask::run(message, context).await?,
    }

    Ok(())
}
