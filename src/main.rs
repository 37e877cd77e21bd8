//! ragbox CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use ragbox::{
    commands::{
        cmd_ask, cmd_chat, cmd_collections, cmd_sync, print_collections, print_sync_stats,
        Services, SyncOptions,
    },
    config::Config,
    error::Result,
    progress::LogWriterFactory,
};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "ragbox")]
#[command(version, about = "Terminal RAG sandbox: ingest text collections and chat with them", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync the data folder, then chat with a collection (default)
    Chat,

    /// Ingest the data folder into the vector storage
    Ingest {
        /// Only ingest this collection
        #[arg(long)]
        collection: Option<String>,

        /// Delete the existing vector storage first
        #[arg(long)]
        reset: bool,
    },

    /// Ask a single question
    Ask {
        /// Collection to search
        collection: String,

        /// The question
        question: String,
    },

    /// List data and indexed collections
    Collections,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory))
        .with(filter)
        .init();

    let command = cli.command.unwrap_or(Commands::Chat);

    // Handle completions command (doesn't need config or credentials)
    if let Commands::Completions { shell } = command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "ragbox", &mut std::io::stdout());
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;

    // Collections only looks at the filesystem
    if let Commands::Collections = command {
        let info = cmd_collections(&config)?;
        print_collections(&info, &config);
        return Ok(());
    }

    let services = Services::connect(config).await?;

    match command {
        Commands::Chat => cmd_chat(&services).await?,

        Commands::Ingest { collection, reset } => {
            let stats = cmd_sync(&services, SyncOptions { collection, reset }).await?;
            print_sync_stats(&stats);
        }

        Commands::Ask {
            collection,
            question,
        } => {
            let mut session = services.session();
            let model_name = services.model.model_name().to_string();
            cmd_ask(
                &mut session,
                &model_name,
                &collection,
                &question,
                services.config.chat.stream,
            )
            .await?;
        }

        Commands::Collections | Commands::Completions { .. } => unreachable!(),
    }

    Ok(())
}
