use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stackshare_application::StackStore;
use stackshare_core::generator::InstallMode;
use stackshare_core::stack::ItemType;
use stackshare_infrastructure::{ConfigService, StackPaths};

mod commands;

#[derive(Parser)]
#[command(name = "stackshare")]
#[command(about = "Stackshare - build, save, share and install stacks", long_about = None)]
struct Cli {
    /// Directory holding the stack store (defaults to the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (defaults to <config dir>/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an item to the working set
    Add {
        slug: String,
        #[arg(long = "type", short = 't', default_value = "skill")]
        item_type: ItemType,
        /// Display name (defaults to the slug)
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Remove an item from the working set by id (e.g. skill:pdf)
    Remove { id: String },
    /// Empty the working set
    Clear,
    /// Detach from the current stack and start an empty working set
    New,
    /// Show the working set
    List {
        #[arg(long = "type", short = 't')]
        item_type: Option<ItemType>,
    },
    /// Save the working set (updates the current stack, if any)
    Save {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Load a saved stack into the working set
    Load { id: String },
    /// Delete a saved stack
    Delete { id: String },
    /// Rename a saved stack
    Rename {
        id: String,
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List saved stacks
    Stacks,
    /// Export a saved stack (or the working set) as JSON
    Export {
        #[arg(long)]
        stack: Option<String>,
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Import an exported stack as a new saved stack ("-" reads stdin)
    Import { file: PathBuf },
    /// Print a share link for a saved stack (or the working set)
    Share {
        #[arg(long)]
        stack: Option<String>,
    },
    /// Decode a share link
    Open {
        url: String,
        /// Merge the shared items into the working set
        #[arg(long)]
        adopt: bool,
    },
    /// Print install commands
    Generate {
        #[arg(long, short = 'm', default_value = "reference")]
        mode: InstallMode,
        #[arg(long)]
        stack: Option<String>,
    },
}

fn init_tracing() {
    let default_level = "warn";
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn open_store(cli: &Cli) -> Result<StackStore> {
    let mut paths = StackPaths::new();
    if let Some(dir) = &cli.data_dir {
        paths = paths.with_data_dir(dir);
    }
    if let Some(file) = &cli.config {
        paths = paths.with_config_file(file);
    }

    if let Ok(dir) = paths.data_dir() {
        tracing::debug!("Using data dir {}", dir.display());
    }

    let config = ConfigService::new(paths.clone())
        .get_config()
        .context("Failed to load configuration")?;
    StackStore::open_file_backed(&paths, &config).context("Failed to open stack store")
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let store = open_store(&cli)?;

    match cli.command {
        Commands::Add {
            slug,
            item_type,
            name,
            category,
        } => commands::items::add(&store, item_type, slug, name, category)?,
        Commands::Remove { id } => commands::items::remove(&store, &id)?,
        Commands::Clear => commands::items::clear(&store)?,
        Commands::New => commands::items::new_stack(&store)?,
        Commands::List { item_type } => commands::items::list(&store, item_type),
        Commands::Save { name, description } => {
            commands::stacks::save(&store, &name, description)?
        }
        Commands::Load { id } => commands::stacks::load(&store, &id)?,
        Commands::Delete { id } => commands::stacks::delete(&store, &id)?,
        Commands::Rename {
            id,
            name,
            description,
        } => commands::stacks::rename(&store, &id, &name, description)?,
        Commands::Stacks => commands::stacks::list(&store),
        Commands::Export { stack, output } => {
            commands::transfer::export(&store, stack.as_deref(), output.as_deref())?
        }
        Commands::Import { file } => commands::transfer::import(&store, &file)?,
        Commands::Share { stack } => commands::transfer::share(&store, stack.as_deref())?,
        Commands::Open { url, adopt } => commands::transfer::open(&store, &url, adopt)?,
        Commands::Generate { mode, stack } => {
            commands::transfer::generate(&store, mode, stack.as_deref())?
        }
    }

    // Give fire-and-forget mirrors a chance to finish before the runtime exits.
    store.flush_sync().await;

    Ok(())
}
