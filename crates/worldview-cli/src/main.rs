mod config;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use worldview_core::{ConceptGraph, GraphStore};
use worldview_store::JsonFileStore;

#[derive(Parser)]
#[command(
    name = "worldview",
    version,
    about = "Map your worldview concepts and the causes that connect them"
)]
struct Cli {
    /// Path to the worldview JSON file
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a concept
    Add {
        /// Concept name (unique)
        name: String,

        /// Free-text description
        #[arg(default_value = "")]
        description: String,
    },

    /// Link cause and effect
    Link {
        /// Cause concept name
        cause: String,

        /// Effect concept name
        effect: String,
    },

    /// Display the worldview as a forest of causes
    Show,

    /// List concepts with their descriptions
    List,

    /// Show current configuration
    Config,

    /// Launch MCP server (stdio transport)
    Serve,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = config::load_config()?;
    let store = JsonFileStore::new(config::data_file(cli.file, &config));

    match cli.command {
        Commands::Add { name, description } => cmd_add(&store, &name, &description),
        Commands::Link { cause, effect } => cmd_link(&store, &cause, &effect),
        Commands::Show => cmd_show(&store),
        Commands::List => cmd_list(&store),
        Commands::Config => cmd_config(&store),
        Commands::Serve => {
            let mut graph = load(&store)?;
            worldview_mcp::run_server(&store, &mut graph, config.mcp.instructions.as_deref())
        }
    }
}

fn load(store: &JsonFileStore) -> Result<ConceptGraph> {
    store
        .load()
        .with_context(|| format!("failed to load {}", store.path().display()))
}

fn save(store: &JsonFileStore, graph: &ConceptGraph) -> Result<()> {
    store
        .save(graph)
        .with_context(|| format!("failed to save {}", store.path().display()))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_add(store: &JsonFileStore, name: &str, description: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("Concept name required");
    }

    let mut graph = load(store)?;
    if !graph.add_concept(name, description.trim()) {
        println!("Concept already exists: {name}");
        return Ok(());
    }
    save(store, &graph)?;

    info!("added concept {name}");
    println!("Added concept: {name}");
    Ok(())
}

fn cmd_link(store: &JsonFileStore, cause: &str, effect: &str) -> Result<()> {
    let (cause, effect) = (cause.trim(), effect.trim());
    if cause.is_empty() || effect.is_empty() {
        bail!("Cause and effect required");
    }

    let mut graph = load(store)?;
    if !graph.link(cause, effect)? {
        println!("Already linked: {cause} -> {effect}");
        return Ok(());
    }
    save(store, &graph)?;

    info!("linked {cause} -> {effect}");
    println!("Linked: {cause} -> {effect}");
    Ok(())
}

fn cmd_show(store: &JsonFileStore) -> Result<()> {
    let graph = load(store)?;
    println!("{}", graph.render_text());
    Ok(())
}

fn cmd_list(store: &JsonFileStore) -> Result<()> {
    let graph = load(store)?;
    if graph.is_empty() {
        println!("No concepts yet.");
        return Ok(());
    }

    println!("{:<25} {:<8} Description", "Name", "Effects");
    println!("{}", "-".repeat(60));
    for (name, concept) in graph.concepts() {
        println!(
            "{:<25} {:<8} {}",
            name,
            graph.effects_of(name).len(),
            concept.description
        );
    }
    Ok(())
}

fn cmd_config(store: &JsonFileStore) -> Result<()> {
    println!("config: {}", config::show_config_path());
    println!("file:   {}", store.path().display());
    Ok(())
}
