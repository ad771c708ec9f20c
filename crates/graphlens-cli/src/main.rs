//! GraphLens CLI
//!
//! Runs the query engine against a `{nodes, edges}` JSON snapshot:
//! - ranked text search, criteria search and prefix suggestions
//! - BFS neighborhoods and shortest paths
//! - one-off filters, plus named filter sets and saved searches kept in a
//!   JSON store file (`--store`)

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use graphlens_query::{
    Direction, EngineConfig, EntityId, FilterConfig, GraphSnapshot, PersistencePort, QueryEngine,
    SearchCriteria, SearchOptions, TraversalOptions,
};
use graphlens_storage::JsonFileStore;

mod render;

#[derive(Parser)]
#[command(name = "graphlens")]
#[command(author, version, about = "GraphLens: search, traverse and filter a property graph")]
struct Cli {
    /// Graph snapshot (`{"nodes": [...], "edges": [...]}`)
    #[arg(short, long, global = true)]
    snapshot: Option<PathBuf>,

    /// Engine configuration (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Key-value store for filter sets and saved searches
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ranked fuzzy (or exact) text search
    Search {
        query: String,
        #[arg(long)]
        exact: bool,
        #[arg(long)]
        case_sensitive: bool,
        #[arg(long, conflicts_with = "edges_only")]
        nodes_only: bool,
        #[arg(long)]
        edges_only: bool,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Field-by-field search, e.g. `{"kind": "node", "fields": {"type": "concept"}}`
    Criteria {
        /// Criteria JSON, or `@path` to read it from a file
        criteria: String,
    },

    /// Nodes within N hops of a node
    Neighbors {
        id: String,
        #[arg(long, default_value_t = 1, conflicts_with = "unbounded")]
        depth: usize,
        #[arg(long)]
        unbounded: bool,
        #[arg(long, value_enum, default_value_t = DirectionArg::Both)]
        direction: DirectionArg,
    },

    /// Shortest path between two nodes, ignoring edge direction
    Path {
        from: String,
        to: String,
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// Apply a filter config, e.g. `{"nodes": {"type": "concept"}}`
    Filter {
        /// Filter JSON, or `@path` to read it from a file
        #[arg(id = "filter_config", value_name = "CONFIG")]
        config: String,
    },

    /// Index words extending a prefix
    Suggest {
        prefix: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Index and bookkeeping counts
    Stats,

    /// Named filter sets (requires --store)
    #[command(subcommand)]
    Sets(SetCommands),

    /// Saved searches (requires --store)
    #[command(subcommand)]
    Saved(SavedCommands),
}

#[derive(Subcommand)]
enum SetCommands {
    /// Create (or replace) a set
    Create {
        name: String,
        #[arg(id = "filter_config", value_name = "CONFIG")]
        config: String,
    },
    /// Flip a set's active flag, or force it with --on / --off
    Toggle {
        name: String,
        #[arg(long, conflicts_with = "off")]
        on: bool,
        #[arg(long)]
        off: bool,
    },
    Remove { name: String },
    List,
    /// Apply every active set to the snapshot
    Apply,
    /// Write all sets as JSON to stdout
    Export,
    /// Merge sets from a JSON file
    Import { file: PathBuf },
    /// Recent filter actions
    History,
}

#[derive(Subcommand)]
enum SavedCommands {
    Save {
        name: String,
        query: String,
        #[arg(long)]
        exact: bool,
    },
    Run { name: String },
    Remove { name: String },
    List,
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    Out,
    In,
    Both,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Out => Direction::Out,
            DirectionArg::In => Direction::In,
            DirectionArg::Both => Direction::Both,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_str(&read_text(path)?)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let mut engine = match &cli.store {
        Some(path) => {
            let store = JsonFileStore::open(path)
                .with_context(|| format!("opening store {}", path.display()))?;
            let port: Arc<dyn PersistencePort> = Arc::new(store);
            let mut engine = QueryEngine::with_persistence(config, port);
            engine.restore().context("restoring filter sets and saved searches")?;
            engine
        }
        None => QueryEngine::new(config),
    };
    if let Some(path) = &cli.snapshot {
        engine.build_index(load_snapshot(path)?);
    }

    let json = cli.json;
    match cli.command {
        Commands::Search {
            query,
            exact,
            case_sensitive,
            nodes_only,
            edges_only,
            limit,
        } => {
            let defaults = engine.default_search_options();
            let options = SearchOptions {
                exact_match: exact,
                case_sensitive,
                search_nodes: !edges_only,
                search_edges: !nodes_only,
                limit: limit.unwrap_or(defaults.limit),
            };
            let results = engine.text_search(&query, &options);
            render::search_results(&results, json)?;
        }
        Commands::Criteria { criteria } => {
            let criteria: SearchCriteria = parse_json_arg(&criteria, "criteria")?;
            render::entities(&engine.search_by_criteria(&criteria), json)?;
        }
        Commands::Neighbors {
            id,
            depth,
            unbounded,
            direction,
        } => {
            let options = TraversalOptions::new((!unbounded).then_some(depth), direction.into());
            let nodes = engine.find_connected_nodes(&parse_id(&id), &options);
            render::nodes(&nodes, json)?;
        }
        Commands::Path { from, to, max_depth } => {
            let path = engine.find_path(&parse_id(&from), &parse_id(&to), max_depth);
            render::path(path.as_deref(), json)?;
        }
        Commands::Filter { config } => {
            let config: FilterConfig = parse_json_arg(&config, "filter config")?;
            render::filter_result(&engine.apply_filters(&config), json)?;
        }
        Commands::Suggest { prefix, limit } => {
            render::words(&engine.get_suggestions(&prefix, limit), json)?;
        }
        Commands::Stats => render::stats(&engine.stats(), json)?,
        Commands::Sets(command) => {
            require_store(&cli.store)?;
            run_set_command(&mut engine, command, json)?;
        }
        Commands::Saved(command) => {
            require_store(&cli.store)?;
            run_saved_command(&mut engine, command, json)?;
        }
    }
    Ok(())
}

fn run_set_command(engine: &mut QueryEngine, command: SetCommands, json: bool) -> Result<()> {
    match command {
        SetCommands::Create { name, config } => {
            let config: FilterConfig = parse_json_arg(&config, "filter config")?;
            let view = engine.create_filter_set(&name, config)?;
            eprintln!("{} filter set {}", "created".green().bold(), name.bold());
            render::filter_result(&view, json)?;
        }
        SetCommands::Toggle { name, on, off } => {
            let force = if on {
                Some(true)
            } else if off {
                Some(false)
            } else {
                None
            };
            let active = engine.toggle_filter_set(&name, force)?;
            let state = if active { "active".green() } else { "inactive".yellow() };
            eprintln!("{} is now {}", name.bold(), state);
        }
        SetCommands::Remove { name } => {
            engine.remove_filter_set(&name)?;
            eprintln!("{} filter set {}", "removed".green().bold(), name.bold());
        }
        SetCommands::List => render::filter_sets(engine.filter_sets(), json)?,
        SetCommands::Apply => render::filter_result(&engine.apply_all_active_filters(), json)?,
        SetCommands::Export => println!("{}", engine.export_filter_sets()?),
        SetCommands::Import { file } => {
            let count = engine.import_filter_sets(&read_text(&file)?)?;
            eprintln!("{} {} filter set(s)", "imported".green().bold(), count);
        }
        SetCommands::History => render::filter_history(&engine.filter_history(), json)?,
    }
    Ok(())
}

fn run_saved_command(engine: &mut QueryEngine, command: SavedCommands, json: bool) -> Result<()> {
    match command {
        SavedCommands::Save { name, query, exact } => {
            let options = SearchOptions {
                exact_match: exact,
                ..engine.default_search_options()
            };
            engine.save_search(&name, &query, options)?;
            eprintln!("{} search {}", "saved".green().bold(), name.bold());
        }
        SavedCommands::Run { name } => {
            let results = engine.execute_saved_search(&name)?;
            render::search_results(&results, json)?;
        }
        SavedCommands::Remove { name } => {
            engine.remove_saved_search(&name)?;
            eprintln!("{} search {}", "removed".green().bold(), name.bold());
        }
        SavedCommands::List => render::saved_searches(engine.saved_searches(), json)?,
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn require_store(store: &Option<PathBuf>) -> Result<()> {
    if store.is_none() {
        return Err(anyhow!("this command needs --store <file>"));
    }
    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn load_snapshot(path: &Path) -> Result<GraphSnapshot> {
    let text = read_text(path)?;
    serde_json::from_str(&text).with_context(|| format!("parsing snapshot {}", path.display()))
}

/// Inline JSON, or `@path` for a file.
fn parse_json_arg<T: serde::de::DeserializeOwned>(arg: &str, what: &str) -> Result<T> {
    let text = match arg.strip_prefix('@') {
        Some(path) => read_text(Path::new(path))?,
        None => arg.to_string(),
    };
    serde_json::from_str(&text).with_context(|| format!("parsing {what}"))
}

/// Integers become numeric ids; anything else is a string id.
fn parse_id(raw: &str) -> EntityId {
    raw.parse::<i64>()
        .map(EntityId::Int)
        .unwrap_or_else(|_| EntityId::from(raw))
}
