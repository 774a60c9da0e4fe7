//! metafind CLI - multi-engine web search from the command line.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use metafind::engines::BUILTIN_ENGINES;
use metafind::output::{render, OutputFormat};
use metafind::server::{self, AppState};
use metafind::{Aggregator, Config, SearchError, SearchQuery};

/// metafind - multi-engine web search aggregator
#[derive(Parser)]
#[command(name = "metafind")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to $METAFIND_CONFIG, then metafind.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the configured engines
    Search(SearchArgs),

    /// List the built-in engines
    Engines,

    /// Run the REST service
    Serve(ServeArgs),
}

#[derive(Args)]
struct SearchArgs {
    /// Search query
    query: String,

    /// Results requested from each engine
    #[arg(short, long)]
    num_results: Option<usize>,

    /// Engine to use, repeatable or comma-separated (default: configured engines)
    #[arg(short, long = "engine", value_delimiter = ',')]
    engines: Vec<String>,

    /// Output format: text, json, csv or markdown
    #[arg(short, long, default_value = "text")]
    output_format: OutputFormat,

    /// Only keep results from this domain (repeatable)
    #[arg(long = "include-domain")]
    include_domains: Vec<String>,

    /// Drop results from this domain (repeatable)
    #[arg(long = "exclude-domain")]
    exclude_domains: Vec<String>,
}

#[derive(Args)]
struct ServeArgs {
    /// Address to bind (default from config)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (default from config)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(cli.config.as_deref());

    match cli.command {
        Commands::Search(args) => run_search(&config, args).await,
        Commands::Engines => list_engines(&config),
        Commands::Serve(args) => run_server(&config, args).await,
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("metafind=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("metafind=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn list_engines(config: &Config) -> Result<()> {
    println!("Available search engines:\n");
    for info in BUILTIN_ENGINES {
        let enabled = config
            .search
            .engines
            .iter()
            .any(|name| metafind::engines::canonical_name(name) == Some(info.name));
        let aliases = if info.aliases.is_empty() {
            String::new()
        } else {
            format!(" ({})", info.aliases.join(", "))
        };
        println!(
            "  {} {:<12}{:<10} {}",
            if enabled { "*" } else { " " },
            info.name,
            aliases,
            info.description
        );
    }
    println!();
    println!("* enabled by default");
    println!("Usage: metafind search \"query\" -e ddg,wiki");
    Ok(())
}

async fn run_search(config: &Config, args: SearchArgs) -> Result<()> {
    let aggregator = Aggregator::from_config(config).await;

    let query = SearchQuery::new(&args.query)
        .with_num_results(args.num_results.unwrap_or(config.search.num_results))
        .with_engines(args.engines)
        .with_include_domains(args.include_domains)
        .with_exclude_domains(args.exclude_domains);

    if aggregator.select_engines(&query).is_empty() {
        return Err(SearchError::NoEngines.into());
    }

    let results = aggregator.search(&query).await?;
    print!("{}", render(&results, &args.query, args.output_format)?);
    Ok(())
}

async fn run_server(config: &Config, args: ServeArgs) -> Result<()> {
    let aggregator = Aggregator::from_config(config).await;
    if aggregator.engine_names().is_empty() {
        return Err(SearchError::NoEngines.into());
    }

    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let state = AppState::new(aggregator).with_default_num_results(config.search.num_results);
    server::serve(state, &host, port).await?;
    Ok(())
}
