//! Binary entry point for the qgplan CLI.
#![forbid(unsafe_code)]

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use qgplan::graph::{InMemoryOntology, Ontology};
use qgplan::normalize::check::check;
use qgplan::{Planner, PlannerConfig, QueryGraph};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "qgplan",
    version,
    about = "Plan query graphs into execution plans",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct QueryArgs {
    #[arg(value_name = "QUERY.json")]
    query: PathBuf,

    #[arg(long, value_name = "FILE", env = "QGPLAN_CONFIG", help = "Planner config (TOML)")]
    config: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FILE",
        help = "Ontology (JSON); derived from the query when omitted"
    )]
    ontology: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Normalize, check and plan a query graph")]
    Plan(QueryArgs),

    #[command(about = "Print the normalized query graph")]
    Normalize(QueryArgs),

    #[command(about = "Check a query graph against the ontology")]
    Check(QueryArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Plan(args) => {
            let (planner, query) = load(&args)?;
            let output = planner.plan(query)?;
            emit(cli.format, &output.explain, || {
                println!("query: {}", output.explain.query);
                println!("plan: {}", output.description);
                println!("cost: {}", output.cost);
                println!("fingerprint: {:016x}", output.fingerprint);
            })?;
        }
        Command::Normalize(args) => {
            let (planner, mut query) = load(&args)?;
            let rounds = planner.normalize(&mut query);
            tracing::debug!(query = query.name(), rounds, "normalized");
            // the document is JSON in both formats
            println!("{}", serde_json::to_string_pretty(&query.to_doc())?);
        }
        Command::Check(args) => {
            let query = read_query(&args.query)?;
            let ontology = read_ontology(args.ontology.as_deref(), &query)?;
            let result = check(&query, ontology.as_ref());
            emit(cli.format, &result.errors(), || println!("{result}"))?;
            if !result.is_valid() {
                std::process::exit(2);
            }
        }
    }
    Ok(())
}

fn load(args: &QueryArgs) -> Result<(Planner, QueryGraph), Box<dyn Error>> {
    let config = match &args.config {
        Some(path) => PlannerConfig::load(path)?,
        None => PlannerConfig::default(),
    };
    let query = read_query(&args.query)?;
    let ontology = read_ontology(args.ontology.as_deref(), &query)?;
    Ok((Planner::new(config, ontology), query))
}

fn read_query(path: &Path) -> Result<QueryGraph, Box<dyn Error>> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("failed to read query {}: {err}", path.display()))?;
    Ok(QueryGraph::from_json(&raw)?)
}

fn read_ontology(
    path: Option<&Path>,
    query: &QueryGraph,
) -> Result<Arc<dyn Ontology>, Box<dyn Error>> {
    let ontology = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .map_err(|err| format!("failed to read ontology {}: {err}", path.display()))?;
            serde_json::from_str::<InMemoryOntology>(&raw)?
        }
        None => InMemoryOntology::from_graph(query),
    };
    Ok(Arc::new(ontology))
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: serde::Serialize + ?Sized,
    F: Fn(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}
