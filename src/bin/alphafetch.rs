use std::process::ExitCode;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use alphafetch::alphafold::AlphafoldClient;
use alphafetch::app::{App, RunOptions, RunResult};
use alphafetch::config::{ConfigLoader, normalize_formats};
use alphafetch::domain::{FetchOutcome, Query, StructureFormat};
use alphafetch::error::AfError;
use alphafetch::output::JsonOutput;
use alphafetch::store::Store;
use alphafetch::transport::Transport;
use alphafetch::uniprot::UniprotResolver;

#[derive(Parser)]
#[command(name = "alphafetch")]
#[command(about = "Resolve identifiers to UniProt accessions and fetch AlphaFold structure models")]
#[command(version, author)]
struct Cli {
    /// Free-text identifiers to resolve; takes precedence over the queries
    /// listed in the config file.
    queries: Vec<String>,

    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    out_dir: Option<String>,

    /// Candidate format, repeatable; order is priority order.
    #[arg(long = "format")]
    formats: Vec<StructureFormat>,

    #[arg(long)]
    concurrency: Option<usize>,

    #[arg(long)]
    timeout_secs: Option<u64>,

    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<AfError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &AfError) -> u8 {
    match error {
        AfError::NoQueries => 2,
        AfError::Transport(_) | AfError::TransportStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut resolved = ConfigLoader::resolve(cli.config.as_deref()).into_diagnostic()?;
    if !cli.queries.is_empty() {
        resolved.queries = cli
            .queries
            .iter()
            .map(|query| query.parse::<Query>())
            .collect::<Result<_, _>>()
            .into_diagnostic()?;
    }
    if let Some(out_dir) = cli.out_dir {
        resolved.out_dir = Utf8PathBuf::from(out_dir);
    }
    if !cli.formats.is_empty() {
        resolved.formats = normalize_formats(cli.formats).into_diagnostic()?;
    }
    if let Some(concurrency) = cli.concurrency {
        if concurrency == 0 {
            return Err(AfError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ))
            .into_diagnostic();
        }
        resolved.concurrency = concurrency;
    }
    if let Some(secs) = cli.timeout_secs {
        resolved.timeout = Duration::from_secs(secs.max(1));
    }
    if resolved.queries.is_empty() {
        return Err(AfError::NoQueries).into_diagnostic();
    }

    let transport = Transport::new(resolved.timeout).into_diagnostic()?;
    let resolver = UniprotResolver::new(transport.clone());
    let structures = AlphafoldClient::new(transport);
    let store = Store::new(resolved.out_dir.clone());
    let app = App::new(
        resolver,
        structures,
        store,
        RunOptions {
            formats: resolved.formats.clone(),
            concurrency: resolved.concurrency,
        },
    );

    let result = app.run(&resolved.queries).into_diagnostic()?;

    if cli.json {
        JsonOutput::print_run(&result).into_diagnostic()?;
    } else {
        print_run_summary(&result);
    }
    Ok(())
}

fn print_run_summary(result: &RunResult) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    let saved = result
        .outcomes
        .values()
        .filter(|outcome| matches!(outcome, FetchOutcome::ResolvedAndSaved { .. }))
        .count();
    let unavailable = result
        .outcomes
        .values()
        .filter(|outcome| matches!(outcome, FetchOutcome::ResolvedButUnavailable { .. }))
        .count();
    let unresolved = result.outcomes.len() - saved - unavailable;

    println!("{cyan}alphafetch summary{reset}");
    println!("{green}saved: {saved}{reset}  {yellow}unavailable: {unavailable}  unresolved: {unresolved}{reset}");

    for (query, outcome) in &result.outcomes {
        match outcome {
            FetchOutcome::ResolvedAndSaved {
                accession,
                path,
                format,
            } => println!("{green}  {query} ({accession}): saved {path} [{format}]{reset}"),
            FetchOutcome::ResolvedButUnavailable { accession } => {
                println!("{yellow}  {query} ({accession}): model not available{reset}")
            }
            FetchOutcome::Unresolved => {
                println!("{yellow}  {query}: no accession found{reset}")
            }
        }
    }
    println!("manifest: {}", result.manifest_path);
}
