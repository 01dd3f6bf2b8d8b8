use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use arxiv_harvester::app::{App, RunReport, StatusReport};
use arxiv_harvester::arxiv::{ArxivHttpClient, SearchClient, SearchRequest, SearchHit};
use arxiv_harvester::config::{ConfigLoader, DEFAULT_DB_ROOT};
use arxiv_harvester::domain::{SortBy, SortOrder};
use arxiv_harvester::error::HarvestError;
use arxiv_harvester::output::{JsonOutput, OutputMode};
use arxiv_harvester::store::Store;

#[derive(Parser)]
#[command(name = "arxiv-harvest")]
#[command(about = "Incremental arXiv harvester: merges keyword searches into yearly markdown digests")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run one ingestion pass over all configured subjects")]
    Run(RunArgs),
    #[command(about = "Show per-subject store state without fetching")]
    Status(StatusArgs),
}

#[derive(Args, Clone, Default)]
struct RunArgs {
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    db_root: Option<String>,

    #[arg(long)]
    max_results: Option<usize>,

    #[arg(long, value_enum)]
    sort_by: Option<SortBy>,

    #[arg(long, value_enum)]
    sort_order: Option<SortOrder>,
}

#[derive(Args)]
struct StatusArgs {
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    db_root: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<HarvestError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &HarvestError) -> u8 {
    match error {
        HarvestError::MissingConfig
        | HarvestError::ConfigRead(_)
        | HarvestError::ConfigParse(_) => 2,
        HarvestError::ArxivHttp(_)
        | HarvestError::ArxivStatus { .. }
        | HarvestError::EmptyPage { .. }
        | HarvestError::FeedParse(_) => 3,
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
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    match cli.command {
        Some(Commands::Run(args)) => run_harvest(args, output_mode),
        Some(Commands::Status(args)) => run_status(args, output_mode),
        None => run_harvest(RunArgs::default(), output_mode),
    }
}

fn run_harvest(args: RunArgs, output_mode: OutputMode) -> miette::Result<()> {
    let mut config = ConfigLoader::resolve(args.config.as_deref()).into_diagnostic()?;
    if let Some(db_root) = args.db_root {
        config.db_root = Utf8PathBuf::from(db_root);
    }
    if let Some(max_results) = args.max_results {
        config.max_results = Some(max_results);
    }
    if let Some(sort_by) = args.sort_by {
        config.sort_by = sort_by;
    }
    if let Some(sort_order) = args.sort_order {
        config.sort_order = sort_order;
    }

    let client = ArxivHttpClient::new().into_diagnostic()?;
    let store = Store::new(config.db_root.clone());
    let app = App::new(store, client);
    let report = app.run(&config).into_diagnostic()?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_run(&report).into_diagnostic()?,
        OutputMode::Human => print_run_summary(&report),
    }
    Ok(())
}

fn run_status(args: StatusArgs, output_mode: OutputMode) -> miette::Result<()> {
    let db_root = match args.db_root {
        Some(root) => Utf8PathBuf::from(root),
        None => match ConfigLoader::resolve(args.config.as_deref()) {
            Ok(config) => config.db_root,
            Err(_) => Utf8PathBuf::from(DEFAULT_DB_ROOT),
        },
    };

    let app = App::new(Store::new(db_root), NopSearch);
    let report = app.status().into_diagnostic()?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_status(&report).into_diagnostic()?,
        OutputMode::Human => print_status_summary(&report),
    }
    Ok(())
}

/// The status command never fetches; it still needs a client type.
struct NopSearch;

impl SearchClient for NopSearch {
    fn search(&self, _request: &SearchRequest) -> Result<Vec<SearchHit>, HarvestError> {
        Err(HarvestError::ArxivHttp(
            "search client not configured".to_string(),
        ))
    }
}

fn print_run_summary(report: &RunReport) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let red = "\x1b[31m";
    let reset = "\x1b[0m";

    let total: usize = report.subjects.iter().map(|s| s.accepted).sum();
    println!("{cyan}arxiv-harvest summary{reset}");
    println!("{green}new papers: {total}{reset}");

    for outcome in &report.subjects {
        if let Some(error) = &outcome.error {
            println!("{red}x {}: {error}{reset}", outcome.subject);
            continue;
        }
        let years = outcome
            .years
            .iter()
            .map(|year| year.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        if outcome.accepted > 0 {
            println!(
                "{green}+ {}: {} new ({years}){reset}",
                outcome.subject, outcome.accepted
            );
        } else {
            println!("{cyan}= {}: up to date{reset}", outcome.subject);
        }
        if !outcome.skipped_keywords.is_empty() {
            println!(
                "{yellow}  skipped keywords: {}{reset}",
                outcome.skipped_keywords.join(", ")
            );
        }
    }
}

fn print_status_summary(report: &StatusReport) {
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}arxiv-harvest store{reset}");
    for subject in &report.subjects {
        let years = subject
            .years
            .iter()
            .map(|year| year.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {}: {} seen, years [{years}]", subject.subject, subject.seen);
    }
}
