use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use idx_indices_sync::catalog::IdxCatalog;
use idx_indices_sync::config::{ConfigLoader, ConfigOverrides, ResolvedConfig};
use idx_indices_sync::error::SyncError;
use idx_indices_sync::extract;
use idx_indices_sync::fetcher::{FetcherOptions, HttpFetcher};
use idx_indices_sync::membership::{self, JsonFileStore, MembershipTable};
use idx_indices_sync::output::{CleanResult, JsonOutput};
use idx_indices_sync::rate_limit::{NoDelay, RandomDelay, Throttle};
use idx_indices_sync::resolver::CoverageResolver;
use idx_indices_sync::workspace::Workspace;

#[derive(Parser)]
#[command(name = "idx-sync")]
#[command(about = "Download IDX index-membership archives and reconcile company to index mappings")]
#[command(version, author)]
struct Cli {
    /// Path to a JSON config file (defaults to ./idx-sync.json when present)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Directory holding downloaded archives
    #[arg(long, global = true)]
    work_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Download the fewest archives covering the requested indices")]
    Fetch(FetchArgs),
    #[command(about = "Unzip downloaded archives and locate each index's member file")]
    Extract(IndexArgs),
    #[command(about = "Merge per-index company lists into a symbol to indices store")]
    Reconcile(ReconcileArgs),
    #[command(about = "Delete everything in the working directory")]
    Clean,
}

#[derive(Args, Clone)]
struct IndexArgs {
    /// Index to track; repeat for several (defaults to the configured list)
    #[arg(long = "index")]
    indices: Vec<String>,
}

#[derive(Args, Clone)]
struct FetchArgs {
    #[command(flatten)]
    indices: IndexArgs,

    #[arg(long)]
    year: Option<i32>,

    /// Forward proxy, e.g. `user:pass@host:port` (falls back to $PROXY)
    #[arg(long)]
    proxy: Option<String>,

    /// Skip the randomized pause between downloads
    #[arg(long)]
    no_delay: bool,
}

#[derive(Args, Clone)]
struct ReconcileArgs {
    /// JSON object mapping each index to its company symbols
    #[arg(long)]
    lists: Utf8PathBuf,

    /// JSON store keyed by symbol
    #[arg(long, default_value = "index_membership.json")]
    store: Utf8PathBuf,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<SyncError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SyncError) -> u8 {
    match error {
        SyncError::InvalidConfig(_)
        | SyncError::ConfigRead(_)
        | SyncError::ConfigParse(_)
        | SyncError::InvalidIndexName(_) => 2,
        SyncError::CatalogUnavailable { .. }
        | SyncError::DownloadFailed(_)
        | SyncError::FetchTimeout(_)
        | SyncError::FetchStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let base_overrides = ConfigOverrides {
        working_dir: cli.work_dir.clone(),
        ..ConfigOverrides::default()
    };

    match cli.command {
        Commands::Fetch(args) => {
            let overrides = ConfigOverrides {
                year: args.year,
                indices: args.indices.indices.clone(),
                proxy: args.proxy.clone(),
                ..base_overrides
            };
            let config = load_config(cli.config.as_deref(), overrides)?;
            run_fetch(&config, args.no_delay)
        }
        Commands::Extract(args) => {
            let overrides = ConfigOverrides {
                indices: args.indices,
                ..base_overrides
            };
            let config = load_config(cli.config.as_deref(), overrides)?;
            let workspace = Workspace::new(config.working_dir.clone());
            let report = extract::extract_all(&workspace, &config.indices)?;
            JsonOutput::print_extract(&report).into_diagnostic()
        }
        Commands::Reconcile(args) => {
            let lists = membership::load_company_lists(&args.lists)?;
            let table = MembershipTable::reconcile(&lists);
            let mut store = JsonFileStore::open(args.store)?;
            let summary = membership::push(&table, &mut store)?;
            JsonOutput::print_push(&summary).into_diagnostic()
        }
        Commands::Clean => {
            let config = load_config(cli.config.as_deref(), base_overrides)?;
            let workspace = Workspace::new(config.working_dir.clone());
            let removed = workspace.purge()?;
            JsonOutput::print_clean(&CleanResult {
                directory: workspace.root().to_string(),
                removed,
            })
            .into_diagnostic()
        }
    }
}

fn load_config(path: Option<&str>, overrides: ConfigOverrides) -> miette::Result<ResolvedConfig> {
    let config = ConfigLoader::load(path)?;
    let config = ConfigLoader::apply_overrides(config, overrides);
    Ok(ConfigLoader::resolve_config(config)?)
}

fn run_fetch(config: &ResolvedConfig, no_delay: bool) -> miette::Result<()> {
    let workspace = Workspace::new(config.working_dir.clone());
    workspace.ensure()?;

    let fetcher = HttpFetcher::new(&FetcherOptions::from_config(config))?;
    let catalog = IdxCatalog::new(&fetcher, config.base_url.clone());

    let random = RandomDelay::new(config.rate_limit);
    let throttle: &dyn Throttle = if no_delay { &NoDelay } else { &random };

    let resolver = CoverageResolver::new(catalog, &fetcher, throttle, workspace);
    let report = resolver.resolve(&config.indices, config.year);
    JsonOutput::print_resolve(&report).into_diagnostic()
}
