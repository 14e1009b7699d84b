use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use pangbank_cli::api::{PangbankClient, PangbankHttpClient};
use pangbank_cli::config::ApiConfig;
use pangbank_cli::domain::SearchFilters;
use pangbank_cli::download::Downloader;
use pangbank_cli::error::PangbankError;
use pangbank_cli::mash::MashTool;
use pangbank_cli::matcher::Matcher;
use pangbank_cli::output;
use pangbank_cli::store::OutputStore;

#[derive(Parser)]
#[command(name = "pangbank")]
#[command(about = "Command-line tool for retrieving pangenomes using the PanGBank API")]
#[command(version, author)]
struct Cli {
    /// URL of the PanGBank API.
    #[arg(long, global = true, env = "PANGBANK_API_URL")]
    api_url: Option<String>,

    /// Enable verbose logging.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available collections.
    ListCollections,
    /// Search for pangenomes.
    SearchPangenomes(SearchArgs),
    /// Match a pangenome from an input genome.
    MatchPangenome(MatchArgs),
}

#[derive(Args)]
struct SearchArgs {
    /// Filter pangenomes by taxonomy.
    #[arg(long, short = 't')]
    taxon: Option<String>,

    /// Filter pangenomes by genome name.
    #[arg(long, short = 'g')]
    genome: Option<String>,

    /// Filter pangenomes by collection.
    #[arg(long, short = 'c')]
    collection: Option<String>,

    /// Show per-pangenome details.
    #[arg(long)]
    details: bool,

    /// Download the pangenome files.
    #[arg(long)]
    download: bool,

    /// Output directory for downloaded pangenomes.
    #[arg(long, default_value = "pangbank")]
    outdir: Utf8PathBuf,
}

#[derive(Args)]
struct MatchArgs {
    /// Input genome to search a matching pangenome for.
    #[arg(long = "input_genome", short = 'i')]
    input_genome: PathBuf,

    /// The pangenome collection to match in.
    #[arg(long, short = 'c')]
    collection: Option<String>,

    /// Download the matched pangenome.
    #[arg(long)]
    download: bool,

    /// Output directory for downloaded pangenomes.
    #[arg(long, default_value = "pangbank")]
    outdir: Utf8PathBuf,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<PangbankError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &PangbankError) -> u8 {
    match error {
        PangbankError::EmptyFilter
        | PangbankError::CollectionNotFound(_)
        | PangbankError::PangenomeNotFound(_)
        | PangbankError::AmbiguousCollection { .. }
        | PangbankError::InvalidGenome(_) => 2,
        PangbankError::ApiHttp(_)
        | PangbankError::ApiTimeout(_)
        | PangbankError::ApiStatus { .. }
        | PangbankError::MissingTool(_)
        | PangbankError::ToolExecution { .. }
        | PangbankError::ToolTimeout(_)
        | PangbankError::MatchFailed { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut api_config = ApiConfig::from_env();
    if let Some(url) = &cli.api_url {
        api_config = api_config.with_base_url(url);
    }
    let client = PangbankHttpClient::new(api_config).into_diagnostic()?;

    match cli.command {
        Commands::ListCollections => run_list_collections(&client),
        Commands::SearchPangenomes(args) => run_search(args, &client),
        Commands::MatchPangenome(args) => run_match(args, &client),
    }
}

fn run_list_collections(client: &PangbankHttpClient) -> miette::Result<()> {
    let collections = client.list_collections(None).into_diagnostic()?;
    tracing::info!(count = collections.len(), "collections found in PanGBank");
    print!("{}", output::render_collections(&collections));
    Ok(())
}

fn run_search(args: SearchArgs, client: &PangbankHttpClient) -> miette::Result<()> {
    let filters = SearchFilters {
        taxon: args.taxon,
        genome: args.genome,
        collection: args.collection,
    };
    let records = client.search_pangenomes(&filters).into_diagnostic()?;

    let store = OutputStore::new(args.outdir).into_diagnostic()?;
    store.ensure_outdir().into_diagnostic()?;
    let tsv_path = store.search_tsv_path();
    OutputStore::write_bytes_atomic(&tsv_path, output::search_tsv(&records).as_bytes())
        .into_diagnostic()?;
    tracing::info!(path = %tsv_path, "saved pangenome information");

    print!(
        "{}",
        output::render_pangenomes_by_collection(&records, args.details)
    );
    if args.details {
        for record in &records {
            let metrics = client.get_metrics(record.id).into_diagnostic()?;
            print!("{}", output::render_metrics(&metrics));
        }
    }

    if args.download {
        let downloader = Downloader::new(client, &store, "pangbank".to_string());
        let outcomes = downloader.download_all(&records);
        print!("{}", output::render_download_outcomes(&outcomes));
        if outcomes.iter().any(|outcome| outcome.result.is_err()) {
            return Err(miette::Report::msg("one or more downloads failed"));
        }
    }

    Ok(())
}

fn run_match(args: MatchArgs, client: &PangbankHttpClient) -> miette::Result<()> {
    let store = OutputStore::new(args.outdir).into_diagnostic()?;
    let tool = MashTool::new();
    let matcher = Matcher::new(client, &tool, &store);

    let result = matcher
        .match_genome(&args.input_genome, args.collection.as_deref())
        .into_diagnostic()?;
    print!("{}", output::render_match(&result));

    if args.download {
        store.ensure_outdir().into_diagnostic()?;
        let downloader = Downloader::new(client, &store, "pangbank".to_string());
        let path = downloader.download(&result.pangenome).into_diagnostic()?;
        println!("downloaded {path}");
    } else {
        let url = client
            .get_download_url(result.pangenome.id)
            .into_diagnostic()?;
        println!("download URL: {url}");
    }

    Ok(())
}
