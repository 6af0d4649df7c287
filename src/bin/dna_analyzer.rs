use anyhow::{Result, anyhow};
use clap::Parser;
use dna_analyzer::{
    app::DnaAnalyzerApp,
    api::HttpSequenceService,
    config::{self, API_BASE_ENV, ORIGIN_ENV, ServiceConfig},
    display_version,
    history::HistoryStore,
    logging,
    storage::FileStore,
    visualization::VisualizationEngine,
    workflows::Session,
};
use eframe::{NativeOptions, egui};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "dna_analyzer",
    version = display_version(),
    about = "Upload DNA sequences to the analysis service, search for patterns and watch the results."
)]
struct Cli {
    /// Base address of the sequence service, e.g. http://localhost:8000/api
    #[arg(long, value_name = "URL")]
    api_base: Option<String>,

    /// Hosting origin; the service is expected under <ORIGIN>/api
    #[arg(long, value_name = "URL")]
    origin: Option<String>,

    /// History storage file (defaults to the platform data directory)
    #[arg(long, value_name = "PATH")]
    storage_file: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 60)]
    timeout_secs: u64,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all log output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Also append logs to a file; without PATH the file goes next to the history
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    log_file: Option<Option<PathBuf>>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_destination = logging::LogDestination::from_flag(cli.log_file.clone());
    logging::setup_logging(cli.verbose, cli.quiet, &log_destination)?;

    if let Some(base) = &cli.api_base {
        config::set_config_override(API_BASE_ENV, base);
    }
    if let Some(origin) = &cli.origin {
        config::set_config_override(ORIGIN_ENV, origin);
    }
    let service_config =
        ServiceConfig::resolve().with_timeout(Duration::from_secs(cli.timeout_secs.max(1)));
    info!(
        "dna_analyzer {} using {} (from {})",
        display_version(),
        service_config.api_base,
        config::active_resolution_label()
    );

    let storage_path = cli
        .storage_file
        .clone()
        .unwrap_or_else(config::default_storage_path);
    info!("History stored in {}", storage_path.display());

    let service = HttpSequenceService::new(service_config)?;
    let history = HistoryStore::new(Box::new(FileStore::new(storage_path)));
    let session = Session::new(Arc::new(service), history, VisualizationEngine::new());

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("DNA Analyzer")
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([640.0, 480.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "DNA Analyzer",
        options,
        Box::new(move |cc| Ok(Box::new(DnaAnalyzerApp::new(cc, session)))),
    )
    .map_err(|e| anyhow!("Could not start the window: {e}"))
}
