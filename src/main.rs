use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use signal_history_rust::config::AppConfig;
use signal_history_rust::logging::init_logging;
use signal_history_rust::service::{run_extraction, ExtractionContext};
use signal_history_rust::validation::InputValidator;

/// Signal Desktop database parser and artifact extractor
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The Signal data directory
    #[arg(short, long, value_name = "SIGNAL_DIR")]
    dir: PathBuf,

    /// The location for storing processed data
    #[arg(short, long, value_name = "OUTPUT_DIR")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(Some(&config.get_log_level()), None) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    if let Err(e) = InputValidator::validate_source_dir(&cli.dir)
        .and_then(|()| InputValidator::prepare_output_dir(&cli.output))
    {
        error!("{e:#}");
        return ExitCode::FAILURE;
    }

    let ctx = ExtractionContext::new(&cli.dir, &cli.output, &config);
    info!(
        source = %ctx.source_dir.display(),
        output = %ctx.output_dir.display(),
        "Starting Signal profile extraction"
    );

    match run_extraction(&ctx).await {
        Ok(()) => {
            info!("Extraction complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
