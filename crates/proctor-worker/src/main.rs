//! Proctoring analysis CLI.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use proctor_models::SessionReport;
use proctor_worker::summary::{render_report_list, render_summary};
use proctor_worker::{reports, AnalysisRequest, Analyzer, WorkerConfig, WorkerResult};

#[derive(Parser)]
#[command(name = "proctor", version, about = "Analyse recorded proctoring sessions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyse a recording and write its report
    Analyze {
        video: PathBuf,
        /// Report path (default: <stem>_analysis.json beside the video)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Record per-frame provider outputs to this file
        #[arg(long)]
        trace: Option<PathBuf>,
        /// Frames per second to analyse
        #[arg(long)]
        sample_fps: Option<f64>,
    },
    /// Analyse the most recent upload
    Latest {
        /// Uploads directory
        #[arg(long)]
        dir: Option<PathBuf>,
        #[arg(long)]
        sample_fps: Option<f64>,
    },
    /// List stored reports, newest first
    Reports {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Re-run the engine on a recorded signal trace
    Replay {
        trace: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the JSON Schema of the session report
    Schema,
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    proctor_worker::logging::init_tracing();

    let cli = Cli::parse();
    let config = WorkerConfig::from_env();

    if let Some(addr) = config.metrics_addr {
        if let Err(e) = proctor_worker::metrics::init_metrics(addr) {
            warn!("Metrics disabled: {}", e);
        }
    }

    if let Err(e) = run(cli.command, config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(command: Command, mut config: WorkerConfig) -> WorkerResult<()> {
    match command {
        Command::Analyze {
            video,
            output,
            trace,
            sample_fps,
        } => {
            apply_sample_fps(&mut config, sample_fps)?;
            let request = AnalysisRequest {
                video,
                output,
                trace,
            };
            analyze(config, request).await
        }
        Command::Latest { dir, sample_fps } => {
            apply_sample_fps(&mut config, sample_fps)?;
            let dir = dir.unwrap_or_else(|| config.uploads_dir.clone());
            let video = reports::latest_recording(&dir).await?;
            info!(video = %video.display(), "Analysing latest recording");
            analyze(config, AnalysisRequest::new(video)).await
        }
        Command::Reports { dir } => {
            let dir = dir.unwrap_or_else(|| config.uploads_dir.clone());
            let entries = reports::list_reports(&dir).await?;
            print!("{}", render_report_list(&entries));
            Ok(())
        }
        Command::Replay { trace, output } => {
            let outcome = Analyzer::new(config).replay(&trace, output.as_deref()).await?;
            print_outcome(&outcome.report, outcome.report_path.as_deref());
            Ok(())
        }
        Command::Schema => {
            let schema = schemars::schema_for!(SessionReport);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
    }
}

fn apply_sample_fps(config: &mut WorkerConfig, sample_fps: Option<f64>) -> WorkerResult<()> {
    match sample_fps {
        Some(fps) if !fps.is_finite() || fps <= 0.0 => Err(proctor_worker::WorkerError::config_error(
            format!("Invalid sample rate: {}", fps),
        )),
        Some(fps) => {
            config.sample_fps = fps;
            Ok(())
        }
        None => Ok(()),
    }
}

async fn analyze(config: WorkerConfig, request: AnalysisRequest) -> WorkerResult<()> {
    let outcome = Analyzer::new(config).analyze(&request).await?;
    print_outcome(&outcome.report, outcome.report_path.as_deref());
    if let Some(path) = &outcome.trace_path {
        println!("Signal trace: {}", path.display());
    }
    Ok(())
}

fn print_outcome(report: &SessionReport, report_path: Option<&std::path::Path>) {
    print!("{}", render_summary(report));
    if let Some(path) = report_path {
        println!("Report: {}", path.display());
    }
}
