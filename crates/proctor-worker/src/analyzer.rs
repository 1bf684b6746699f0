//! Analysis orchestration.
//!
//! Probing is async; decoding and inference run on the blocking pool since
//! the engine is a synchronous pull loop over the frame source.

use std::path::{Path, PathBuf};
use std::time::Instant;

use proctor_engine::{process, process_recording, replay, EngineError, SignalTrace};
use proctor_media::{
    probe_video, FfmpegFrameSource, MediaError, VideoProbe, YoloObjectDetector, YuNetFaceProvider,
};
use proctor_models::SessionReport;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::SessionLogger;
use crate::metrics;
use crate::reports::{read_trace, report_path_for, write_report, write_trace};

/// One recording to analyse.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub video: PathBuf,
    /// Report destination; defaults to `<stem>_analysis.json` beside the video
    pub output: Option<PathBuf>,
    /// Where to record the per-frame signal trace
    pub trace: Option<PathBuf>,
}

impl AnalysisRequest {
    pub fn new(video: impl Into<PathBuf>) -> Self {
        Self {
            video: video.into(),
            output: None,
            trace: None,
        }
    }

    pub fn report_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| report_path_for(&self.video))
    }
}

/// Result of a completed analysis.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub report: SessionReport,
    /// Where the report was written, if anywhere
    pub report_path: Option<PathBuf>,
    pub trace_path: Option<PathBuf>,
}

/// Runs analyses with a fixed worker configuration.
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: WorkerConfig,
}

impl Analyzer {
    pub fn new(config: WorkerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Analyse a recording, persist its report and optionally its trace.
    pub async fn analyze(&self, request: &AnalysisRequest) -> WorkerResult<AnalysisOutcome> {
        let logger = SessionLogger::new("analyze");
        logger.log_start(&request.video.display().to_string());
        let started = Instant::now();

        match self.run_analysis(request, &logger).await {
            Ok(outcome) => {
                metrics::record_session_completed(&outcome.report, started.elapsed().as_secs_f64());
                logger.log_completion(&format!(
                    "score {} with {} events in {:.1}s",
                    outcome.report.integrity_analysis.final_integrity_score,
                    outcome.report.events.len(),
                    started.elapsed().as_secs_f64()
                ));
                Ok(outcome)
            }
            Err(e) => {
                metrics::record_session_failed(&e);
                logger.log_error(&e.to_string());
                Err(e)
            }
        }
    }

    async fn run_analysis(
        &self,
        request: &AnalysisRequest,
        logger: &SessionLogger,
    ) -> WorkerResult<AnalysisOutcome> {
        if !request.video.is_file() {
            return Err(EngineError::stream_open(format!(
                "Recording not found: {}",
                request.video.display()
            ))
            .into());
        }

        let probe = probe_video(&request.video)
            .await
            .map_err(|e| EngineError::stream_open(e.to_string()))?;
        logger.log_progress(&format!(
            "{}x{} {} at {:.2} fps, {:.1}s",
            probe.width, probe.height, probe.codec, probe.fps, probe.duration
        ));
        if probe.duration <= 0.0 {
            logger.log_warning("recording has no duration metadata; analysing until end of stream");
        }

        let config = self.config.clone();
        let video = request.video.clone();
        let record_trace = request.trace.is_some();
        let span = logger.create_span();

        let (report, trace) = tokio::task::spawn_blocking(move || {
            let _guard = span.enter();
            analyze_blocking(&config, &video, &probe, record_trace)
        })
        .await
        .map_err(|e| WorkerError::task_failed(format!("Analysis task panicked: {}", e)))??;

        let report_path = request.report_path();
        write_report(&report_path, &report).await?;

        let trace_path = match (&request.trace, &trace) {
            (Some(path), Some(trace)) => {
                write_trace(path, trace).await?;
                Some(path.clone())
            }
            _ => None,
        };

        Ok(AnalysisOutcome {
            report,
            report_path: Some(report_path),
            trace_path,
        })
    }

    /// Re-run the engine on a recorded trace.
    pub async fn replay(&self, trace_path: &Path, output: Option<&Path>) -> WorkerResult<AnalysisOutcome> {
        let logger = SessionLogger::new("replay");
        logger.log_start(&trace_path.display().to_string());

        let trace = read_trace(trace_path).await?;
        let engine_config = self.config.engine_config();
        let span = logger.create_span();

        let report = tokio::task::spawn_blocking(move || {
            let _guard = span.enter();
            replay(&trace, &engine_config)
        })
        .await
        .map_err(|e| WorkerError::task_failed(format!("Replay task panicked: {}", e)))??;

        if let Some(path) = output {
            write_report(path, &report).await?;
        }

        logger.log_completion(&format!(
            "score {} with {} events",
            report.integrity_analysis.final_integrity_score,
            report.events.len()
        ));

        Ok(AnalysisOutcome {
            report,
            report_path: output.map(Path::to_path_buf),
            trace_path: Some(trace_path.to_path_buf()),
        })
    }
}

/// Build the providers, open the decoder and run the engine to completion.
fn analyze_blocking(
    config: &WorkerConfig,
    video: &Path,
    probe: &VideoProbe,
    record_trace: bool,
) -> WorkerResult<(SessionReport, Option<SignalTrace>)> {
    let mut detector = YoloObjectDetector::new(config.detector_config())?;
    let mut faces = YuNetFaceProvider::new(config.face_model.as_deref()).map_err(|e| match e {
        MediaError::FeatureDisabled(feature) => WorkerError::config_error(format!(
            "Face detection requires the `{}` feature",
            feature
        )),
        other => other.into(),
    })?;

    let source = FfmpegFrameSource::open(video, probe, config.sample_fps)
        .map_err(EngineError::from)?;
    let engine_config = config.engine_config();

    if record_trace {
        let (report, trace) = process_recording(source, &mut detector, &mut faces, &engine_config)?;
        Ok((report, Some(trace)))
    } else {
        let report = process(source, &mut detector, &mut faces, &engine_config)?;
        Ok((report, None))
    }
}
