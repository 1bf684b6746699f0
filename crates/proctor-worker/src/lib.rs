//! Proctoring analysis worker.
//!
//! This crate provides:
//! - Environment configuration and logging setup for the binaries
//! - Analysis orchestration over the FFmpeg, YOLOv8 and YuNet providers
//! - Signal trace recording and replay
//! - Local report persistence and text summaries
//! - Prometheus metrics

pub mod analyzer;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod reports;
pub mod summary;

pub use analyzer::{AnalysisOutcome, AnalysisRequest, Analyzer};
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::SessionLogger;
pub use reports::ReportEntry;
