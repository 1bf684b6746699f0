//! Local report persistence.
//!
//! Reports live next to their recordings as `<stem>_analysis.json`.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use proctor_engine::SignalTrace;
use proctor_models::SessionReport;
use tracing::{debug, info};

use crate::error::{WorkerError, WorkerResult};

/// Suffix appended to a recording's stem to name its report.
pub const REPORT_SUFFIX: &str = "_analysis.json";

/// Extension of uploaded recordings.
pub const RECORDING_EXTENSION: &str = "webm";

/// Extensions accepted as the recording behind a report.
pub const VIDEO_EXTENSIONS: &[&str] = &["webm", "mp4", "mkv", "mov", "avi"];

/// A stored report together with the recording it describes.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub report_path: PathBuf,
    pub video_path: PathBuf,
    pub modified: DateTime<Utc>,
}

/// Report path for a recording: `<dir>/<stem>_analysis.json`.
pub fn report_path_for(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "recording".to_string());
    video.with_file_name(format!("{}{}", stem, REPORT_SUFFIX))
}

/// Recording stem for a report file name, if it is one.
fn report_stem(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(REPORT_SUFFIX)
        .filter(|stem| !stem.is_empty())
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

async fn modified_time(path: &Path) -> WorkerResult<SystemTime> {
    Ok(tokio::fs::metadata(path).await?.modified()?)
}

async fn files_in(dir: &Path) -> WorkerResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    Ok(files)
}

/// Most recently modified `.webm` recording in `dir`.
pub async fn latest_recording(dir: &Path) -> WorkerResult<PathBuf> {
    let mut latest: Option<(SystemTime, PathBuf)> = None;

    for path in files_in(dir).await? {
        if !has_extension(&path, &[RECORDING_EXTENSION]) {
            continue;
        }
        let modified = modified_time(&path).await?;
        // Ties resolve to the lexically greatest name for stable results
        let newer = match &latest {
            Some((time, best)) => (modified, &path) > (*time, best),
            None => true,
        };
        if newer {
            latest = Some((modified, path));
        }
    }

    latest
        .map(|(_, path)| path)
        .ok_or_else(|| WorkerError::NoRecordings(dir.display().to_string()))
}

/// Reports in `dir` whose recording is still present, newest first.
pub async fn list_reports(dir: &Path) -> WorkerResult<Vec<ReportEntry>> {
    let files = files_in(dir).await?;
    let mut reports = Vec::new();

    for report_path in &files {
        let Some(stem) = report_path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(report_stem)
        else {
            continue;
        };

        let video = files.iter().find(|candidate| {
            has_extension(candidate, VIDEO_EXTENSIONS)
                && candidate.file_stem().and_then(|s| s.to_str()) == Some(stem)
        });
        let Some(video_path) = video else {
            debug!(report = %report_path.display(), "Skipping report without recording");
            continue;
        };

        reports.push(ReportEntry {
            report_path: report_path.clone(),
            video_path: video_path.clone(),
            modified: DateTime::<Utc>::from(modified_time(report_path).await?),
        });
    }

    reports.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| a.report_path.cmp(&b.report_path))
    });
    Ok(reports)
}

/// Write a report as pretty JSON, creating parent directories.
pub async fn write_report(path: &Path, report: &SessionReport) -> WorkerResult<()> {
    write_json(path, serde_json::to_string_pretty(report)?).await?;
    info!(path = %path.display(), "Report saved");
    Ok(())
}

/// Read a stored report.
pub async fn read_report(path: &Path) -> WorkerResult<SessionReport> {
    let json = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&json)?)
}

/// Write a signal trace as pretty JSON.
pub async fn write_trace(path: &Path, trace: &SignalTrace) -> WorkerResult<()> {
    write_json(path, trace.to_json_pretty()?).await?;
    info!(path = %path.display(), frames = trace.len(), "Signal trace saved");
    Ok(())
}

/// Read and validate a signal trace.
pub async fn read_trace(path: &Path) -> WorkerResult<SignalTrace> {
    let json = tokio::fs::read_to_string(path).await?;
    Ok(SignalTrace::from_json(&json)?)
}

async fn write_json(path: &Path, json: String) -> WorkerResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, json).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proctor_engine::{replay, EngineConfig};
    use proctor_models::FaceSignal;
    use std::fs::{self, File, FileTimes};
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, age_secs: u64) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        file.set_times(FileTimes::new().set_modified(mtime)).unwrap();
        path
    }

    fn sample_report() -> SessionReport {
        let mut trace = SignalTrace::new("uploads/a.webm", 5.0);
        for i in 0..20 {
            trace.push(i as f64 / 5.0, &[], &FaceSignal::absent(i as f64 / 5.0));
        }
        replay(&trace, &EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_report_path_for() {
        assert_eq!(
            report_path_for(Path::new("uploads/session_42.webm")),
            PathBuf::from("uploads/session_42_analysis.json")
        );
        assert_eq!(
            report_path_for(Path::new("clip.v2.mp4")),
            PathBuf::from("clip.v2_analysis.json")
        );
    }

    #[test]
    fn test_report_stem() {
        assert_eq!(report_stem("a_analysis.json"), Some("a"));
        assert_eq!(report_stem("_analysis.json"), None);
        assert_eq!(report_stem("a.json"), None);
    }

    #[tokio::test]
    async fn test_latest_recording_picks_newest_webm() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "old.webm", 300);
        let newest = touch(dir.path(), "new.webm", 10);
        touch(dir.path(), "newer.mp4", 1);
        touch(dir.path(), "new_analysis.json", 0);

        assert_eq!(latest_recording(dir.path()).await.unwrap(), newest);
    }

    #[tokio::test]
    async fn test_latest_recording_empty_dir() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "notes.txt", 0);

        let result = latest_recording(dir.path()).await;
        assert!(matches!(result, Err(WorkerError::NoRecordings(_))));
    }

    #[tokio::test]
    async fn test_list_reports_requires_recording() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.webm", 100);
        let a_report = touch(dir.path(), "a_analysis.json", 90);
        touch(dir.path(), "b.mp4", 100);
        let b_report = touch(dir.path(), "b_analysis.json", 5);
        touch(dir.path(), "orphan_analysis.json", 1);

        let reports = list_reports(dir.path()).await.unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].report_path, b_report);
        assert_eq!(reports[0].video_path, dir.path().join("b.mp4"));
        assert_eq!(reports[1].report_path, a_report);
        assert!(reports[0].modified >= reports[1].modified);
    }

    #[tokio::test]
    async fn test_report_write_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("a_analysis.json");
        let report = sample_report();

        write_report(&path, &report).await.unwrap();
        assert_eq!(read_report(&path).await.unwrap(), report);

        let raw = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["integrity_analysis"]["final_integrity_score"].is_u64());
    }

    #[tokio::test]
    async fn test_read_trace_rejects_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trace.json");
        fs::write(&path, r#"{"path": "a.webm", "fps": -1.0, "frames": []}"#).unwrap();

        assert!(matches!(
            read_trace(&path).await,
            Err(WorkerError::Engine(_))
        ));
    }
}
