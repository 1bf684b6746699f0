//! FFmpeg-backed frame source.
//!
//! FFmpeg resamples the recording to the analysis rate and writes packed
//! RGB24 frames to stdout; frames are read one at a time so memory stays
//! bounded by a single frame regardless of recording length.

use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use proctor_engine::{EngineError, EngineResult, FrameSource};
use proctor_models::Frame;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};
use crate::probe::VideoProbe;

/// FFmpeg arguments decoding `path` to raw RGB24 at `sample_fps`.
pub fn decode_args(path: &Path, sample_fps: f64) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        path.to_string_lossy().into_owned(),
        "-an".to_string(),
        "-vf".to_string(),
        format!("fps={}", sample_fps),
        "-pix_fmt".to_string(),
        "rgb24".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-".to_string(),
    ]
}

/// Splits a raw RGB24 byte stream into frames.
#[derive(Debug)]
pub struct RawFrameReader<R> {
    reader: R,
    width: u32,
    height: u32,
    fps: f64,
    next_index: u64,
}

impl<R: Read> RawFrameReader<R> {
    pub fn new(reader: R, width: u32, height: u32, fps: f64) -> Self {
        Self {
            reader,
            width,
            height,
            fps,
            next_index: 0,
        }
    }

    /// Frames yielded so far.
    pub fn frames_read(&self) -> u64 {
        self.next_index
    }

    /// Read the next complete frame.
    ///
    /// Returns `Ok(None)` at end of stream. A trailing partial frame is
    /// discarded and also ends the stream.
    pub fn next_frame(&mut self) -> io::Result<Option<Frame>> {
        let frame_len = Frame::rgb_len(self.width, self.height);
        let mut data = vec![0u8; frame_len];

        let mut filled = 0;
        while filled < frame_len {
            match self.reader.read(&mut data[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        if filled < frame_len {
            if filled > 0 {
                warn!(
                    bytes = filled,
                    expected = frame_len,
                    frame = self.next_index,
                    "Discarding truncated final frame"
                );
            }
            return Ok(None);
        }

        let index = self.next_index;
        self.next_index += 1;
        Ok(Some(Frame {
            index,
            timestamp: index as f64 / self.fps,
            width: self.width,
            height: self.height,
            data,
        }))
    }
}

/// Lines of FFmpeg stderr kept for error messages.
const STDERR_TAIL_LINES: usize = 20;

/// Drain `stderr` on a background thread, keeping the last lines.
///
/// FFmpeg blocks once the stderr pipe buffer is full, so the pipe must be
/// read while frames are still being pulled from stdout.
fn spawn_stderr_tail(stderr: ChildStderr) -> io::Result<JoinHandle<String>> {
    std::thread::Builder::new()
        .name("ffmpeg-stderr".to_string())
        .spawn(move || {
            let mut reader = BufReader::new(stderr);
            let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
            let mut line = Vec::new();

            loop {
                line.clear();
                match reader.read_until(b'\n', &mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        let text = String::from_utf8_lossy(&line).trim_end().to_string();
                        if text.is_empty() {
                            continue;
                        }
                        if tail.len() == STDERR_TAIL_LINES {
                            tail.pop_front();
                        }
                        tail.push_back(text);
                    }
                }
            }

            Vec::from(tail).join("\n")
        })
}

/// Frame source decoding a recording with an FFmpeg subprocess.
pub struct FfmpegFrameSource {
    path: String,
    sample_fps: f64,
    child: Child,
    frames: RawFrameReader<BufReader<ChildStdout>>,
    stderr_tail: Option<JoinHandle<String>>,
    finished: bool,
}

impl FfmpegFrameSource {
    /// Start decoding `path` at `sample_fps` frames per second.
    ///
    /// `probe` supplies the frame dimensions; use [`crate::probe_video`]
    /// to obtain it.
    pub fn open(path: impl AsRef<Path>, probe: &VideoProbe, sample_fps: f64) -> MediaResult<Self> {
        let path = path.as_ref();

        if !sample_fps.is_finite() || sample_fps <= 0.0 {
            return Err(MediaError::internal(format!(
                "Invalid sample rate: {}",
                sample_fps
            )));
        }
        if !probe.has_dimensions() {
            return Err(MediaError::InvalidVideo(format!(
                "No frame dimensions for {}",
                path.display()
            )));
        }

        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let mut command = Command::new("ffmpeg");
        command.args(decode_args(path, sample_fps));

        info!(
            path = %path.display(),
            width = probe.width,
            height = probe.height,
            sample_fps,
            "Decoding frames with FFmpeg"
        );

        Self::spawn(command, path, probe.width, probe.height, sample_fps)
    }

    /// Start `command` and read raw RGB24 frames from its stdout.
    fn spawn(
        mut command: Command,
        path: &Path,
        width: u32,
        height: u32,
        sample_fps: f64,
    ) -> MediaResult<Self> {
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                MediaError::ffmpeg_failed(format!("Failed to spawn FFmpeg: {}", e), None, None)
            })?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(MediaError::ffmpeg_failed(
                "Failed to capture FFmpeg output",
                None,
                None,
            ));
        };

        let stderr_tail = match spawn_stderr_tail(stderr) {
            Ok(handle) => handle,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(MediaError::Io(e));
            }
        };

        Ok(Self {
            path: path.to_string_lossy().into_owned(),
            sample_fps,
            child,
            frames: RawFrameReader::new(BufReader::new(stdout), width, height, sample_fps),
            stderr_tail: Some(stderr_tail),
            finished: false,
        })
    }

    /// Reap FFmpeg once stdout is exhausted.
    ///
    /// A failed exit before any frame means the recording could not be
    /// decoded at all; after that it is a mid-stream failure. Either way
    /// the run is aborted.
    fn finish(&mut self) -> Option<EngineError> {
        self.finished = true;

        let status = match self.child.wait() {
            Ok(status) => status,
            Err(e) => return Some(EngineError::stream(format!("FFmpeg process error: {}", e))),
        };
        let stderr = self.stderr_tail();

        if status.success() {
            debug!(frames = self.frames.frames_read(), "FFmpeg finished");
            return None;
        }

        let frames = self.frames.frames_read();
        if frames == 0 {
            return Some(EngineError::stream_open(format!(
                "FFmpeg could not decode {}: {}",
                self.path, stderr
            )));
        }

        warn!(
            exit_code = ?status.code(),
            frames,
            "FFmpeg exited with error after decoding frames"
        );
        Some(EngineError::stream(format!(
            "FFmpeg failed after {} frames of {} (exit code {:?}): {}",
            frames,
            self.path,
            status.code(),
            stderr
        )))
    }

    /// Collected stderr tail; empty if the reader thread panicked.
    fn stderr_tail(&mut self) -> String {
        self.stderr_tail
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default()
    }
}

impl Iterator for FfmpegFrameSource {
    type Item = EngineResult<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.frames.next_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => self.finish().map(Err),
            Err(e) => {
                self.finished = true;
                let _ = self.child.kill();
                let _ = self.child.wait();
                Some(Err(EngineError::stream(format!(
                    "Failed to read frame {}: {}",
                    self.frames.frames_read(),
                    e
                ))))
            }
        }
    }
}

impl FrameSource for FfmpegFrameSource {
    fn source_path(&self) -> &str {
        &self.path
    }

    fn frame_rate(&self) -> f64 {
        self.sample_fps
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_decode_args() {
        let args = decode_args(Path::new("uploads/a.webm"), 5.0);
        assert!(args.windows(2).any(|w| w[0] == "-i" && w[1] == "uploads/a.webm"));
        assert!(args.windows(2).any(|w| w[0] == "-vf" && w[1] == "fps=5"));
        assert!(args.windows(2).any(|w| w[0] == "-pix_fmt" && w[1] == "rgb24"));
        assert_eq!(args.last().map(String::as_str), Some("-"));
    }

    #[test]
    fn test_reader_splits_frames() {
        let (w, h) = (2u32, 2u32);
        let frame_len = Frame::rgb_len(w, h);
        let bytes: Vec<u8> = (0..frame_len * 3).map(|i| i as u8).collect();

        let mut reader = RawFrameReader::new(Cursor::new(bytes), w, h, 4.0);
        let mut frames = Vec::new();
        while let Some(frame) = reader.next_frame().unwrap() {
            frames.push(frame);
        }

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[1].index, 1);
        assert_eq!(frames[1].timestamp, 0.25);
        assert_eq!(frames[2].timestamp, 0.5);
        assert_eq!(frames[1].data[0], frame_len as u8);
        assert!(frames.iter().all(Frame::is_well_formed));
    }

    #[test]
    fn test_reader_drops_truncated_tail() {
        let frame_len = Frame::rgb_len(4, 4);
        let bytes = vec![7u8; frame_len * 2 + frame_len / 2];

        let mut reader = RawFrameReader::new(Cursor::new(bytes), 4, 4, 5.0);
        assert!(reader.next_frame().unwrap().is_some());
        assert!(reader.next_frame().unwrap().is_some());
        assert!(reader.next_frame().unwrap().is_none());
        assert_eq!(reader.frames_read(), 2);
    }

    /// Frame source over a shell script standing in for FFmpeg.
    #[cfg(unix)]
    fn scripted_source(script: &str, width: u32, height: u32) -> FfmpegFrameSource {
        let mut command = Command::new("sh");
        command.arg("-c").arg(script);
        FfmpegFrameSource::spawn(command, Path::new("scripted.webm"), width, height, 5.0).unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn test_verbose_stderr_does_not_stall_frames() {
        // Far more stderr than a pipe buffer holds, then one 2x2 frame
        let source = scripted_source(
            "head -c 200000 /dev/zero | tr '\\0' 'x' >&2; head -c 12 /dev/zero",
            2,
            2,
        );

        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let results: Vec<_> = source.collect();
            let _ = tx.send(results);
        });

        let results = rx
            .recv_timeout(std::time::Duration::from_secs(20))
            .expect("frame source stalled on stderr output");
        assert_eq!(results.len(), 1);
        assert!(results[0].is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_after_frames_aborts_stream() {
        let mut source = scripted_source(
            "head -c 24 /dev/zero; echo 'corrupt packet' >&2; exit 1",
            2,
            2,
        );

        assert!(matches!(source.next(), Some(Ok(_))));
        assert!(matches!(source.next(), Some(Ok(_))));
        match source.next() {
            Some(Err(EngineError::Stream(message))) => {
                assert!(message.contains("after 2 frames"));
                assert!(message.contains("corrupt packet"));
            }
            other => panic!("expected stream error, got {:?}", other.map(|r| r.map(|f| f.index))),
        }
        assert!(source.next().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_before_frames_is_open_error() {
        let mut source = scripted_source("echo 'Invalid data found' >&2; exit 1", 2, 2);

        match source.next() {
            Some(Err(err)) => {
                assert!(err.is_stream_open());
                assert!(err.to_string().contains("Invalid data found"));
            }
            other => panic!("expected open error, got {:?}", other.map(|r| r.map(|f| f.index))),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_clean_exit_ends_stream() {
        let source = scripted_source("echo 'frame=2' >&2; head -c 24 /dev/zero", 2, 2);
        let results: Vec<_> = source.collect();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(Result::is_ok));
    }

    #[test]
    fn test_open_rejects_bad_input() {
        let probe = VideoProbe {
            duration: 10.0,
            width: 0,
            height: 0,
            fps: 30.0,
            codec: "vp8".to_string(),
            size: 0,
        };
        assert!(matches!(
            FfmpegFrameSource::open("a.webm", &probe, 5.0),
            Err(MediaError::InvalidVideo(_))
        ));

        let probe = VideoProbe {
            width: 640,
            height: 480,
            ..probe
        };
        assert!(FfmpegFrameSource::open("a.webm", &probe, 0.0).is_err());
    }
}
