//! Event detection and integrity scoring for recorded proctoring sessions.
//!
//! The engine turns noisy per-frame perception signals into a short list of
//! debounced violation events and reduces them to a 0-100 integrity score.
//!
//! Per frame:
//!
//! ```text
//! frame -> {detections, face signal}
//!       -> ObjectPersistenceTracker::observe
//!       -> FaceFocusTracker::observe
//!       -> EventLog
//! ```
//!
//! After the last frame the log is scored and assembled into a
//! [`SessionReport`](proctor_models::SessionReport).
//!
//! Processing is single-threaded and deterministic: identical inputs yield
//! identical event lists. Decoding and model inference are delegated to the
//! [`providers`] traits.

pub mod config;
pub mod error;
pub mod event_log;
pub mod face_tracker;
pub mod object_tracker;
pub mod providers;
pub mod report;
pub mod scorer;
pub mod session;
pub mod trace;

pub use config::{EngineConfig, FaceTrackerConfig, ObjectTrackerConfig};
pub use error::{EngineError, EngineResult};
pub use event_log::EventLog;
pub use face_tracker::FaceFocusTracker;
pub use object_tracker::ObjectPersistenceTracker;
pub use providers::{DetectionProvider, FaceSignalProvider, FrameSource, VecFrameSource};
pub use report::assemble_report;
pub use scorer::{penalty_for, score, PENALTIES};
pub use session::{process, process_recording, ProctoringSession};
pub use trace::{replay, SignalTrace, TraceFrame};
