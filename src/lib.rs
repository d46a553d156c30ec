//! Red-light violation detection pipeline.
//!
//! Per-frame flow: classify the signal ROI, update the smoothed stop-line
//! estimate, and — only while the signal is red — localize plate candidates
//! below the line, run OCR on each, and record deduplicated violations.
//!
//! The algorithmic core is pure Rust over raw RGB/grayscale buffers; video
//! decoding, the pretrained cascade detector, and overlay rendering are
//! OpenCV-backed and gated behind the `video-opencv` feature.

pub mod config;
pub mod imaging;
pub mod line_detection;
pub mod ocr;
pub mod overlay;
pub mod pipeline;
pub mod plate_extraction;
pub mod signal;
pub mod stop_line;
pub mod types;
pub mod violations;

#[cfg(feature = "video-opencv")]
pub mod cascade;
#[cfg(feature = "video-opencv")]
pub mod video_processor;

pub use pipeline::{FrameSource, FrameUpdate, PipelineOrchestrator, SessionState};
pub use types::{Config, Frame, SignalColor};
