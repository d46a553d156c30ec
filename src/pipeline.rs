// src/pipeline.rs
//
// Per-frame loop and session lifecycle. One orchestrator instance owns one
// session's temporal state; independent sessions never share state, so any
// number of differently-calibrated instances can run side by side.

use crate::ocr::{OcrEngine, PlateTextRecognizer};
use crate::overlay::{self, DrawCommand};
use crate::plate_extraction::{PlateDetector, PlateRegionExtractor};
use crate::signal::SignalStateClassifier;
use crate::stop_line::StopLineEstimator;
use crate::types::{Config, Frame, SignalColor};
use crate::violations::ViolationAggregator;
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Boundary contract for the decoded-frame supplier. `release` must be
/// safe to call once the stream is done or broken; the orchestrator calls
/// it on every exit path.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>>;
    fn release(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Everything a per-frame sink gets to see: the frame itself, the overlay
/// side-output, and the plates newly recorded this frame (the incremental
/// persistence hook — after a mid-stream failure only what the sink saw
/// survives).
pub struct FrameUpdate<'a> {
    pub frame: &'a Frame,
    pub frame_index: u64,
    pub signal: SignalColor,
    pub commands: &'a [DrawCommand],
    pub new_violations: &'a [String],
}

pub struct PipelineOrchestrator<D: PlateDetector, E: OcrEngine> {
    classifier: SignalStateClassifier,
    estimator: StopLineEstimator,
    extractor: PlateRegionExtractor<D>,
    recognizer: PlateTextRecognizer<E>,
    aggregator: ViolationAggregator,
    state: SessionState,
    cancel: Arc<AtomicBool>,
}

impl<D: PlateDetector, E: OcrEngine> PipelineOrchestrator<D, E> {
    pub fn new(config: Config, detector: D, engine: E) -> Result<Self> {
        let aggregator = ViolationAggregator::new(&config.ocr.plate_pattern)?;
        Ok(Self {
            classifier: SignalStateClassifier::new(config.signal),
            estimator: StopLineEstimator::new(config.stop_line),
            extractor: PlateRegionExtractor::new(config.plate, detector),
            recognizer: PlateTextRecognizer::new(config.ocr, engine),
            aggregator,
            state: SessionState::Idle,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Shared flag polled once per frame; setting it ends the session with
    /// `Cancelled` and the partial snapshot. The flag belongs to the
    /// caller and is never reset by the orchestrator.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Live view of the violations recorded so far this session.
    pub fn violations(&self) -> &[String] {
        self.aggregator.snapshot()
    }

    pub fn process_video<S: FrameSource>(&mut self, source: S) -> Result<Vec<String>> {
        self.process_video_with(source, |_| Ok(()))
    }

    /// Drive one full session over `source`. The frame source is released
    /// on every exit path; a stream or sink error leaves the session
    /// `Failed` and discards the accumulated list.
    pub fn process_video_with<S, F>(&mut self, mut source: S, mut sink: F) -> Result<Vec<String>>
    where
        S: FrameSource,
        F: FnMut(FrameUpdate<'_>) -> Result<()>,
    {
        self.state = SessionState::Running;
        self.aggregator.reset();
        self.estimator.reset();

        let result = self.run(&mut source, &mut sink);
        source.release();

        if result.is_err() {
            self.state = SessionState::Failed;
        }
        result
    }

    fn run<S, F>(&mut self, source: &mut S, sink: &mut F) -> Result<Vec<String>>
    where
        S: FrameSource,
        F: FnMut(FrameUpdate<'_>) -> Result<()>,
    {
        let mut frame_index: u64 = 0;
        let mut red_frames: u64 = 0;
        let mut candidates_seen: u64 = 0;

        loop {
            if self.cancel.load(Ordering::SeqCst) {
                info!(
                    "cancellation requested after {} frames, returning partial result",
                    frame_index
                );
                self.state = SessionState::Cancelled;
                return Ok(self.aggregator.snapshot().to_vec());
            }

            let frame = match source.next_frame()? {
                Some(frame) => frame,
                None => break,
            };
            frame_index += 1;

            let mut commands: Vec<DrawCommand> = Vec::new();
            let mut new_violations: Vec<String> = Vec::new();

            // Signal and stop line update every frame; plate work only
            // while the light is red.
            let color = self.classifier.classify(&frame, &mut commands);
            let estimate = self.estimator.update(&frame, color, &mut commands);

            if color == SignalColor::Red {
                red_frames += 1;
                match self.extractor.extract(&estimate.below_line, &mut commands) {
                    Ok(candidates) => {
                        candidates_seen += candidates.len() as u64;
                        for candidate in &candidates {
                            match self.recognizer.recognize(candidate) {
                                Ok(text) => {
                                    if self.aggregator.try_record(&text) {
                                        info!("fined license plate: {}", text);
                                        new_violations.push(text);
                                    }
                                }
                                Err(e) => {
                                    debug!("OCR failed on frame {}: {}", frame_index, e)
                                }
                            }
                        }
                    }
                    Err(e) => debug!("plate extraction failed on frame {}: {}", frame_index, e),
                }
            }

            if !self.aggregator.is_empty() {
                commands.extend(overlay::violation_list(self.aggregator.snapshot()));
            }

            sink(FrameUpdate {
                frame: &frame,
                frame_index,
                signal: color,
                commands: &commands,
                new_violations: &new_violations,
            })?;

            if frame_index % 50 == 0 {
                debug!(
                    "frame {}: signal={} window={} violations={}",
                    frame_index,
                    color.as_str(),
                    self.estimator.window_len(),
                    self.aggregator.len()
                );
            }
        }

        info!(
            "stream exhausted: {} frames, {} red, {} plate candidates, {} violations",
            frame_index,
            red_frames,
            candidates_seen,
            self.aggregator.len()
        );
        self.state = SessionState::Completed;
        Ok(self.aggregator.snapshot().to_vec())
    }
}
