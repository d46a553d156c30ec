// src/stop_line.rs
//
// Temporal stop-line estimation. Each frame contributes the boundary
// y-coordinates of every detected line segment to two fixed-capacity
// windows; the running averages define the current line model. The
// estimate therefore settles over time instead of jumping with every
// noisy detection.

use crate::imaging::{self, GrayImage, RgbImage};
use crate::line_detection::{self, HoughParams};
use crate::overlay::{DrawCommand, OverlayColor};
use crate::types::{Frame, SignalColor, StopLineConfig};
use std::collections::VecDeque;

/// Fixed-capacity FIFO of integers with an incremental running sum.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    values: VecDeque<i32>,
    capacity: usize,
    sum: i64,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
            sum: 0,
        }
    }

    pub fn push(&mut self, value: i32) {
        if self.values.len() == self.capacity {
            if let Some(oldest) = self.values.pop_front() {
                self.sum -= oldest as i64;
            }
        }
        self.values.push_back(value);
        self.sum += value as i64;
    }

    /// Arithmetic mean of the window contents; 0 when empty.
    pub fn mean(&self) -> i32 {
        if self.values.is_empty() {
            return 0;
        }
        (self.sum / self.values.len() as i64) as i32
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.sum = 0;
    }
}

/// y = slope * x + intercept, in full-frame coordinates.
#[derive(Debug, Clone, Copy)]
pub struct StopLineModel {
    pub slope: f64,
    pub intercept: f64,
}

impl StopLineModel {
    #[inline]
    pub fn y_at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Per-frame estimator output: the safety-adjusted line model and the
/// frame copy with everything above that line zeroed.
pub struct StopLineEstimate {
    pub model: StopLineModel,
    pub below_line: RgbImage,
}

pub struct StopLineEstimator {
    config: StopLineConfig,
    start_y: SlidingWindow,
    end_y: SlidingWindow,
}

impl StopLineEstimator {
    pub fn new(config: StopLineConfig) -> Self {
        let capacity = config.smoothing_window;
        Self {
            config,
            start_y: SlidingWindow::new(capacity),
            end_y: SlidingWindow::new(capacity),
        }
    }

    /// Drop all temporal state (new session).
    pub fn reset(&mut self) {
        self.start_y.clear();
        self.end_y.clear();
    }

    pub fn window_len(&self) -> usize {
        self.start_y.len()
    }

    /// Feed one frame. The signal color picks the overlay color only; the
    /// windows are updated regardless of the light state.
    pub fn update(
        &mut self,
        frame: &Frame,
        color: SignalColor,
        commands: &mut Vec<DrawCommand>,
    ) -> StopLineEstimate {
        let width = frame.width;
        let height = frame.height;

        let region = self.region_masked(frame);
        let gray = imaging::grayscale(&region, width, height);
        let blurred = imaging::gaussian_blur(&gray, 7);
        let equalized = imaging::clahe(&blurred, 2.0, 8);
        let edges = line_detection::canny(&equalized, self.config.canny_low, self.config.canny_high);
        let closed = close_gaps(&edges);

        let segments = line_detection::detect_segments(
            &closed,
            &HoughParams {
                threshold: self.config.hough_threshold,
                min_line_length: self.config.min_line_length,
                max_line_gap: self.config.max_line_gap,
            },
        );

        let x_end = width.saturating_sub(1) as f64;
        for segment in &segments {
            let run = (segment.x2 - segment.x1) as f64;
            let slope = (segment.y2 - segment.y1) as f64 / (run + f64::EPSILON);
            let intercept = segment.y1 as f64 - slope * segment.x1 as f64;
            self.start_y.push(intercept.round() as i32);
            self.end_y.push((slope * x_end + intercept).round() as i32);
        }

        let avg_start = self.start_y.mean();
        let avg_end = self.end_y.mean();

        // The drawn line starts partway across the frame; the left stretch
        // of the scene has no road surface worth annotating.
        let ratio = self.config.start_ratio;
        let x_start_adj = (ratio * x_end) as i32;
        let y_start_adj = avg_start + (ratio * (avg_end - avg_start) as f64) as i32;
        commands.push(DrawCommand::Line {
            from: (x_start_adj, y_start_adj),
            to: (x_end as i32, avg_end),
            color: OverlayColor::from(color),
            thickness: 4,
        });

        let slope = (avg_end - avg_start) as f64 / (x_end + f64::EPSILON);
        let model = StopLineModel {
            slope,
            intercept: avg_start as f64 - self.config.safety_margin_px as f64,
        };

        let mut below = frame.data.clone();
        for x in 0..width {
            let cut = (model.y_at(x as f64) as i32).clamp(0, height as i32) as usize;
            for y in 0..cut {
                let idx = (y * width + x) * 3;
                below[idx] = 0;
                below[idx + 1] = 0;
                below[idx + 2] = 0;
            }
        }

        StopLineEstimate {
            model,
            below_line: RgbImage::from_raw(below, width, height),
        }
    }

    /// Zero everything outside the calibrated analysis region: at or below
    /// the lower bound, above the upper bound, or left of the left bound.
    fn region_masked(&self, frame: &Frame) -> Vec<u8> {
        let width = frame.width;
        let height = frame.height;
        let mut masked = frame.data.clone();

        let zero = |data: &mut Vec<u8>, x: usize, y: usize| {
            let idx = (y * width + x) * 3;
            data[idx] = 0;
            data[idx + 1] = 0;
            data[idx + 2] = 0;
        };

        for x in 0..width {
            let lower = (self.config.lower_bound.at(x as f64) as i32).clamp(0, height as i32);
            for y in lower as usize..height {
                zero(&mut masked, x, y);
            }
            let upper = (self.config.upper_bound.at(x as f64) as i32).clamp(0, height as i32);
            for y in 0..upper as usize {
                zero(&mut masked, x, y);
            }
        }
        for y in 0..height {
            let left = (self.config.left_bound.at(y as f64) as i32).clamp(0, width as i32);
            for x in 0..left as usize {
                zero(&mut masked, x, y);
            }
        }

        masked
    }
}

/// Dilate then erode to close single-pixel breaks in the edge map.
fn close_gaps(edges: &GrayImage) -> GrayImage {
    let dilated = imaging::dilate(edges, 3, 1);
    imaging::erode(&dilated, 3, 1)
}
