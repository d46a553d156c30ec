// src/signal.rs

use crate::imaging::rgb_to_hsv;
use crate::overlay::{self, DrawCommand};
use crate::types::{Frame, HsvBand, SignalColor, SignalConfig};

/// Classifies the signal head ROI into red / yellow / green each frame.
///
/// Stateless: the classification is recomputed from pixels every frame and
/// never cached. Red takes precedence over yellow; a dark or unmatched ROI
/// reads as green.
pub struct SignalStateClassifier {
    config: SignalConfig,
}

impl SignalStateClassifier {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, frame: &Frame, commands: &mut Vec<DrawCommand>) -> SignalColor {
        let roi = self.config.roi;
        let x0 = roi.x.max(0) as usize;
        let y0 = roi.y.max(0) as usize;
        let x1 = ((roi.x + roi.width).max(0) as usize).min(frame.width);
        let y1 = ((roi.y + roi.height).max(0) as usize).min(frame.height);

        let mut red_pixels = 0usize;
        let mut yellow_pixels = 0usize;

        for y in y0..y1 {
            for x in x0..x1 {
                let idx = (y * frame.width + x) * 3;
                let (h, s, v) = rgb_to_hsv(
                    frame.data[idx] as f32,
                    frame.data[idx + 1] as f32,
                    frame.data[idx + 2] as f32,
                );
                if band_matches(&self.config.red_band, h, s, v) {
                    red_pixels += 1;
                } else if band_matches(&self.config.yellow_band, h, s, v) {
                    yellow_pixels += 1;
                }
            }
        }

        let color = if red_pixels > 0 {
            SignalColor::Red
        } else if yellow_pixels > 0 {
            SignalColor::Yellow
        } else {
            SignalColor::Green
        };

        commands.push(overlay::signal_caption(color));
        color
    }
}

#[inline]
fn band_matches(band: &HsvBand, h: f32, s: f32, v: f32) -> bool {
    h >= band.hue_min && h <= band.hue_max && s >= band.sat_min && v >= band.val_min
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RoiConfig;

    fn frame_with_roi_fill(rgb: (u8, u8, u8)) -> (SignalStateClassifier, Frame) {
        let mut config = SignalConfig::default();
        config.roi = RoiConfig {
            x: 2,
            y: 2,
            width: 4,
            height: 4,
        };
        let width = 16;
        let height = 16;
        let mut data = vec![0u8; width * height * 3];
        for y in 2..6 {
            for x in 2..6 {
                let idx = (y * width + x) * 3;
                data[idx] = rgb.0;
                data[idx + 1] = rgb.1;
                data[idx + 2] = rgb.2;
            }
        }
        (
            SignalStateClassifier::new(config),
            Frame {
                data,
                width,
                height,
                timestamp_ms: 0.0,
            },
        )
    }

    #[test]
    fn test_red_roi_classifies_red() {
        let (classifier, frame) = frame_with_roi_fill((255, 0, 0));
        let mut commands = Vec::new();
        assert_eq!(classifier.classify(&frame, &mut commands), SignalColor::Red);
        assert_eq!(commands.len(), 1);
    }

    #[test]
    fn test_yellow_roi_classifies_yellow() {
        let (classifier, frame) = frame_with_roi_fill((255, 230, 0));
        let mut commands = Vec::new();
        assert_eq!(
            classifier.classify(&frame, &mut commands),
            SignalColor::Yellow
        );
    }

    #[test]
    fn test_red_takes_precedence_over_yellow() {
        let (classifier, mut frame) = frame_with_roi_fill((255, 230, 0));
        // Paint half the ROI red so both masks are non-empty.
        for y in 2..4 {
            for x in 2..6 {
                let idx = (y * frame.width + x) * 3;
                frame.data[idx] = 255;
                frame.data[idx + 1] = 0;
                frame.data[idx + 2] = 0;
            }
        }
        let mut commands = Vec::new();
        assert_eq!(classifier.classify(&frame, &mut commands), SignalColor::Red);
    }

    #[test]
    fn test_dark_roi_defaults_to_green() {
        let (classifier, frame) = frame_with_roi_fill((0, 0, 0));
        let mut commands = Vec::new();
        assert_eq!(
            classifier.classify(&frame, &mut commands),
            SignalColor::Green
        );
    }

    #[test]
    fn test_green_roi_classifies_green() {
        let (classifier, frame) = frame_with_roi_fill((0, 255, 0));
        let mut commands = Vec::new();
        assert_eq!(
            classifier.classify(&frame, &mut commands),
            SignalColor::Green
        );
    }
}
