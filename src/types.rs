use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub signal: SignalConfig,
    pub stop_line: StopLineConfig,
    pub plate: PlateConfig,
    pub ocr: OcrConfig,
    pub video: VideoConfig,
    pub logging: LoggingConfig,
}

/// Signal head ROI and the HSV bands that decide the light state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub roi: RoiConfig,
    pub red_band: HsvBand,
    pub yellow_band: HsvBand,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            roi: RoiConfig {
                x: 1700,
                y: 40,
                width: 100,
                height: 250,
            },
            // Hue in degrees (0-360), saturation in percent (0-100),
            // value 0-255, matching imaging::rgb_to_hsv.
            red_band: HsvBand {
                hue_min: 0.0,
                hue_max: 20.0,
                sat_min: 47.0,
                val_min: 70.0,
            },
            yellow_band: HsvBand {
                hue_min: 40.0,
                hue_max: 60.0,
                sat_min: 39.0,
                val_min: 100.0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoiConfig {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HsvBand {
    pub hue_min: f32,
    pub hue_max: f32,
    pub sat_min: f32,
    pub val_min: f32,
}

/// y = slope * x + intercept (or x = slope * y + intercept for the
/// left bound, which runs over rows instead of columns).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LineCoeffs {
    pub slope: f64,
    pub intercept: f64,
}

impl LineCoeffs {
    #[inline]
    pub fn at(&self, v: f64) -> f64 {
        self.slope * v + self.intercept
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StopLineConfig {
    /// Everything at or below this line is outside the analysis region.
    pub lower_bound: LineCoeffs,
    /// Everything above this line is outside the analysis region.
    pub upper_bound: LineCoeffs,
    /// Everything left of x = slope * y + intercept is outside the region.
    pub left_bound: LineCoeffs,
    /// Sliding window capacity for the boundary-y estimates.
    pub smoothing_window: usize,
    /// Fraction of the span by which the drawn start point shifts inward.
    pub start_ratio: f64,
    /// The enforcement line sits this many pixels above the averaged line.
    pub safety_margin_px: i32,
    pub canny_low: f32,
    pub canny_high: f32,
    pub hough_threshold: usize,
    pub min_line_length: f64,
    pub max_line_gap: f64,
}

impl Default for StopLineConfig {
    fn default() -> Self {
        Self {
            lower_bound: LineCoeffs {
                slope: 0.03,
                intercept: 920.0,
            },
            upper_bound: LineCoeffs {
                slope: 0.03,
                intercept: 770.0,
            },
            left_bound: LineCoeffs {
                slope: -0.8,
                intercept: 2420.0,
            },
            smoothing_window: 10,
            start_ratio: 0.32,
            safety_margin_px: 35,
            canny_low: 30.0,
            canny_high: 100.0,
            hough_threshold: 100,
            min_line_length: 160.0,
            max_line_gap: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlateConfig {
    pub cascade_path: String,
    pub scale_factor: f64,
    pub min_neighbors: i32,
    pub min_size: i32,
    /// The crop keeps only this fraction of its width, dropping the
    /// false-positive zone at the right edge of the scene.
    pub crop_width_ratio: f64,
}

impl Default for PlateConfig {
    fn default() -> Self {
        Self {
            cascade_path: "models/haarcascade_russian_plate_number.xml".to_string(),
            scale_factor: 1.07,
            min_neighbors: 15,
            min_size: 20,
            crop_width_ratio: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// External recognizer invocation; the input path and "stdout" are
    /// inserted after the program name, ahead of any remaining options.
    pub command: String,
    pub binarize_threshold: u8,
    /// Scene-specific misread corrections; the first matching rule applies.
    pub corrections: Vec<CorrectionRule>,
    pub plate_pattern: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            command: "tesseract --psm 7".to_string(),
            binarize_threshold: 120,
            corrections: vec![
                CorrectionRule {
                    from: "BW".to_string(),
                    to: "NN".to_string(),
                },
                CorrectionRule {
                    from: "8W".to_string(),
                    to: "NN".to_string(),
                },
            ],
            plate_pattern: "^[A-Z]{2} [0-9]{3,4}$".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionRule {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub input_dir: String,
    pub output_dir: String,
    pub save_annotated: bool,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            input_dir: "videos".to_string(),
            output_dir: "output".to_string(),
            save_annotated: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// One decoded video frame, RGB, row-major HWC.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub timestamp_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalColor {
    Red,
    Yellow,
    Green,
}

impl SignalColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalColor::Red => "RED",
            SignalColor::Yellow => "YELLOW",
            SignalColor::Green => "GREEN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Same rectangle shifted by (dx, dy).
    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}
