// src/plate_extraction.rs

use crate::imaging::{self, GrayImage, RgbImage};
use crate::overlay::{DrawCommand, OverlayColor};
use crate::types::{PlateConfig, Rect};
use anyhow::Result;

/// Boundary contract for the pretrained plate detector. The cascade
/// implementation lives behind the `video-opencv` feature; tests substitute
/// their own.
pub trait PlateDetector {
    fn detect(&mut self, image: &GrayImage) -> Result<Vec<Rect>>;
}

/// One localized plate: the grayscale crop handed to OCR, its box in
/// cropped-region coordinates, and the same box in full-frame coordinates
/// for the overlay.
#[derive(Debug, Clone)]
pub struct PlateCandidate {
    pub image: GrayImage,
    pub bbox: Rect,
    pub frame_bbox: Rect,
}

pub struct PlateRegionExtractor<D: PlateDetector> {
    config: PlateConfig,
    detector: D,
}

impl<D: PlateDetector> PlateRegionExtractor<D> {
    pub fn new(config: PlateConfig, detector: D) -> Self {
        Self { config, detector }
    }

    /// Localize plate candidates in the below-line region. An empty region
    /// (no visible road yet) yields zero candidates, never an error.
    pub fn extract(
        &mut self,
        below_line: &RgbImage,
        commands: &mut Vec<DrawCommand>,
    ) -> Result<Vec<PlateCandidate>> {
        let gray = imaging::grayscale(&below_line.data, below_line.width, below_line.height);
        let eroded = imaging::erode(&gray, 2, 1);

        // The bounding box comes from the raw masked grayscale: contrast
        // equalization lifts black levels, so it runs after this check.
        let bbox = match imaging::non_zero_bounding_box(&eroded) {
            Some(rect) => rect,
            None => return Ok(Vec::new()),
        };

        let narrowed = (bbox.width as f64 * self.config.crop_width_ratio) as i32;
        if narrowed < 1 {
            return Ok(Vec::new());
        }
        let crop_rect = Rect::new(bbox.x, bbox.y, narrowed, bbox.height);

        let equalized = imaging::clahe(&eroded, 2.0, 8);
        let cropped = equalized.crop(crop_rect);
        if cropped.width == 0 || cropped.height == 0 {
            return Ok(Vec::new());
        }

        let detections = self.detector.detect(&cropped)?;
        let mut candidates = Vec::with_capacity(detections.len());
        for rect in detections {
            let frame_bbox = rect.translated(crop_rect.x, crop_rect.y);
            commands.push(DrawCommand::Rect {
                rect: frame_bbox,
                color: OverlayColor::Green,
                thickness: 3,
            });
            candidates.push(PlateCandidate {
                image: cropped.crop(rect),
                bbox: rect,
                frame_bbox,
            });
        }

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingDetector {
        calls: usize,
        response: Vec<Rect>,
    }

    impl PlateDetector for CountingDetector {
        fn detect(&mut self, _image: &GrayImage) -> Result<Vec<Rect>> {
            self.calls += 1;
            Ok(self.response.clone())
        }
    }

    fn region_with_block(x0: usize, y0: usize, w: usize, h: usize) -> RgbImage {
        let width = 400;
        let height = 300;
        let mut data = vec![0u8; width * height * 3];
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                let idx = (y * width + x) * 3;
                data[idx] = 220;
                data[idx + 1] = 220;
                data[idx + 2] = 220;
            }
        }
        RgbImage::from_raw(data, width, height)
    }

    #[test]
    fn test_all_zero_region_yields_no_candidates() {
        let detector = CountingDetector {
            calls: 0,
            response: vec![Rect::new(0, 0, 10, 10)],
        };
        let mut extractor = PlateRegionExtractor::new(PlateConfig::default(), detector);
        let empty = RgbImage::from_raw(vec![0u8; 400 * 300 * 3], 400, 300);

        let mut commands = Vec::new();
        let candidates = extractor.extract(&empty, &mut commands).unwrap();
        assert!(candidates.is_empty());
        assert_eq!(extractor.detector.calls, 0, "detector must not run");
        assert!(commands.is_empty());
    }

    #[test]
    fn test_detection_translates_to_frame_coordinates() {
        let detector = CountingDetector {
            calls: 0,
            response: vec![Rect::new(10, 5, 40, 20)],
        };
        let mut extractor = PlateRegionExtractor::new(PlateConfig::default(), detector);
        let region = region_with_block(100, 80, 200, 100);

        let mut commands = Vec::new();
        let candidates = extractor.extract(&region, &mut commands).unwrap();
        assert_eq!(candidates.len(), 1);

        let candidate = &candidates[0];
        // Erosion trims one pixel off the block edge, so the crop origin is
        // within a pixel of the block origin.
        assert!((candidate.frame_bbox.x - 111).abs() <= 1);
        assert!((candidate.frame_bbox.y - 86).abs() <= 1);
        assert_eq!(candidate.bbox, Rect::new(10, 5, 40, 20));
        assert_eq!(candidate.image.width, 40);
        assert_eq!(candidate.image.height, 20);
        assert_eq!(commands.len(), 1);
    }

    #[test]
    fn test_crop_width_is_narrowed() {
        let detector = CountingDetector {
            calls: 0,
            response: Vec::new(),
        };
        let mut extractor = PlateRegionExtractor::new(PlateConfig::default(), detector);
        let region = region_with_block(100, 80, 200, 100);

        let mut commands = Vec::new();
        extractor.extract(&region, &mut commands).unwrap();
        assert_eq!(extractor.detector.calls, 1);
    }
}
