// src/cascade.rs

use crate::imaging::GrayImage;
use crate::plate_extraction::PlateDetector;
use crate::types::{PlateConfig, Rect};
use anyhow::Result;
use opencv::{core, objdetect::CascadeClassifier, prelude::*};
use tracing::info;

/// Pretrained Haar cascade over grayscale crops. Loading the model is the
/// only failure mode that matters here and it is fatal at construction;
/// an unloadable cascade means no session can start.
pub struct CascadePlateDetector {
    classifier: CascadeClassifier,
    scale_factor: f64,
    min_neighbors: i32,
    min_size: i32,
}

impl CascadePlateDetector {
    pub fn new(config: &PlateConfig) -> Result<Self> {
        let classifier = CascadeClassifier::new(&config.cascade_path)?;
        if classifier.empty()? {
            anyhow::bail!("cascade model {} failed to load", config.cascade_path);
        }
        info!("Loaded plate cascade: {}", config.cascade_path);
        Ok(Self {
            classifier,
            scale_factor: config.scale_factor,
            min_neighbors: config.min_neighbors,
            min_size: config.min_size,
        })
    }
}

impl PlateDetector for CascadePlateDetector {
    fn detect(&mut self, image: &GrayImage) -> Result<Vec<Rect>> {
        if image.width == 0 || image.height == 0 {
            return Ok(Vec::new());
        }

        let mat = Mat::from_slice(&image.data)?;
        let mat = mat.reshape(1, image.height as i32)?;

        let mut objects = core::Vector::<core::Rect>::new();
        self.classifier.detect_multi_scale(
            &mat,
            &mut objects,
            self.scale_factor,
            self.min_neighbors,
            0,
            core::Size::new(self.min_size, self.min_size),
            core::Size::new(0, 0),
        )?;

        Ok(objects
            .iter()
            .map(|r| Rect::new(r.x, r.y, r.width, r.height))
            .collect())
    }
}
