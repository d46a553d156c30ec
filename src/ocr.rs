// src/ocr.rs

use crate::imaging::{self, GrayImage};
use crate::plate_extraction::PlateCandidate;
use crate::types::OcrConfig;
use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};

/// Boundary contract for the OCR engine: synchronous, bounded, takes the
/// already-binarized crop.
pub trait OcrEngine {
    fn recognize(&mut self, image: &GrayImage) -> Result<String>;
}

/// Turns a plate candidate into normalized text: binarize to kill shading,
/// run the engine, trim, then apply the scene's confusion corrections.
/// The result may still be empty or malformed; format validation happens
/// at recording time.
pub struct PlateTextRecognizer<E: OcrEngine> {
    config: OcrConfig,
    engine: E,
}

impl<E: OcrEngine> PlateTextRecognizer<E> {
    pub fn new(config: OcrConfig, engine: E) -> Self {
        Self { config, engine }
    }

    pub fn recognize(&mut self, candidate: &PlateCandidate) -> Result<String> {
        let binarized =
            imaging::threshold_binary(&candidate.image, self.config.binarize_threshold);
        let raw = self.engine.recognize(&binarized)?;
        let mut text = raw.trim().to_string();

        // First matching rule wins; the misreads these cover never co-occur.
        for rule in &self.config.corrections {
            if text.contains(&rule.from) {
                text = text.replace(&rule.from, &rule.to);
                break;
            }
        }

        Ok(text)
    }
}

static OCR_SEQ: AtomicU64 = AtomicU64::new(0);

/// External OCR process (Tesseract by default). The crop is handed over as
/// a PGM temp file; the command gets the input path and "stdout" inserted
/// after the program name, ahead of any configured options.
pub struct TesseractOcr {
    program: String,
    args: Vec<String>,
}

impl TesseractOcr {
    pub fn new(command: &str) -> Result<Self> {
        let mut parts = shell_words::split(command).context("parsing OCR command")?;
        if parts.is_empty() {
            bail!("OCR command is empty");
        }
        let program = parts.remove(0);
        Ok(Self {
            program,
            args: parts,
        })
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&mut self, image: &GrayImage) -> Result<String> {
        if image.width == 0 || image.height == 0 {
            return Ok(String::new());
        }

        let seq = OCR_SEQ.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "plate_ocr_{}_{}.pgm",
            std::process::id(),
            seq
        ));
        write_pgm(&path, image)?;

        let output = Command::new(&self.program)
            .arg(&path)
            .arg("stdout")
            .args(&self.args)
            .output()
            .with_context(|| format!("running OCR command `{}`", self.program));
        let _ = std::fs::remove_file(&path);
        let output = output?;

        if !output.status.success() {
            bail!(
                "OCR command exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn write_pgm(path: &Path, image: &GrayImage) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("creating OCR scratch file {}", path.display()))?;
    write!(file, "P5\n{} {}\n255\n", image.width, image.height)?;
    file.write_all(&image.data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rect;

    struct FixedOcr(String);

    impl OcrEngine for FixedOcr {
        fn recognize(&mut self, _image: &GrayImage) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    fn candidate() -> PlateCandidate {
        PlateCandidate {
            image: GrayImage::from_raw(vec![200u8; 40 * 20], 40, 20),
            bbox: Rect::new(0, 0, 40, 20),
            frame_bbox: Rect::new(0, 0, 40, 20),
        }
    }

    #[test]
    fn test_trims_and_passes_through() {
        let mut recognizer =
            PlateTextRecognizer::new(OcrConfig::default(), FixedOcr(" AB 1234\n".to_string()));
        assert_eq!(recognizer.recognize(&candidate()).unwrap(), "AB 1234");
    }

    #[test]
    fn test_bw_corrected_to_nn() {
        let mut recognizer =
            PlateTextRecognizer::new(OcrConfig::default(), FixedOcr("BW 1234".to_string()));
        assert_eq!(recognizer.recognize(&candidate()).unwrap(), "NN 1234");
    }

    #[test]
    fn test_8w_corrected_to_nn() {
        let mut recognizer =
            PlateTextRecognizer::new(OcrConfig::default(), FixedOcr("AB 8W34".to_string()));
        assert_eq!(recognizer.recognize(&candidate()).unwrap(), "AB NN34");
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let mut recognizer =
            PlateTextRecognizer::new(OcrConfig::default(), FixedOcr("BW8W".to_string()));
        // The BW rule fires and ends correction; 8W stays untouched.
        assert_eq!(recognizer.recognize(&candidate()).unwrap(), "NN8W");
    }

    #[test]
    fn test_empty_output_stays_empty() {
        let mut recognizer =
            PlateTextRecognizer::new(OcrConfig::default(), FixedOcr("  \n".to_string()));
        assert_eq!(recognizer.recognize(&candidate()).unwrap(), "");
    }

    #[test]
    fn test_pgm_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crop.pgm");
        let image = GrayImage::from_raw(vec![7u8; 6], 3, 2);
        write_pgm(&path, &image).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"P5\n3 2\n255\n"));
        assert_eq!(&bytes[bytes.len() - 6..], &[7u8; 6]);
    }

    #[test]
    fn test_command_parsing_rejects_empty() {
        assert!(TesseractOcr::new("").is_err());
        let ocr = TesseractOcr::new("tesseract --psm 7").unwrap();
        assert_eq!(ocr.program, "tesseract");
        assert_eq!(ocr.args, vec!["--psm", "7"]);
    }
}
