use crate::types::Config;
use anyhow::{Context, Result};
use std::fs;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading config {}", path))?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_missing_sections() {
        let config: Config = serde_yaml::from_str("signal:\n  roi: {x: 10, y: 20, width: 30, height: 40}\n").unwrap();
        assert_eq!(config.signal.roi.x, 10);
        assert_eq!(config.stop_line.smoothing_window, 10);
        assert_eq!(config.ocr.binarize_threshold, 120);
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        assert!(Config::load("definitely/not/here.yaml").is_err());
    }
}
