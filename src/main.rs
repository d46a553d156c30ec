// src/main.rs

use anyhow::Result;
use redlight_detection::cascade::CascadePlateDetector;
use redlight_detection::ocr::TesseractOcr;
use redlight_detection::pipeline::{FrameUpdate, PipelineOrchestrator};
use redlight_detection::types::Config;
use redlight_detection::video_processor::{self, VideoProcessor};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::Ordering;
use tracing::{error, info, warn};

fn main() -> Result<()> {
    let config = Config::load("config.yaml")?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "redlight_detection={level},redlightd={level}",
            level = config.logging.level
        ))
        .init();

    info!("🚦 Red-Light Violation Detection Starting");
    info!("✓ Configuration loaded");

    let video_processor = VideoProcessor::new(config.video.clone());
    let video_files = video_processor.find_video_files()?;

    if video_files.is_empty() {
        error!("No video files found in {}", config.video.input_dir);
        return Ok(());
    }

    info!("Found {} video file(s) to process", video_files.len());

    let detector = CascadePlateDetector::new(&config.plate)?;
    info!("✓ Plate cascade ready");

    let engine = TesseractOcr::new(&config.ocr.command)?;
    info!("✓ OCR engine ready");

    let mut orchestrator = PipelineOrchestrator::new(config.clone(), detector, engine)?;

    let cancel = orchestrator.cancel_flag();
    ctrlc::set_handler(move || {
        cancel.store(true, Ordering::SeqCst);
    })?;

    std::fs::create_dir_all(&config.video.output_dir)?;

    for (idx, video_path) in video_files.iter().enumerate() {
        if orchestrator.cancel_flag().load(Ordering::SeqCst) {
            warn!("Cancelled, skipping remaining videos");
            break;
        }

        info!(
            "Processing video {}/{}: {}",
            idx + 1,
            video_files.len(),
            video_path.display()
        );

        match process_video(video_path, &mut orchestrator, &video_processor, &config) {
            Ok(plates) => {
                info!("✓ Video processed successfully!");
                info!("  Violations recorded: {}", plates.len());
                for plate in &plates {
                    info!("  ->  {}", plate);
                }
            }
            Err(e) => {
                error!("Failed to process video: {}", e);
            }
        }
    }

    Ok(())
}

fn process_video(
    video_path: &Path,
    orchestrator: &mut PipelineOrchestrator<CascadePlateDetector, TesseractOcr>,
    video_processor: &VideoProcessor,
    config: &Config,
) -> Result<Vec<String>> {
    let reader = video_processor.open_video(video_path)?;
    let mut writer =
        video_processor.create_writer(video_path, reader.width, reader.height, reader.fps)?;

    let video_name = video_path
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    let jsonl_path =
        Path::new(&config.video.output_dir).join(format!("{}_violations.jsonl", video_name));
    let mut results_file = std::fs::File::create(&jsonl_path)?;
    info!("💾 Violations will be written to: {}", jsonl_path.display());

    let plates = orchestrator.process_video_with(reader, |update: FrameUpdate<'_>| {
        // Violations are persisted as they are recorded, so a mid-stream
        // failure still leaves everything seen so far on disk.
        for plate in update.new_violations {
            let line = serde_json::json!({
                "plate": plate,
                "frame": update.frame_index,
                "timestamp_ms": update.frame.timestamp_ms,
                "video": video_name,
            });
            writeln!(results_file, "{}", line)?;
            results_file.flush()?;
        }

        if let Some(ref mut w) = writer {
            let annotated = video_processor::render_overlay(update.frame, update.commands)?;
            use opencv::videoio::VideoWriterTrait;
            w.write(&annotated)?;
        }

        Ok(())
    })?;

    Ok(plates)
}
