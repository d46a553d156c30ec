// src/video_processor.rs

use crate::overlay::{DrawCommand, OverlayColor};
use crate::pipeline::FrameSource;
use crate::types::{Frame, VideoConfig};
use anyhow::Result;
use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureTraitConst, VideoWriter},
};
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

pub struct VideoProcessor {
    config: VideoConfig,
}

impl VideoProcessor {
    pub fn new(config: VideoConfig) -> Self {
        Self { config }
    }

    pub fn find_video_files(&self) -> Result<Vec<PathBuf>> {
        let mut videos = Vec::new();

        let video_extensions = vec!["mp4", "avi", "mov", "mkv", "MP4", "AVI", "MOV", "MKV"];

        for entry in WalkDir::new(&self.config.input_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if let Some(ext) = path.extension() {
                if video_extensions.contains(&ext.to_str().unwrap_or("")) {
                    videos.push(path.to_path_buf());
                }
            }
        }

        info!("Found {} video files", videos.len());
        Ok(videos)
    }

    pub fn open_video(&self, path: &Path) -> Result<VideoReader> {
        info!("Opening video: {}", path.display());

        let cap = VideoCapture::from_file(path.to_str().unwrap_or_default(), videoio::CAP_ANY)?;

        if !cap.is_opened()? {
            anyhow::bail!("Failed to open video file");
        }

        let fps = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FPS)?;
        let total_frames = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_COUNT)? as i32;
        let width = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_WIDTH)? as i32;
        let height = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_HEIGHT)? as i32;

        info!(
            "Video properties: {}x{} @ {:.1} FPS, {} frames",
            width, height, fps, total_frames
        );

        Ok(VideoReader {
            cap,
            fps,
            total_frames,
            current_frame: 0,
            width,
            height,
        })
    }

    pub fn create_writer(
        &self,
        input_path: &Path,
        width: i32,
        height: i32,
        fps: f64,
    ) -> Result<Option<VideoWriter>> {
        if !self.config.save_annotated {
            return Ok(None);
        }

        std::fs::create_dir_all(&self.config.output_dir)?;

        let input_name = input_path
            .file_stem()
            .unwrap_or_default()
            .to_str()
            .unwrap_or("video");
        let output_path =
            PathBuf::from(&self.config.output_dir).join(format!("{}_annotated.mp4", input_name));

        info!("Output video: {}", output_path.display());

        let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
        let writer = VideoWriter::new(
            output_path.to_str().unwrap_or_default(),
            fourcc,
            fps,
            core::Size::new(width, height),
            true,
        )?;

        Ok(Some(writer))
    }
}

pub struct VideoReader {
    pub cap: VideoCapture,
    pub fps: f64,
    pub total_frames: i32,
    pub current_frame: i32,
    pub width: i32,
    pub height: i32,
}

impl VideoReader {
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        use opencv::videoio::VideoCaptureTrait;

        let mut mat = Mat::default();

        if !VideoCaptureTrait::read(&mut self.cap, &mut mat)? || mat.empty() {
            return Ok(None);
        }

        self.current_frame += 1;
        let timestamp_ms = (self.current_frame as f64 / self.fps.max(1.0)) * 1000.0;

        let mut rgb_mat = Mat::default();
        imgproc::cvt_color(&mat, &mut rgb_mat, imgproc::COLOR_BGR2RGB, 0)?;

        let data = rgb_mat.data_bytes()?.to_vec();

        Ok(Some(Frame {
            data,
            width: self.width as usize,
            height: self.height as usize,
            timestamp_ms,
        }))
    }

    pub fn progress(&self) -> f32 {
        if self.total_frames == 0 {
            return 0.0;
        }
        (self.current_frame as f32 / self.total_frames as f32) * 100.0
    }
}

impl FrameSource for VideoReader {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.read_frame()
    }

    fn release(&mut self) {
        use opencv::videoio::VideoCaptureTrait;
        let _ = self.cap.release();
    }
}

/// Apply the per-frame draw commands onto a BGR copy of the frame for the
/// annotated output video.
pub fn render_overlay(frame: &Frame, commands: &[DrawCommand]) -> Result<Mat> {
    let mat = Mat::from_slice(&frame.data)?;
    let mat = mat.reshape(3, frame.height as i32)?;

    let mut output = Mat::default();
    imgproc::cvt_color(&mat, &mut output, imgproc::COLOR_RGB2BGR, 0)?;

    for command in commands {
        match command {
            DrawCommand::Line {
                from,
                to,
                color,
                thickness,
            } => {
                imgproc::line(
                    &mut output,
                    core::Point::new(from.0, from.1),
                    core::Point::new(to.0, to.1),
                    scalar(*color),
                    *thickness,
                    imgproc::LINE_AA,
                    0,
                )?;
            }
            DrawCommand::Rect {
                rect,
                color,
                thickness,
            } => {
                imgproc::rectangle(
                    &mut output,
                    core::Rect::new(rect.x, rect.y, rect.width, rect.height),
                    scalar(*color),
                    *thickness,
                    imgproc::LINE_8,
                    0,
                )?;
            }
            DrawCommand::Caption {
                text,
                position,
                color,
            } => {
                imgproc::put_text(
                    &mut output,
                    text,
                    core::Point::new(position.0, position.1),
                    imgproc::FONT_HERSHEY_SIMPLEX,
                    1.0,
                    scalar(*color),
                    2,
                    imgproc::LINE_AA,
                    false,
                )?;
            }
        }
    }

    Ok(output)
}

fn scalar(color: OverlayColor) -> core::Scalar {
    match color {
        OverlayColor::Red => core::Scalar::new(0.0, 0.0, 255.0, 0.0),
        OverlayColor::Yellow => core::Scalar::new(0.0, 255.0, 255.0, 0.0),
        OverlayColor::Green => core::Scalar::new(0.0, 255.0, 0.0, 0.0),
        OverlayColor::White => core::Scalar::new(255.0, 255.0, 255.0, 0.0),
    }
}
