//! The seams between the walker and the outside world: opening and decoding videos and
//! writing images.

use std::{
    fs,
    io::{BufWriter, Write},
    path::Path,
};

use color_eyre::eyre::{self, Context};
use image::{ImageOutputFormat, RgbImage};

use crate::frame_extractor::{ContextLogger, FrameExtractor};

pub trait VideoBackend: Sync {
    type Video: VideoStream;

    fn open(&self, path: &Path) -> eyre::Result<Self::Video>;
}

/// An opened video. Dropping it releases it.
pub trait VideoStream {
    /// Frames per second, zero or less if it couldn't be determined.
    fn frame_rate(&self) -> f64;

    /// Total number of frames, zero or less if it couldn't be determined.
    fn frame_count(&self) -> i64;

    /// Decodes the frame at the zero-based `index`. Cheapest when called with
    /// increasing indices.
    fn seek_and_decode(&mut self, index: u64) -> eyre::Result<RgbImage>;
}

pub trait ImageWriter: Sync {
    fn write(&self, image: &RgbImage, path: &Path) -> eyre::Result<()>;
}

/// Videos decoded with ffmpeg.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegBackend;

impl VideoBackend for FfmpegBackend {
    type Video = FrameExtractor<ContextLogger>;

    fn open(&self, path: &Path) -> eyre::Result<Self::Video> {
        FrameExtractor::new_with_logger(path, ContextLogger::new(path))
    }
}

impl<L: crate::frame_extractor::Logger> VideoStream for FrameExtractor<L> {
    fn frame_rate(&self) -> f64 {
        FrameExtractor::frame_rate(self)
    }

    fn frame_count(&self) -> i64 {
        FrameExtractor::frame_count(self)
    }

    fn seek_and_decode(&mut self, index: u64) -> eyre::Result<RgbImage> {
        self.frame_at(index)
    }
}

pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Writes images as JPEG files, replacing files that already exist.
#[derive(Debug, Clone, Copy)]
pub struct JpegWriter {
    quality: u8,
}

impl JpegWriter {
    /// `quality` is clamped to 1..=100.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }
}

impl Default for JpegWriter {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl ImageWriter for JpegWriter {
    fn write(&self, image: &RgbImage, path: &Path) -> eyre::Result<()> {
        let file = fs::File::create(path).wrap_err("could not create file")?;
        let mut buf = BufWriter::new(file);
        image
            .write_to(&mut buf, ImageOutputFormat::Jpeg(self.quality))
            .wrap_err("image failed to write")?;
        buf.flush().wrap_err("failed to flush")?;
        Ok(())
    }
}
