//! Clip sinks
//!
//! Clips are Motion-JPEG elementary streams: one baseline JPEG per frame,
//! concatenated. ffplay and VLC play them directly.

use camera_capture::VideoFrame;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::RecorderError;

/// An open clip file
pub trait VideoSink: Send {
    fn path(&self) -> &Path;

    fn write(&mut self, frame: &VideoFrame) -> Result<(), RecorderError>;

    /// Flush and close. The file stays on disk.
    fn finish(self: Box<Self>) -> Result<(), RecorderError>;
}

/// Creates sinks; the recorder only ever opens clips through this
pub trait SinkFactory: Send {
    fn open(
        &self,
        path: &Path,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<Box<dyn VideoSink>, RecorderError>;
}

/// Motion-JPEG clip writer
pub struct MjpegSink {
    path: PathBuf,
    writer: BufWriter<File>,
    width: u32,
    height: u32,
    quality: u8,
    frames: u64,
}

impl MjpegSink {
    pub fn create(path: &Path, width: u32, height: u32, quality: u8) -> Result<Self, RecorderError> {
        let file = File::create(path).map_err(|e| RecorderError::SinkOpen {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            width,
            height,
            quality: quality.clamp(1, 100),
            frames: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames
    }
}

impl VideoSink for MjpegSink {
    fn path(&self) -> &Path {
        &self.path
    }

    fn write(&mut self, frame: &VideoFrame) -> Result<(), RecorderError> {
        if frame.width != self.width || frame.height != self.height {
            return Err(RecorderError::SinkWrite(format!(
                "frame is {}x{}, clip is {}x{}",
                frame.width, frame.height, self.width, self.height
            )));
        }
        if !frame.is_valid() {
            return Err(RecorderError::SinkWrite("frame buffer size mismatch".into()));
        }

        let mut encoder = JpegEncoder::new_with_quality(&mut self.writer, self.quality);
        encoder.encode(&frame.data, frame.width, frame.height, ExtendedColorType::Rgb8)?;
        self.frames += 1;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<(), RecorderError> {
        self.writer.flush()?;
        debug!("Closed {} ({} frames)", self.path.display(), self.frames);
        Ok(())
    }
}

/// Opens `MjpegSink`s at a fixed quality
#[derive(Debug, Clone)]
pub struct MjpegSinkFactory {
    quality: u8,
}

impl MjpegSinkFactory {
    pub fn new(quality: u8) -> Self {
        Self { quality }
    }
}

impl SinkFactory for MjpegSinkFactory {
    fn open(
        &self,
        path: &Path,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<Box<dyn VideoSink>, RecorderError> {
        debug!("Opening clip {} ({}x{} @ {} fps)", path.display(), width, height, fps);
        Ok(Box::new(MjpegSink::create(path, width, height, self.quality)?))
    }
}
