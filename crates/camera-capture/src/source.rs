//! Frame sources
//!
//! The capture loop only sees the `FrameSource` trait. A source returning
//! `Ok(None)` has ended (camera unplugged, replay finished).

use std::path::{Path, PathBuf};
use std::time::Instant;

use image::imageops::FilterType;
use tracing::{debug, info};

use crate::{CameraError, VideoFrame};

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "ppm"];

/// A producer of RGB frames
pub trait FrameSource: Send {
    /// Human-readable source name for logs
    fn name(&self) -> &str;

    /// Reported capture size (width, height)
    fn dimensions(&self) -> (u32, u32);

    /// Acquire the next frame. `Ok(None)` means the stream has ended.
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError>;
}

/// Test-pattern source
pub struct SyntheticSource {
    name: String,
    width: u32,
    height: u32,
    sequence: u32,
    limit: Option<u32>,
    started: Instant,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            name: format!("stub://{}x{}", width, height),
            width,
            height,
            sequence: 0,
            limit: None,
            started: Instant::now(),
        }
    }

    /// End the stream after `frames` frames
    pub fn with_limit(mut self, frames: u32) -> Self {
        self.limit = Some(frames);
        self
    }

    fn pattern(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                let r = ((x + self.sequence) % 256) as u8;
                let g = (y % 256) as u8;
                let b = (self.sequence % 256) as u8;
                data.extend_from_slice(&[r, g, b]);
            }
        }
        data
    }
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if self.limit.is_some_and(|limit| self.sequence >= limit) {
            return Ok(None);
        }

        let frame = VideoFrame::new(
            self.pattern(),
            self.width,
            self.height,
            self.started.elapsed().as_nanos() as u64,
            self.sequence,
        );
        self.sequence = self.sequence.wrapping_add(1);
        Ok(Some(frame))
    }
}

/// Replays a directory of still images as a stream, in file-name order.
///
/// Every frame is scaled to the size of the first image so that sinks
/// opened with the reported dimensions stay valid.
pub struct ImageDirSource {
    name: String,
    files: Vec<PathBuf>,
    cursor: usize,
    looping: bool,
    width: u32,
    height: u32,
    sequence: u32,
    started: Instant,
}

impl ImageDirSource {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, CameraError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(CameraError::Open(format!("{} is not a directory", dir.display())));
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && has_image_extension(path))
            .collect();
        files.sort();

        let first = files
            .first()
            .ok_or_else(|| CameraError::Open(format!("no images in {}", dir.display())))?;
        let (width, height) = image::image_dimensions(first)?;

        info!(
            "Image directory source {} opened: {} frames at {}x{}",
            dir.display(),
            files.len(),
            width,
            height
        );

        Ok(Self {
            name: dir.display().to_string(),
            files,
            cursor: 0,
            looping: false,
            width,
            height,
            sequence: 0,
            started: Instant::now(),
        })
    }

    /// Restart from the first image when the directory is exhausted
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }
}

impl FrameSource for ImageDirSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if self.cursor >= self.files.len() {
            if !self.looping {
                return Ok(None);
            }
            self.cursor = 0;
        }

        let path = &self.files[self.cursor];
        self.cursor += 1;
        debug!("Loading frame {}", path.display());

        let mut rgb = image::open(path)?.to_rgb8();
        if rgb.dimensions() != (self.width, self.height) {
            rgb = image::imageops::resize(&rgb, self.width, self.height, FilterType::Triangle);
        }

        let frame = VideoFrame::from_image(
            rgb,
            self.started.elapsed().as_nanos() as u64,
            self.sequence,
        );
        self.sequence = self.sequence.wrapping_add(1);
        Ok(Some(frame))
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_synthetic_limit_ends_stream() {
        let mut source = SyntheticSource::new(4, 4).with_limit(2);
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_synthetic_frames_are_valid_and_sequenced() {
        let mut source = SyntheticSource::new(5, 3);
        let a = source.next_frame().unwrap().unwrap();
        let b = source.next_frame().unwrap().unwrap();
        assert!(a.is_valid());
        assert_eq!(b.sequence, a.sequence + 1);
    }

    #[test]
    fn test_image_dir_replays_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::from_pixel(6, 4, Rgb([10, 0, 0]))
            .save(dir.path().join("b.png"))
            .unwrap();
        RgbImage::from_pixel(6, 4, Rgb([20, 0, 0]))
            .save(dir.path().join("a.png"))
            .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

        let mut source = ImageDirSource::open(dir.path()).unwrap();
        assert_eq!(source.dimensions(), (6, 4));

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.get_pixel(0, 0), Some([20, 0, 0]));
        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(second.get_pixel(0, 0), Some([10, 0, 0]));
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_image_dir_looping_and_rescale() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::new(8, 8).save(dir.path().join("0.png")).unwrap();
        RgbImage::new(4, 4).save(dir.path().join("1.png")).unwrap();

        let mut source = ImageDirSource::open(dir.path()).unwrap().looping(true);
        for _ in 0..5 {
            let frame = source.next_frame().unwrap().unwrap();
            assert_eq!((frame.width, frame.height), (8, 8));
        }
    }

    #[test]
    fn test_empty_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageDirSource::open(dir.path()).is_err());
    }
}
