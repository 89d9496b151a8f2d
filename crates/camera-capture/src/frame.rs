//! Video frame types and processing

use image::RgbImage;

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_ns: u64, sequence: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }

    /// Create a black frame
    pub fn blank(width: u32, height: u32, sequence: u32) -> Self {
        Self::new(vec![0; (width * height * 3) as usize], width, height, 0, sequence)
    }

    /// Whether the buffer length matches the declared dimensions
    pub fn is_valid(&self) -> bool {
        self.data.len() == (self.width as usize) * (self.height as usize) * 3
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    /// Borrow the pixels as an `image` buffer, run `f` on it and put the
    /// pixels back. Used by drawing code that works on `RgbImage`.
    pub fn with_image<R>(&mut self, f: impl FnOnce(&mut RgbImage) -> R) -> Option<R> {
        if !self.is_valid() {
            return None;
        }
        let data = std::mem::take(&mut self.data);
        let mut img = RgbImage::from_raw(self.width, self.height, data)?;
        let out = f(&mut img);
        self.data = img.into_raw();
        Some(out)
    }

    /// Copy into an owned `RgbImage` (for encoding)
    pub fn to_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }

    /// Build a frame from a decoded image
    pub fn from_image(img: RgbImage, timestamp_ns: u64, sequence: u32) -> Self {
        let (width, height) = img.dimensions();
        Self::new(img.into_raw(), width, height, timestamp_ns, sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_pixel_bounds() {
        let mut frame = VideoFrame::blank(4, 2, 0);
        frame.data[(1 * 4 + 3) * 3] = 200;
        assert_eq!(frame.get_pixel(3, 1), Some([200, 0, 0]));
        assert_eq!(frame.get_pixel(4, 0), None);
    }

    #[test]
    fn test_with_image_round_trips_pixels() {
        let mut frame = VideoFrame::blank(3, 3, 0);
        frame.with_image(|img| img.put_pixel(1, 1, image::Rgb([1, 2, 3])));
        assert_eq!(frame.get_pixel(1, 1), Some([1, 2, 3]));
        assert!(frame.is_valid());
    }

    #[test]
    fn test_with_image_rejects_short_buffer() {
        let mut frame = VideoFrame::new(vec![0; 5], 3, 3, 0, 0);
        assert!(frame.with_image(|_| ()).is_none());
    }
}
