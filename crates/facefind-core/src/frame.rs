//! Frame type: a decoded image reduced to 8-bit grayscale for detection.

use image::{DynamicImage, ImageReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("cannot read image file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("image has zero size")]
    Empty,
}

/// A decoded grayscale image.
#[derive(Clone)]
pub struct Frame {
    /// Grayscale pixel data (width * height bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// File the frame was decoded from; `None` for in-memory images.
    pub path: Option<PathBuf>,
}

impl Frame {
    /// Decode an image file.
    ///
    /// The format is sniffed from the file contents, so a text file with a
    /// `.jpg` extension is a decode error rather than a garbage frame.
    pub fn open(path: &Path) -> Result<Self, FrameError> {
        let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        let mut frame = Self::from_image(&image)?;
        frame.path = Some(path.to_path_buf());
        Ok(frame)
    }

    pub fn from_image(image: &DynamicImage) -> Result<Self, FrameError> {
        let gray = image.to_luma8();
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Err(FrameError::Empty);
        }
        Ok(Self {
            data: gray.into_raw(),
            width,
            height,
            path: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use tempfile::tempdir;

    #[test]
    fn test_open_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gray.png");
        GrayImage::from_pixel(8, 4, Luma([200])).save(&path).unwrap();

        let frame = Frame::open(&path).unwrap();
        assert_eq!((frame.width, frame.height), (8, 4));
        assert_eq!(frame.data.len(), 32);
        assert!(frame.data.iter().all(|&p| p == 200));
        assert_eq!(frame.path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_open_sniffs_content_not_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("actually_png.jpg");
        let png = dir.path().join("src.png");
        GrayImage::from_pixel(2, 2, Luma([10])).save(&png).unwrap();
        std::fs::copy(&png, &path).unwrap();

        let frame = Frame::open(&path).unwrap();
        assert_eq!((frame.width, frame.height), (2, 2));
    }

    #[test]
    fn test_open_text_file_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.jpg");
        std::fs::write(&path, "definitely not a jpeg").unwrap();

        assert!(Frame::open(&path).is_err());
    }

    #[test]
    fn test_open_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = Frame::open(&dir.path().join("missing.png")).err().unwrap();
        assert!(matches!(err, FrameError::Io(_)));
    }

    #[test]
    fn test_from_rgb_converts_to_luma() {
        let rgb = RgbImage::from_pixel(3, 3, Rgb([255, 255, 255]));
        let frame = Frame::from_image(&DynamicImage::ImageRgb8(rgb)).unwrap();
        assert_eq!(frame.data.len(), 9);
        assert!(frame.data.iter().all(|&p| p == 255));
        assert!(frame.path.is_none());
    }
}
