//! Image loading for texture data
//!
//! Any format the `image` crate was built with is decoded to tightly packed
//! RGBA8, the layout the texture upload expects.

use crate::assets::AssetError;
use std::path::Path;

/// Bytes per RGBA8 pixel
pub const RGBA_CHANNELS: u8 = 4;

/// Decoded image ready for GPU upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Raw RGBA pixel data, row major
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Number of color channels, always 4
    pub channels: u8,
}

impl ImageData {
    /// Load an image from a file path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AssetError::NotFound(path.display().to_string()));
        }

        log::debug!("Loading image from: {:?}", path);

        let img = image::open(path)
            .map_err(|e| AssetError::LoadFailed(format!("{}: {}", path.display(), e)))?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        log::info!("Loaded image {}x{} from {:?}", width, height, path);

        Self::from_rgba(rgba.into_raw(), width, height)
    }

    /// Wrap already decoded RGBA8 pixels
    pub fn from_rgba(data: Vec<u8>, width: u32, height: u32) -> Result<Self, AssetError> {
        let image = Self {
            data,
            width,
            height,
            channels: RGBA_CHANNELS,
        };
        image.validate()?;
        Ok(image)
    }

    /// Check that dimensions are non-zero and match the pixel buffer
    pub fn validate(&self) -> Result<(), AssetError> {
        if self.width == 0 || self.height == 0 {
            return Err(AssetError::InvalidData(format!(
                "Image has zero extent {}x{}",
                self.width, self.height
            )));
        }

        let expected = self.width as usize * self.height as usize * usize::from(self.channels);
        if self.data.len() != expected {
            return Err(AssetError::InvalidData(format!(
                "Expected {} bytes for {}x{} RGBA, found {}",
                expected,
                self.width,
                self.height,
                self.data.len()
            )));
        }
        Ok(())
    }

    /// Get the size of the image data in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loads_png_as_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checker.png");

        let img = image::RgbImage::from_fn(4, 2, |x, _| {
            if x % 2 == 0 { image::Rgb([255, 0, 0]) } else { image::Rgb([0, 0, 255]) }
        });
        img.save(&path).unwrap();

        let loaded = ImageData::from_file(&path).unwrap();
        assert_eq!((loaded.width, loaded.height), (4, 2));
        assert_eq!(loaded.channels, 4);
        assert_eq!(loaded.size_bytes(), 4 * 2 * 4);
        assert_eq!(&loaded.data[0..4], &[255, 0, 0, 255]);
        assert_eq!(&loaded.data[4..8], &[0, 0, 255, 255]);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ImageData::from_file(dir.path().join("nope.png"));
        assert!(matches!(result, Err(AssetError::NotFound(_))));
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();
        assert!(matches!(ImageData::from_file(&path), Err(AssetError::LoadFailed(_))));
    }

    #[test]
    fn test_from_rgba_checks_length() {
        assert!(ImageData::from_rgba(vec![0; 16], 2, 2).is_ok());
        assert!(matches!(
            ImageData::from_rgba(vec![0; 15], 2, 2),
            Err(AssetError::InvalidData(_))
        ));
        assert!(ImageData::from_rgba(Vec::new(), 0, 0).is_err());
    }
}
