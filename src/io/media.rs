// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Score image loading.
//!
//! Decodes scanned score images into RGBA pixels for display and reads
//! their natural size for fit-to-budget scaling.

use crate::util::geometry::Size;
use anyhow::{Context, Result};
use std::path::Path;

/// Image file extensions offered in the open dialog.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif"];

/// A decoded image, RGBA8 row-major.
pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl LoadedImage {
    pub fn natural_size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }
}

/// Decode an image file into RGBA pixels.
pub fn load_image(path: &Path) -> Result<LoadedImage> {
    let decoded = image::open(path)
        .with_context(|| format!("failed to decode image {}", path.display()))?
        .to_rgba8();
    let (width, height) = decoded.dimensions();
    log::debug!("Decoded {} ({}x{})", path.display(), width, height);

    Ok(LoadedImage {
        width,
        height,
        pixels: decoded.into_raw(),
    })
}

/// Read an image's pixel dimensions without decoding the pixels.
pub fn natural_size(path: &Path) -> Result<Size> {
    let (width, height) = image::image_dimensions(path)
        .with_context(|| format!("failed to read dimensions of {}", path.display()))?;
    Ok(Size::new(f64::from(width), f64::from(height)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(width: u32, height: u32) -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]))
            .save(file.path())
            .unwrap();
        file
    }

    #[test]
    fn test_load_image() {
        let file = write_png(16, 12);
        let loaded = load_image(file.path()).unwrap();
        assert_eq!((loaded.width, loaded.height), (16, 12));
        assert_eq!(loaded.pixels.len(), 16 * 12 * 4);
        assert_eq!(&loaded.pixels[..4], &[10, 20, 30, 255]);
        assert_eq!(loaded.natural_size(), Size::new(16.0, 12.0));
    }

    #[test]
    fn test_natural_size() {
        let file = write_png(40, 30);
        assert_eq!(natural_size(file.path()).unwrap(), Size::new(40.0, 30.0));
    }

    #[test]
    fn test_missing_file() {
        assert!(load_image(Path::new("does/not/exist.png")).is_err());
    }
}
