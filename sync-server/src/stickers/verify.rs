//! Label rasterization and readability checking seams
//!
//! The marketplace delivers labels as PDF; turning a PDF page into a
//! printable raster needs an external renderer, which plugs in behind
//! [`LabelRenderer`]. The readability check guards against caching a label
//! whose barcode a scanner cannot read — the full barcode decoder is an
//! external collaborator behind [`StickerVerifier`], with a structural
//! pre-check provided here.

use image::GenericImageView;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Unsupported label format: {0}")]
    Unsupported(&'static str),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Turns a downloaded label file into PNG raster bytes
pub trait LabelRenderer: Send + Sync {
    fn rasterize(&self, input: &[u8]) -> Result<Vec<u8>, RenderError>;
}

/// Renderer for labels that already arrive as raster images; re-encodes the
/// first frame to PNG. PDF input needs an external renderer implementation.
pub struct PngRenderer;

impl LabelRenderer for PngRenderer {
    fn rasterize(&self, input: &[u8]) -> Result<Vec<u8>, RenderError> {
        let format = image::guess_format(input)
            .map_err(|_| RenderError::Unsupported("not a raster image; configure a PDF renderer"))?;

        let img = image::load_from_memory_with_format(input, format)?;

        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)?;
        Ok(bytes)
    }
}

/// Decides whether cached label bytes are printable
pub trait StickerVerifier: Send + Sync {
    fn verify(&self, png: &[u8]) -> bool;
}

/// Structural readability pre-check: the bytes must decode, be big enough
/// to hold a barcode, and contain both dark and light pixels.
pub struct ImageVerifier {
    pub min_side: u32,
}

impl Default for ImageVerifier {
    fn default() -> Self {
        Self { min_side: 16 }
    }
}

impl StickerVerifier for ImageVerifier {
    fn verify(&self, png: &[u8]) -> bool {
        let Ok(img) = image::load_from_memory(png) else {
            return false;
        };

        let (width, height) = img.dimensions();
        if width < self.min_side || height < self.min_side {
            return false;
        }

        let gray = img.to_luma8();
        let mut has_dark = false;
        let mut has_light = false;
        for pixel in gray.pixels() {
            if pixel.0[0] < 96 {
                has_dark = true;
            } else if pixel.0[0] > 160 {
                has_light = true;
            }
            if has_dark && has_light {
                return true;
            }
        }

        false
    }
}
