//! In-memory RGBA images that symbols hand over to renderers.

use crate::error::SymbolError;
use crate::size::Size;
use crate::Color;

/// An image that has been loaded into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Raw bytes of the image, in RGBA order.
    bytes: Vec<u8>,
    /// Width and height of the image.
    dimensions: Size<u32>,
}

impl DecodedImage {
    /// Decode an image from a byte slice.
    ///
    /// Attempts to guess the format of the image from the data. Non-RGBA images
    /// will be converted to RGBA.
    #[cfg(feature = "image")]
    pub fn decode(bytes: &[u8]) -> Result<Self, SymbolError> {
        use image::GenericImageView;
        let decoded = image::load_from_memory(bytes)?;
        let (width, height) = decoded.dimensions();
        let bytes = decoded.to_rgba8();

        Ok(Self {
            bytes: bytes.into_vec(),
            dimensions: Size::new(width, height),
        })
    }

    /// Create an image from raw RGBA bytes.
    ///
    /// Returns an error if the length of `bytes` is not `4 * width * height`.
    pub fn from_raw(bytes: impl Into<Vec<u8>>, dimensions: Size<u32>) -> Result<Self, SymbolError> {
        let bytes = bytes.into();
        let expected = 4 * dimensions.width() as usize * dimensions.height() as usize;
        if bytes.len() != expected {
            return Err(SymbolError::InvalidImage(format!(
                "expected {expected} bytes for a {}x{} image, got {}",
                dimensions.width(),
                dimensions.height(),
                bytes.len()
            )));
        }

        Ok(Self { bytes, dimensions })
    }

    /// Creates an image of the given size filled with `color`.
    pub fn filled(dimensions: Size<u32>, color: Color) -> Self {
        let pixels = dimensions.width() as usize * dimensions.height() as usize;
        Self {
            bytes: color.to_u8_array().repeat(pixels),
            dimensions,
        }
    }

    /// Width of the image in pixels.
    pub fn width(&self) -> u32 {
        self.dimensions.width()
    }

    /// Height of the image in pixels.
    pub fn height(&self) -> u32 {
        self.dimensions.height()
    }

    /// Size of the image in pixels.
    pub fn size(&self) -> Size<u32> {
        self.dimensions
    }

    /// RGBA bytes of the image, row by row.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the color of the pixel, or `None` if the coordinates are outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        let offset = self.offset(x, y)?;
        let &[r, g, b, a] = &self.bytes[offset..offset + 4] else {
            return None;
        };
        Some(Color::rgba(r, g, b, a))
    }

    pub(crate) fn set_pixel(&mut self, x: u32, y: u32, color: Color) {
        if let Some(offset) = self.offset(x, y) {
            self.bytes[offset..offset + 4].copy_from_slice(&color.to_u8_array());
        }
    }

    /// Returns an image of the same size that is opaque black wherever this image is not fully
    /// transparent.
    pub fn opacity_mask(&self) -> Self {
        let bytes = self
            .bytes
            .chunks_exact(4)
            .flat_map(|pixel| {
                if pixel[3] == 0 {
                    Color::TRANSPARENT.to_u8_array()
                } else {
                    Color::BLACK.to_u8_array()
                }
            })
            .collect();

        Self {
            bytes,
            dimensions: self.dimensions,
        }
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width() || y >= self.height() {
            return None;
        }

        Some((y as usize * self.width() as usize + x as usize) * 4)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn from_raw_checks_length() {
        assert_matches!(
            DecodedImage::from_raw(vec![0; 15], Size::new(2, 2)),
            Err(SymbolError::InvalidImage(_))
        );

        let image = DecodedImage::from_raw(vec![0; 16], Size::new(2, 2)).expect("valid image");
        assert_eq!(image.width(), 2);
        assert_eq!(image.height(), 2);
    }

    #[test]
    fn pixel_access() {
        let mut image = DecodedImage::filled(Size::new(3, 2), Color::WHITE);
        image.set_pixel(2, 1, Color::RED);

        assert_eq!(image.pixel(0, 0), Some(Color::WHITE));
        assert_eq!(image.pixel(2, 1), Some(Color::RED));
        assert_eq!(image.pixel(3, 0), None);
        assert_eq!(image.pixel(0, 2), None);
    }

    #[test]
    fn opacity_mask_is_black_where_opaque() {
        let mut image = DecodedImage::filled(Size::new(2, 1), Color::TRANSPARENT);
        image.set_pixel(1, 0, Color::RED.with_alpha(10));

        let mask = image.opacity_mask();
        assert_eq!(mask.pixel(0, 0), Some(Color::TRANSPARENT));
        assert_eq!(mask.pixel(1, 0), Some(Color::BLACK));
    }
}
