//! Error types used by the crate.

use thiserror::Error;

#[cfg(feature = "image")]
use image::ImageError;

/// Error of acquiring or preparing a symbol image.
///
/// These errors never cross the [`ImageSymbol::load`](crate::ImageSymbol::load) boundary: a failed load
/// is reported as [`ImageState::Error`](crate::ImageState::Error).
#[derive(Debug, Error)]
pub enum SymbolError {
    /// I/O error (network or file)
    #[error("failed to load data")]
    IO,
    /// Image decoding error.
    #[cfg(feature = "image")]
    #[error("image decode error: {0:?}")]
    ImageDecode(#[from] ImageError),
    /// Raw pixel data does not match the declared image dimensions.
    #[error("invalid image data: {0}")]
    InvalidImage(String),
    /// Item not found.
    #[error("item not found")]
    NotFound,
    /// Generic error - details are inside.
    #[error("{0}")]
    Generic(String),
}

#[cfg(not(target_arch = "wasm32"))]
impl From<reqwest::Error> for SymbolError {
    fn from(value: reqwest::Error) -> Self {
        log::debug!("Request failed: {value}");
        Self::IO
    }
}
