//! Sources of icon images.

use maybe_sync::{MaybeSend, MaybeSync};

use crate::decoded_image::DecodedImage;
use crate::error::SymbolError;

/// Loads images for [`IconSymbol`](crate::symbol::IconSymbol)s by their source string.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait ImageProvider: MaybeSend + MaybeSync {
    /// Loads and decodes the image identified by `src`.
    async fn load(&self, src: &str) -> Result<DecodedImage, SymbolError>;
}

#[cfg(all(feature = "image", not(target_arch = "wasm32")))]
pub use url::UrlImageProvider;

#[cfg(all(feature = "image", not(target_arch = "wasm32")))]
mod url {
    use super::*;

    /// Loads images with HTTP GET requests, treating the image source as url.
    ///
    /// Any format supported by the `image` crate with the enabled features can be loaded.
    #[derive(Debug, Clone)]
    pub struct UrlImageProvider {
        http_client: reqwest::Client,
    }

    impl UrlImageProvider {
        /// Creates a new provider.
        pub fn new() -> Result<Self, SymbolError> {
            let http_client = reqwest::Client::builder()
                .user_agent(concat!("galileo-symbol/", env!("CARGO_PKG_VERSION")))
                .build()?;

            Ok(Self::with_client(http_client))
        }

        /// Creates a provider that uses the given http client.
        pub fn with_client(http_client: reqwest::Client) -> Self {
            Self { http_client }
        }
    }

    #[async_trait::async_trait]
    impl ImageProvider for UrlImageProvider {
        async fn load(&self, src: &str) -> Result<DecodedImage, SymbolError> {
            log::info!("Loading {src}");
            let response = self.http_client.get(src).send().await?;
            if !response.status().is_success() {
                log::info!("Failed to load {src}: {}", response.status());
                return Err(SymbolError::IO);
            }

            let bytes = response.bytes().await?;
            DecodedImage::decode(&bytes)
        }
    }

    #[cfg(test)]
    mod tests {
        use assert_matches::assert_matches;

        use super::*;

        #[tokio::test]
        async fn invalid_url_is_io_error() {
            let provider = UrlImageProvider::new().expect("client is created");
            assert_matches!(provider.load("not a url").await, Err(SymbolError::IO));
        }
    }
}
