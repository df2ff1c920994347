//! Point symbols for galileo feature layers.
//!
//! A point feature is drawn as an image: an icon loaded over network, or a marker drawn in memory.
//! The [`ImageSymbol`] trait describes such a symbol to the renderer: its display properties, the
//! geometry of the image and, most importantly, the state of the image resource.
//!
//! Loading an image may take time, and the renderer must not wait for it. Instead it works like
//! this:
//!
//! ```no_run
//! use std::sync::Arc;
//! use galileo_symbol::{ImageChangeEvent, ImageState, ImageSymbol};
//! use galileo_symbol::symbol::{IconOptions, IconSymbol};
//! use galileo_symbol::provider::UrlImageProvider;
//!
//! # #[tokio::main] async fn main() {
//! let provider = Arc::new(UrlImageProvider::new().expect("http client"));
//! let symbol = IconSymbol::new(IconOptions::new("https://example.com/pin.png"), provider);
//!
//! if symbol.image_state() != ImageState::Loaded {
//!     symbol.listen_image_change(Box::new(|event: &ImageChangeEvent| {
//!         println!("image is {:?}, redraw", event.state);
//!     }));
//!     symbol.load();
//! }
//! # }
//! ```
//!
//! The listener is called exactly once, when the image is loaded or fails to load. A listener
//! registered after that is never called, but [`ImageSymbol::image_state`] already returns the
//! final state. [`PendingSymbols`](pending::PendingSymbols) implements this pattern for a renderer
//! that draws many features sharing the same symbols.

#![warn(clippy::unwrap_used)]
#![warn(missing_docs)]

pub(crate) mod async_runtime;
mod color;
pub mod decoded_image;
pub mod error;
mod image_state;
mod listener;
mod messenger;
pub mod pending;
pub mod provider;
mod size;
pub mod symbol;

#[cfg(test)]
mod tests;

pub use color::Color;
pub use image_state::{ImageChangeEvent, ImageState};
pub use listener::{redraw_on_change, ImageChangeListener, ImageChangeNotifier, ListenerKey};
pub use messenger::Messenger;
pub use size::Size;
pub use symbol::{ImageSurface, ImageSymbol, SymbolProperties};
