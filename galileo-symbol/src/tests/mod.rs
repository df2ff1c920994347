use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::decoded_image::DecodedImage;
use crate::error::SymbolError;
use crate::image_state::{ImageChangeEvent, ImageState};
use crate::listener::ImageChangeListener;
use crate::provider::ImageProvider;
use crate::size::Size;
use crate::Color;

/// 2x2 image with opaque top-left pixel and transparent bottom-right one.
pub fn test_image() -> DecodedImage {
    let mut image = DecodedImage::filled(Size::new(2, 2), Color::RED);
    image.set_pixel(1, 1, Color::TRANSPARENT);
    image
}

/// Provider that holds every request until [`release`](Self::release) is called.
pub struct GatedImageProvider {
    image: Option<DecodedImage>,
    gate: Notify,
    load_count: AtomicUsize,
}

impl GatedImageProvider {
    pub fn succeeding(image: DecodedImage) -> Self {
        Self {
            image: Some(image),
            gate: Notify::new(),
            load_count: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            image: None,
            gate: Notify::new(),
            load_count: AtomicUsize::new(0),
        }
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ImageProvider for GatedImageProvider {
    async fn load(&self, _src: &str) -> Result<DecodedImage, SymbolError> {
        self.load_count.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        self.image.clone().ok_or(SymbolError::NotFound)
    }
}

/// Counts notifications of the listeners it creates.
#[derive(Default, Clone)]
pub struct ListenerCounter {
    inner: Arc<CounterState>,
}

#[derive(Default)]
struct CounterState {
    count: AtomicUsize,
    last_state: Mutex<Option<ImageState>>,
    notified: Notify,
}

impl ListenerCounter {
    pub fn listener(&self) -> Box<dyn ImageChangeListener> {
        let inner = self.inner.clone();
        Box::new(move |event: &ImageChangeEvent| {
            inner.count.fetch_add(1, Ordering::SeqCst);
            *inner.last_state.lock() = Some(event.state);
            inner.notified.notify_one();
        })
    }

    pub fn count(&self) -> usize {
        self.inner.count.load(Ordering::SeqCst)
    }

    pub fn last_state(&self) -> Option<ImageState> {
        *self.inner.last_state.lock()
    }

    /// Waits until one of the listeners is called.
    pub async fn wait(&self) {
        tokio::time::timeout(Duration::from_secs(5), self.inner.notified.notified())
            .await
            .expect("listener was not notified");
    }
}
