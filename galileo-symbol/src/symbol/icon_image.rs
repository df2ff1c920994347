use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use quick_cache::sync::Cache;

use crate::decoded_image::DecodedImage;
use crate::error::SymbolError;
use crate::image_state::ImageState;
use crate::listener::{ImageChangeListener, ImageChangeNotifier, ListenerKey};
use crate::provider::ImageProvider;
use crate::size::Size;
use crate::symbol::ImageSurface;

/// Image of an icon, shared by all [`IconSymbol`](super::IconSymbol)s with the same source.
///
/// The image is loaded at most once. Surfaces are stored before the state changes to `Loaded`, so
/// a listener notified about the change always sees them.
pub struct IconImage {
    src: String,
    provider: Option<Arc<dyn ImageProvider>>,
    notifier: ImageChangeNotifier,
    surfaces: Mutex<Option<IconSurfaces>>,
    error: Mutex<Option<String>>,
}

#[derive(Clone)]
struct IconSurfaces {
    image: ImageSurface,
    hit_detection_image: ImageSurface,
}

impl std::fmt::Debug for IconImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IconImage")
            .field("src", &self.src)
            .field("state", &self.state())
            .finish()
    }
}

impl IconImage {
    /// Creates an image that will be loaded from `provider` when requested.
    pub fn new(src: impl Into<String>, provider: Arc<dyn ImageProvider>) -> Self {
        Self {
            src: src.into(),
            provider: Some(provider),
            notifier: ImageChangeNotifier::new(ImageState::Idle),
            surfaces: Mutex::new(None),
            error: Mutex::new(None),
        }
    }

    /// Creates an already loaded image.
    pub fn from_decoded(src: impl Into<String>, image: DecodedImage) -> Self {
        Self {
            src: src.into(),
            provider: None,
            notifier: ImageChangeNotifier::new(ImageState::Loaded),
            surfaces: Mutex::new(Some(IconSurfaces::new(image))),
            error: Mutex::new(None),
        }
    }

    /// Source the image is loaded from.
    pub fn src(&self) -> &str {
        &self.src
    }

    /// Load state.
    pub fn state(&self) -> ImageState {
        self.notifier.state()
    }

    /// Loaded image.
    pub fn image(&self) -> Option<ImageSurface> {
        self.surfaces.lock().as_ref().map(|s| s.image.clone())
    }

    /// Opaque mask of the loaded image.
    pub fn hit_detection_image(&self) -> Option<ImageSurface> {
        self.surfaces
            .lock()
            .as_ref()
            .map(|s| s.hit_detection_image.clone())
    }

    /// Size of the loaded image. Zero until the image is loaded.
    pub fn size(&self) -> Size<u32> {
        self.surfaces
            .lock()
            .as_ref()
            .map(|s| s.image.size())
            .unwrap_or_default()
    }

    /// Description of the load failure, if the image is in `Error` state.
    pub fn error(&self) -> Option<String> {
        self.error.lock().clone()
    }

    /// Starts loading the image in the background if it is `Idle`.
    pub fn load(self: &Arc<Self>) {
        if !self.notifier.begin_loading() {
            log::trace!("Image {} is already {:?}", self.src, self.state());
            return;
        }

        let Some(provider) = self.provider.clone() else {
            self.complete(Err(SymbolError::NotFound));
            return;
        };

        log::debug!("Loading icon image {}", self.src);
        let image = self.clone();
        let spawned = crate::async_runtime::spawn(async move {
            let result = provider.load(&image.src).await;
            image.complete(result);
        });

        if let Err(err) = spawned {
            self.complete(Err(err));
        }
    }

    /// Registers a change listener.
    pub fn listen(&self, listener: Box<dyn ImageChangeListener>) -> ListenerKey {
        self.notifier.listen(listener)
    }

    /// Cancels a change listener.
    pub fn unlisten(&self, key: ListenerKey) -> bool {
        self.notifier.unlisten(key)
    }

    fn complete(&self, result: Result<DecodedImage, SymbolError>) {
        match result {
            Ok(decoded) => {
                log::debug!(
                    "Icon image {} loaded ({}x{})",
                    self.src,
                    decoded.width(),
                    decoded.height()
                );
                *self.surfaces.lock() = Some(IconSurfaces::new(decoded));
                self.notifier.transition(ImageState::Loaded);
            }
            Err(err) => {
                log::warn!("Failed to load icon image {}: {err}", self.src);
                *self.error.lock() = Some(err.to_string());
                self.notifier.transition(ImageState::Error);
            }
        }
    }
}

impl IconSurfaces {
    fn new(image: DecodedImage) -> Self {
        let hit_detection_image = Arc::new(image.opacity_mask());
        Self {
            image: Arc::new(image),
            hit_detection_image,
        }
    }
}

/// Cache of icon images by their source.
///
/// Icon symbols created with the same source and cache share one [`IconImage`], so the image is
/// loaded only once for all of them.
pub struct IconImageCache {
    images: Cache<String, Arc<IconImage>>,
    insert_lock: Mutex<()>,
}

impl std::fmt::Debug for IconImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IconImageCache")
            .field("len", &self.images.len())
            .finish()
    }
}

static SHARED_CACHE: LazyLock<IconImageCache> =
    LazyLock::new(|| IconImageCache::new(IconImageCache::DEFAULT_CAPACITY));

impl IconImageCache {
    /// Capacity of the shared cache.
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// Creates a new cache holding up to `capacity` images.
    pub fn new(capacity: usize) -> Self {
        Self {
            images: Cache::new(capacity),
            insert_lock: Mutex::new(()),
        }
    }

    /// The process-wide cache used by [`IconSymbol::new`](super::IconSymbol::new).
    pub fn shared() -> &'static IconImageCache {
        &SHARED_CACHE
    }

    /// Returns the image for `src`, creating it with `provider` if it is not cached.
    ///
    /// If the image is already in the cache, it keeps the provider it was created with.
    pub fn get_or_create(&self, src: &str, provider: Arc<dyn ImageProvider>) -> Arc<IconImage> {
        if let Some(image) = self.images.get(src) {
            return image;
        }

        let _guard = self.insert_lock.lock();
        if let Some(image) = self.images.get(src) {
            return image;
        }

        let image = Arc::new(IconImage::new(src, provider));
        self.images.insert(src.to_owned(), image.clone());
        image
    }

    /// Removes the image for `src` from the cache. Returns false if it was not cached.
    ///
    /// Symbols created for `src` after this call get a new image in `Idle` state, so this is the
    /// way to retry an image that failed to load. Existing symbols keep the old image.
    pub fn remove(&self, src: &str) -> bool {
        let _guard = self.insert_lock.lock();
        self.images.remove(src).is_some()
    }

    /// Returns the cached image for `src`.
    pub fn get(&self, src: &str) -> Option<Arc<IconImage>> {
        self.images.get(src)
    }

    /// Number of cached images.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.images.len() == 0
    }
}
