use std::sync::Arc;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use super::{IconImage, IconImageCache, ImageSurface, ImageSymbol, SymbolProperties};
use crate::decoded_image::DecodedImage;
use crate::image_state::ImageState;
use crate::listener::{ImageChangeListener, ListenerKey};
use crate::provider::ImageProvider;
use crate::size::Size;

/// Corner of an image that anchor and offset values are measured from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IconOrigin {
    /// Bottom-left corner.
    BottomLeft,
    /// Bottom-right corner.
    BottomRight,
    /// Top-left corner.
    #[default]
    TopLeft,
    /// Top-right corner.
    TopRight,
}

impl IconOrigin {
    fn is_right(self) -> bool {
        matches!(self, Self::BottomRight | Self::TopRight)
    }

    fn is_bottom(self) -> bool {
        matches!(self, Self::BottomLeft | Self::BottomRight)
    }
}

/// Units of an anchor component.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorUnits {
    /// Portion of the icon size, e.g. `0.5` is the middle of the icon.
    #[default]
    Fraction,
    /// Pixels.
    Pixels,
}

/// Parameters of an [`IconSymbol`].
///
/// All fields have defaults, so the options can be deserialized from partial definitions:
///
/// ```json
/// { "src": "https://example.com/pin.png", "anchor": [0.5, 1.0], "scale": 2.0 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IconOptions {
    /// Source of the image, passed to the [`ImageProvider`].
    pub src: String,
    /// Point of the icon that is placed at the feature position.
    pub anchor: [f32; 2],
    /// Corner the anchor is measured from.
    pub anchor_origin: IconOrigin,
    /// Units of the horizontal anchor component.
    pub anchor_x_units: AnchorUnits,
    /// Units of the vertical anchor component.
    pub anchor_y_units: AnchorUnits,
    /// Offset in pixels of the icon inside the image. Together with `size` it selects a region of
    /// a sprite image.
    pub offset: [f32; 2],
    /// Corner the offset is measured from.
    pub offset_origin: IconOrigin,
    /// Size of the icon region in pixels. The whole image is used if not set.
    pub size: Option<[u32; 2]>,
    /// Display properties.
    #[serde(flatten)]
    pub properties: SymbolProperties,
}

impl Default for IconOptions {
    fn default() -> Self {
        Self {
            src: String::new(),
            anchor: [0.5, 0.5],
            anchor_origin: IconOrigin::TopLeft,
            anchor_x_units: AnchorUnits::Fraction,
            anchor_y_units: AnchorUnits::Fraction,
            offset: [0.0, 0.0],
            offset_origin: IconOrigin::TopLeft,
            size: None,
            properties: SymbolProperties::default(),
        }
    }
}

impl IconOptions {
    /// Creates options with default values for the given image source.
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            ..Default::default()
        }
    }
}

/// Symbol that draws an image (or a region of it) loaded by an [`ImageProvider`].
///
/// Icons with the same source share the image through an [`IconImageCache`], so the image is
/// requested only once for all of them. Clones of a symbol share the image as well, but have their
/// own display properties.
#[derive(Debug, Clone)]
pub struct IconSymbol {
    image: Arc<IconImage>,
    options: IconOptions,
}

impl IconSymbol {
    /// Creates a new icon. The image is stored in the [shared cache](IconImageCache::shared).
    pub fn new(options: IconOptions, provider: Arc<dyn ImageProvider>) -> Self {
        Self::with_cache(options, provider, IconImageCache::shared())
    }

    /// Creates a new icon with its image stored in the given cache.
    pub fn with_cache(
        options: IconOptions,
        provider: Arc<dyn ImageProvider>,
        cache: &IconImageCache,
    ) -> Self {
        let image = cache.get_or_create(&options.src, provider);
        Self { image, options }
    }

    /// Creates an icon from an image that is already in memory. The icon is loaded right away.
    pub fn from_image(options: IconOptions, image: DecodedImage) -> Self {
        let image = Arc::new(IconImage::from_decoded(options.src.clone(), image));
        Self { image, options }
    }

    /// Options of the icon.
    pub fn options(&self) -> &IconOptions {
        &self.options
    }

    /// Shared image of the icon.
    pub fn icon_image(&self) -> &Arc<IconImage> {
        &self.image
    }

    /// Description of why the image failed to load, if it did.
    pub fn load_error(&self) -> Option<String> {
        self.image.error()
    }
}

impl ImageSymbol for IconSymbol {
    fn properties(&self) -> &SymbolProperties {
        &self.options.properties
    }

    fn properties_mut(&mut self) -> &mut SymbolProperties {
        &mut self.options.properties
    }

    fn anchor(&self) -> Vector2<f32> {
        let size = self.size().cast::<f32>();
        let [mut x, mut y] = self.options.anchor;

        if self.options.anchor_x_units == AnchorUnits::Fraction {
            x *= size.width();
        }
        if self.options.anchor_y_units == AnchorUnits::Fraction {
            y *= size.height();
        }

        if self.options.anchor_origin.is_right() {
            x = size.width() - x;
        }
        if self.options.anchor_origin.is_bottom() {
            y = size.height() - y;
        }

        Vector2::new(x, y)
    }

    fn origin(&self) -> Vector2<f32> {
        let [mut x, mut y] = self.options.offset;
        let origin = self.options.offset_origin;
        if origin != IconOrigin::TopLeft {
            let size = self.size().cast::<f32>();
            let image_size = self.image.size().cast::<f32>();

            if origin.is_right() {
                x = image_size.width() - size.width() - x;
            }
            if origin.is_bottom() {
                y = image_size.height() - size.height() - y;
            }
        }

        Vector2::new(x, y)
    }

    fn size(&self) -> Size<u32> {
        match self.options.size {
            Some(size) => size.into(),
            None => self.image.size(),
        }
    }

    fn image_size(&self) -> Size<u32> {
        self.image.size()
    }

    fn hit_detection_origin(&self) -> Vector2<f32> {
        self.origin()
    }

    fn hit_detection_image_size(&self) -> Size<u32> {
        self.image.size()
    }

    fn image(&self, _pixel_ratio: f32) -> Option<ImageSurface> {
        self.image.image()
    }

    fn hit_detection_image(&self, _pixel_ratio: f32) -> Option<ImageSurface> {
        self.image.hit_detection_image()
    }

    fn image_state(&self) -> ImageState {
        self.image.state()
    }

    fn load(&self) {
        self.image.load();
    }

    fn listen_image_change(&self, listener: Box<dyn ImageChangeListener>) -> ListenerKey {
        self.image.listen(listener)
    }

    fn unlisten_image_change(&self, key: ListenerKey) {
        self.image.unlisten(key);
    }
}
