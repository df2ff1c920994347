//! Point symbols supply the image a renderer draws at a point feature.
//!
//! [`ImageSymbol`] is the contract between a symbol and the renderer. The image of a symbol may not
//! be available right away (e.g. an icon that is fetched over network), so a renderer checks
//! [`ImageSymbol::image_state`] first, and if the image is not loaded yet, subscribes to changes with
//! [`ImageSymbol::listen_image_change`] and calls [`ImageSymbol::load`]. Once the listener is called,
//! the renderer can draw the symbol using its geometry.
//!
//! Two implementations are provided: [`IconSymbol`] loads an image with an
//! [`ImageProvider`](crate::provider::ImageProvider), [`CircleSymbol`] draws a circle marker.

mod circle;
mod icon;
mod icon_image;

use std::sync::Arc;

pub use circle::{CircleStroke, CircleSymbol, MAX_CIRCLE_LENGTH};
pub use icon::{AnchorUnits, IconOptions, IconOrigin, IconSymbol};
pub use icon_image::{IconImage, IconImageCache};
use maybe_sync::{MaybeSend, MaybeSync};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::decoded_image::DecodedImage;
use crate::image_state::ImageState;
use crate::listener::{ImageChangeListener, ListenerKey};
use crate::size::Size;

/// Image returned by a symbol to the renderer.
///
/// The surface is shared between all consumers of the symbol and is never modified after it was
/// handed out.
pub type ImageSurface = Arc<DecodedImage>;

/// Display properties common to all image symbols.
///
/// The values are not validated, e.g. keeping opacity in `[0, 1]` is up to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolProperties {
    /// Alpha multiplier applied when the image is drawn.
    pub opacity: f32,
    /// If true, the image rotates together with the map view.
    pub rotate_with_view: bool,
    /// Rotation of the image in radians.
    pub rotation: f32,
    /// Uniform scale of the image.
    pub scale: f32,
    /// If true, the renderer rounds the image position to whole device pixels.
    pub snap_to_pixel: bool,
}

impl Default for SymbolProperties {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            rotate_with_view: false,
            rotation: 0.0,
            scale: 1.0,
            snap_to_pixel: true,
        }
    }
}

/// A symbol that is drawn as an image at a point.
///
/// Display properties ([`opacity`](Self::opacity), [`scale`](Self::scale) etc.) do not depend on the
/// load state and can be read and changed at any time.
///
/// Geometry methods never fail, but until [`image_state`](Self::image_state) returns
/// [`ImageState::Loaded`] their values are provisional.
pub trait ImageSymbol: MaybeSend + MaybeSync {
    /// Display properties of the symbol.
    fn properties(&self) -> &SymbolProperties;
    /// Mutable access to the display properties of the symbol.
    fn properties_mut(&mut self) -> &mut SymbolProperties;

    /// Offset in pixels from the top-left corner of the drawn region to the point the image is
    /// attached to.
    fn anchor(&self) -> Vector2<f32>;
    /// Offset in pixels of the drawn region inside the image.
    fn origin(&self) -> Vector2<f32>;
    /// Size in pixels of the drawn region.
    fn size(&self) -> Size<u32>;
    /// Size in pixels of the whole image.
    fn image_size(&self) -> Size<u32>;
    /// Offset in pixels of the drawn region inside the hit detection image.
    fn hit_detection_origin(&self) -> Vector2<f32>;
    /// Size in pixels of the hit detection image.
    fn hit_detection_image_size(&self) -> Size<u32>;

    /// Image to draw on a device with the given pixel ratio. `None` if the image is not
    /// available (yet).
    fn image(&self, pixel_ratio: f32) -> Option<ImageSurface>;
    /// Image used to check whether a pointer hits the symbol. `None` if the image is not
    /// available (yet).
    fn hit_detection_image(&self, pixel_ratio: f32) -> Option<ImageSurface>;

    /// Current load state of the image.
    fn image_state(&self) -> ImageState;
    /// Starts loading the image if it is [`ImageState::Idle`], does nothing otherwise.
    ///
    /// This method never blocks.
    fn load(&self);
    /// Registers a listener that is called when the image becomes `Loaded` or fails to load.
    fn listen_image_change(&self, listener: Box<dyn ImageChangeListener>) -> ListenerKey;
    /// Cancels a listener registration. Unknown or already cancelled keys are ignored.
    fn unlisten_image_change(&self, key: ListenerKey);

    /// Opacity of the image.
    fn opacity(&self) -> f32 {
        self.properties().opacity
    }

    /// Sets opacity of the image.
    fn set_opacity(&mut self, opacity: f32) {
        self.properties_mut().opacity = opacity;
    }

    /// Whether the image rotates with the view.
    fn rotate_with_view(&self) -> bool {
        self.properties().rotate_with_view
    }

    /// Sets whether the image rotates with the view.
    fn set_rotate_with_view(&mut self, rotate_with_view: bool) {
        self.properties_mut().rotate_with_view = rotate_with_view;
    }

    /// Rotation in radians.
    fn rotation(&self) -> f32 {
        self.properties().rotation
    }

    /// Sets rotation in radians.
    fn set_rotation(&mut self, rotation: f32) {
        self.properties_mut().rotation = rotation;
    }

    /// Scale of the image.
    fn scale(&self) -> f32 {
        self.properties().scale
    }

    /// Sets scale of the image.
    fn set_scale(&mut self, scale: f32) {
        self.properties_mut().scale = scale;
    }

    /// Whether the image is snapped to whole pixels.
    fn snap_to_pixel(&self) -> bool {
        self.properties().snap_to_pixel
    }

    /// Sets whether the image is snapped to whole pixels.
    fn set_snap_to_pixel(&mut self, snap_to_pixel: bool) {
        self.properties_mut().snap_to_pixel = snap_to_pixel;
    }
}

/// Replaces pixel ratios a surface cannot be rendered for with `1.0`.
pub(crate) fn sanitize_pixel_ratio(pixel_ratio: f32) -> f32 {
    if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
        pixel_ratio
    } else {
        log::warn!("Invalid pixel ratio {pixel_ratio}, using 1.0 instead");
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_defaults() {
        let properties = SymbolProperties::default();
        assert_eq!(properties.opacity, 1.0);
        assert_eq!(properties.scale, 1.0);
        assert_eq!(properties.rotation, 0.0);
        assert!(!properties.rotate_with_view);
        assert!(properties.snap_to_pixel);
    }

    #[test]
    fn properties_from_partial_json() {
        let properties: SymbolProperties =
            serde_json::from_str(r#"{"opacity": 0.25, "rotate_with_view": true}"#)
                .expect("valid json");
        assert_eq!(properties.opacity, 0.25);
        assert!(properties.rotate_with_view);
        assert_eq!(properties.scale, 1.0);
        assert!(properties.snap_to_pixel);
    }

    #[test]
    fn invalid_pixel_ratio_is_replaced() {
        assert_eq!(sanitize_pixel_ratio(2.0), 2.0);
        assert_eq!(sanitize_pixel_ratio(0.0), 1.0);
        assert_eq!(sanitize_pixel_ratio(-1.5), 1.0);
        assert_eq!(sanitize_pixel_ratio(f32::NAN), 1.0);
        assert_eq!(sanitize_pixel_ratio(f32::INFINITY), 1.0);
    }
}
