use std::collections::HashMap;
use std::sync::Arc;

use nalgebra::Vector2;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{sanitize_pixel_ratio, ImageSurface, ImageSymbol, SymbolProperties};
use crate::decoded_image::DecodedImage;
use crate::image_state::ImageState;
use crate::listener::{ImageChangeListener, ImageChangeNotifier, ListenerKey};
use crate::size::Size;
use crate::Color;

/// Largest radius and stroke width in pixels. Larger values are clamped to it.
pub const MAX_CIRCLE_LENGTH: f32 = 256.0;

/// Largest pixel ratio a circle is rendered with.
const MAX_PIXEL_RATIO: f32 = 4.0;

/// Number of pixel ratios with rendered images kept at once.
const MAX_RENDERED_RATIOS: usize = 8;

/// Outline of a [`CircleSymbol`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleStroke {
    /// Color of the outline.
    pub color: Color,
    /// Width of the outline in pixels.
    pub width: f32,
}

/// Circle marker drawn in memory.
///
/// The image does not need to be loaded, so the symbol is always in [`ImageState::Loaded`] state
/// and its listeners are never called. One image is rendered for every pixel ratio it is requested
/// with. Ratios are rounded to hundredths and capped at 4.
pub struct CircleSymbol {
    radius: f32,
    fill: Option<Color>,
    stroke: Option<CircleStroke>,
    properties: SymbolProperties,
    notifier: ImageChangeNotifier,
    // Keyed by the pixel ratio in hundredths.
    rendered: Mutex<HashMap<u32, CircleSurfaces>>,
}

#[derive(Clone)]
struct CircleSurfaces {
    image: ImageSurface,
    hit_detection_image: ImageSurface,
}

impl std::fmt::Debug for CircleSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircleSymbol")
            .field("radius", &self.radius)
            .field("fill", &self.fill)
            .field("stroke", &self.stroke)
            .field("properties", &self.properties)
            .finish()
    }
}

impl CircleSymbol {
    /// Creates a circle with the given radius in pixels.
    ///
    /// Negative and NaN radius is treated as zero, radius larger than [`MAX_CIRCLE_LENGTH`] is
    /// clamped to it.
    pub fn new(radius: f32, fill: Option<Color>) -> Self {
        Self {
            radius: clamp_length(radius),
            fill,
            stroke: None,
            properties: SymbolProperties::default(),
            notifier: ImageChangeNotifier::new(ImageState::Loaded),
            rendered: Mutex::new(HashMap::new()),
        }
    }

    /// Sets the outline of the circle. The width is clamped the same way as the radius.
    pub fn with_stroke(mut self, stroke: CircleStroke) -> Self {
        self.stroke = Some(CircleStroke {
            width: clamp_length(stroke.width),
            ..stroke
        });
        self.rendered.get_mut().clear();
        self
    }

    /// Sets display properties of the symbol.
    pub fn with_properties(mut self, properties: SymbolProperties) -> Self {
        self.properties = properties;
        self
    }

    /// Radius in pixels.
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Fill color.
    pub fn fill(&self) -> Option<Color> {
        self.fill
    }

    /// Outline.
    pub fn stroke(&self) -> Option<CircleStroke> {
        self.stroke
    }

    fn stroke_width(&self) -> f32 {
        self.stroke.map(|s| s.width).unwrap_or(0.0)
    }

    fn canvas_side(radius: f32, stroke_width: f32) -> u32 {
        (2.0 * (radius + stroke_width) + 1.0).ceil() as u32
    }

    fn surfaces(&self, pixel_ratio: f32) -> CircleSurfaces {
        let key = ratio_key(pixel_ratio);
        let mut rendered = self.rendered.lock();
        if rendered.len() >= MAX_RENDERED_RATIOS && !rendered.contains_key(&key) {
            log::debug!("Too many pixel ratios rendered for a circle symbol, clearing the cache");
            rendered.clear();
        }

        rendered
            .entry(key)
            .or_insert_with(|| self.render(key as f32 / 100.0))
            .clone()
    }

    fn render(&self, pixel_ratio: f32) -> CircleSurfaces {
        let radius = self.radius * pixel_ratio;
        let stroke_width = self.stroke_width() * pixel_ratio;
        let side = Self::canvas_side(radius, stroke_width);
        let center = side as f32 / 2.0;

        let mut image = DecodedImage::filled(Size::new(side, side), Color::TRANSPARENT);
        // Without fill the inside of the circle must still be hittable.
        let mut hit_detection_image = self
            .fill
            .is_none()
            .then(|| DecodedImage::filled(Size::new(side, side), Color::TRANSPARENT));

        for y in 0..side {
            for x in 0..side {
                let distance = (x as f32 + 0.5 - center).hypot(y as f32 + 0.5 - center);
                let fill_coverage = radius - distance + 0.5;

                let mut color = match self.fill {
                    Some(fill) => fill.over(Color::TRANSPARENT, fill_coverage),
                    None => Color::TRANSPARENT,
                };
                let mut hit_color = Color::BLACK.over(Color::TRANSPARENT, fill_coverage);

                if let Some(stroke) = self.stroke {
                    let stroke_coverage = stroke_width / 2.0 - (distance - radius).abs() + 0.5;
                    color = stroke.color.over(color, stroke_coverage);
                    hit_color = stroke.color.over(hit_color, stroke_coverage);
                }

                image.set_pixel(x, y, color);
                if let Some(hit_detection_image) = &mut hit_detection_image {
                    hit_detection_image.set_pixel(x, y, hit_color);
                }
            }
        }

        let image = Arc::new(image);
        CircleSurfaces {
            hit_detection_image: hit_detection_image
                .map(Arc::new)
                .unwrap_or_else(|| image.clone()),
            image,
        }
    }
}

fn clamp_length(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, MAX_CIRCLE_LENGTH)
    }
}

fn ratio_key(pixel_ratio: f32) -> u32 {
    let pixel_ratio = sanitize_pixel_ratio(pixel_ratio).min(MAX_PIXEL_RATIO);
    ((pixel_ratio * 100.0).round() as u32).max(1)
}

impl ImageSymbol for CircleSymbol {
    fn properties(&self) -> &SymbolProperties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut SymbolProperties {
        &mut self.properties
    }

    fn anchor(&self) -> Vector2<f32> {
        let half = self.size().width() as f32 / 2.0;
        Vector2::new(half, half)
    }

    fn origin(&self) -> Vector2<f32> {
        Vector2::new(0.0, 0.0)
    }

    fn size(&self) -> Size<u32> {
        let side = Self::canvas_side(self.radius, self.stroke_width());
        Size::new(side, side)
    }

    fn image_size(&self) -> Size<u32> {
        self.size()
    }

    fn hit_detection_origin(&self) -> Vector2<f32> {
        self.origin()
    }

    fn hit_detection_image_size(&self) -> Size<u32> {
        self.size()
    }

    fn image(&self, pixel_ratio: f32) -> Option<ImageSurface> {
        Some(self.surfaces(pixel_ratio).image)
    }

    fn hit_detection_image(&self, pixel_ratio: f32) -> Option<ImageSurface> {
        Some(self.surfaces(pixel_ratio).hit_detection_image)
    }

    fn image_state(&self) -> ImageState {
        self.notifier.state()
    }

    fn load(&self) {}

    fn listen_image_change(&self, listener: Box<dyn ImageChangeListener>) -> ListenerKey {
        self.notifier.listen(listener)
    }

    fn unlisten_image_change(&self, key: ListenerKey) {
        self.notifier.unlisten(key);
    }
}
