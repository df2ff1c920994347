use serde::{Deserialize, Serialize};

/// RGBA color used to paint procedural markers.
///
/// Serialized as a HEX8 string (`#RRGGBBAA`). HEX6 strings are accepted on input.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from_hex(&value).ok_or_else(|| format!("invalid color string: {value}"))
    }
}

impl From<Color> for String {
    fn from(val: Color) -> Self {
        val.to_hex()
    }
}

impl Color {
    /// Transparent color: `#00000000`
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    /// Red color: `#FF0000FF`
    pub const RED: Color = Color::rgba(255, 0, 0, 255);
    /// Blue color: `#0000FFFF`
    pub const BLUE: Color = Color::rgba(0, 0, 255, 255);
    /// White color: `#FFFFFFFF`
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    /// Black color: `#000000FF`
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);

    /// Constructs color from its RGBA channels.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Converts the color into u8 array (RGBA).
    pub fn to_u8_array(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Converts the color into HEX8 string: `#RRGGBBAA`.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }

    /// Parses a color from the hex string. Hex string can be either HEX6 (`#RRGGBB`) or HEX8 (`#RRGGBBAA`).
    pub fn try_from_hex(hex_string: &str) -> Option<Self> {
        if hex_string.len() != 7 && hex_string.len() != 9 || !hex_string.starts_with('#') {
            return None;
        }

        let channel = |from: usize| u8::from_str_radix(hex_string.get(from..from + 2)?, 16).ok();
        let a = if hex_string.len() == 9 {
            channel(7)?
        } else {
            255
        };

        Some(Self::rgba(channel(1)?, channel(3)?, channel(5)?, a))
    }

    /// Returns a new color instance, copied from the base one but with the given alpha channel.
    pub fn with_alpha(&self, a: u8) -> Self {
        Self { a, ..*self }
    }

    /// Opacity component of the color.
    pub fn a(&self) -> u8 {
        self.a
    }

    /// Composites `self` over the `back` color (straight alpha, source-over).
    ///
    /// `coverage` in `[0, 1]` is the portion of the pixel covered by `self`.
    pub fn over(&self, back: Color, coverage: f32) -> Color {
        let fore_a = self.a as f32 / 255.0 * coverage.clamp(0.0, 1.0);
        let back_a = back.a as f32 / 255.0;
        let out_a = fore_a + back_a * (1.0 - fore_a);
        if out_a <= f32::EPSILON {
            return Color::TRANSPARENT;
        }

        let mix = |fore: u8, back: u8| {
            let value = (fore as f32 * fore_a + back as f32 * back_a * (1.0 - fore_a)) / out_a;
            value.round().clamp(0.0, 255.0) as u8
        };

        Color {
            r: mix(self.r, back.r),
            g: mix(self.g, back.g),
            b: mix(self.b, back.b),
            a: (out_a * 255.0).round() as u8,
        }
    }
}
