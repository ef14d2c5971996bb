//! RGBA color type and the fixed per-feature styling schema.

use serde::{Deserialize, Serialize};

/// Represents an RGBA color with floating-point components.
///
/// All components are in the range 0.0 (minimum) to 1.0 (maximum).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red component (0.0 = no red, 1.0 = full red)
    pub r: f64,
    /// Green component (0.0 = no green, 1.0 = full green)
    pub g: f64,
    /// Blue component (0.0 = no blue, 1.0 = full blue)
    pub b: f64,
    /// Alpha/transparency (0.0 = fully transparent, 1.0 = fully opaque)
    pub a: f64,
}

impl Color {
    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }
}

/// Default stroke color for unselected features.
pub const INK: Color = Color {
    r: 0.2,
    g: 0.4,
    b: 0.9,
    a: 1.0,
};

/// Stroke color applied to features carrying `selected: true`.
pub const SELECTED: Color = Color {
    r: 0.9,
    g: 0.3,
    b: 0.1,
    a: 1.0,
};

/// Fill color for polygon interiors.
pub const FILL: Color = Color {
    r: 0.2,
    g: 0.4,
    b: 0.9,
    a: 1.0,
};

/// Fixed styling schema every mode returns from `style_feature`.
///
/// Consumed by the host's rendering adapter layer, never by the core
/// itself. Some fields may be computed per feature (the select mode keys
/// off the `selected` property).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Styling {
    pub point_color: Color,
    pub point_width: f64,
    pub line_color: Color,
    pub line_width: f64,
    pub polygon_fill_color: Color,
    pub polygon_outline_color: Color,
    pub polygon_outline_width: f64,
    pub polygon_fill_opacity: f64,
}

impl Default for Styling {
    fn default() -> Self {
        Self {
            point_color: INK,
            point_width: 6.0,
            line_color: INK,
            line_width: 4.0,
            polygon_fill_color: FILL,
            polygon_outline_color: INK,
            polygon_outline_width: 4.0,
            polygon_fill_opacity: 0.3,
        }
    }
}

impl Styling {
    /// Styling variant with every color swapped to the selected palette.
    pub fn selected() -> Self {
        Self {
            point_color: SELECTED,
            line_color: SELECTED,
            polygon_fill_color: SELECTED,
            polygon_outline_color: SELECTED,
            ..Self::default()
        }
    }
}
