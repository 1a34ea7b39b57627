use std::fmt;

/// Host control handle of a parameter. Stable for a string id once the cache assigned it.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ParamId(pub i32);

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Straight (non-premultiplied) RGBA color with unit-range channels.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self {
            r: 0.0,
            g: 0.0,
            b: 0.0,
            a: 1.0,
        }
    }
}

/// Raw value reported by the host for a registered control.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamValue {
    Int(i32),
    Float(f32),
    Bool(bool),
    Color(Color),
    Point(Point2D),
}

impl ParamValue {
    /// Integer view. Hosts commonly report sliders and menus as floats, so floats truncate.
    pub fn as_int(self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(v),
            Self::Float(v) => Some(v as i32),
            Self::Bool(v) => Some(i32::from(v)),
            Self::Color(_) | Self::Point(_) => None,
        }
    }

    pub fn as_float(self) -> Option<f32> {
        match self {
            Self::Int(v) => Some(v as f32),
            Self::Float(v) => Some(v),
            Self::Bool(_) | Self::Color(_) | Self::Point(_) => None,
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(v),
            Self::Int(v) => Some(v != 0),
            Self::Float(v) => Some(v != 0.0),
            Self::Color(_) | Self::Point(_) => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
