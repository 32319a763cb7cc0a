//! Presentation colors handed out to parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hue step between generated colors, in degrees. Consecutive hues stay far apart.
const GOLDEN_ANGLE: f64 = 137.507_764;
const GENERATED_SATURATION: f64 = 0.55;
const GENERATED_VALUE: f64 = 0.95;

/// An opaque `#RRGGBB` color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Convert an HSV triple (hue in degrees, saturation and value in `0..=1`) to RGB.
    pub fn from_hsv(hue: f64, saturation: f64, value: f64) -> Self {
        let sector = hue.rem_euclid(360.0) / 60.0;
        let chroma = value * saturation;
        let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
        let m = value - chroma;
        let (r, g, b) = match sector as u32 {
            0 => (chroma, x, 0.0),
            1 => (x, chroma, 0.0),
            2 => (0.0, chroma, x),
            3 => (0.0, x, chroma),
            4 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };
        let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Self::rgb(channel(r), channel(g), channel(b))
    }

    /// Relative luminance in `0..=1`, used to pick readable foreground text.
    pub fn luminance(&self) -> f64 {
        (0.2126 * f64::from(self.r) + 0.7152 * f64::from(self.g) + 0.0722 * f64::from(self.b))
            / 255.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorParseError {
    #[error("color '{0}' must look like #RRGGBB")]
    Malformed(String),
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let hex = trimmed
            .strip_prefix('#')
            .filter(|hex| hex.len() == 6 && hex.is_ascii())
            .ok_or_else(|| ColorParseError::Malformed(value.to_string()))?;
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|_| ColorParseError::Malformed(value.to_string()))
        };
        Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_string()
    }
}

/// Hands out one color per new parameter: the configured palette first, then generated hues.
#[derive(Debug, Clone, Default)]
pub struct ColorAllocator {
    palette: Vec<Color>,
    issued: usize,
}

impl ColorAllocator {
    pub fn new(palette: Vec<Color>) -> Self {
        Self { palette, issued: 0 }
    }

    /// Colors handed out so far.
    pub fn issued(&self) -> usize {
        self.issued
    }

    pub fn next_color(&mut self) -> Color {
        let index = self.issued;
        self.issued += 1;
        if let Some(color) = self.palette.get(index) {
            return *color;
        }
        let generated = (index - self.palette.len()) as f64;
        Color::from_hsv(
            30.0 + generated * GOLDEN_ANGLE,
            GENERATED_SATURATION,
            GENERATED_VALUE,
        )
    }
}
