//! Page geometry: target page sizes and image placement.
//!
//! # Coordinate System
//!
//! PDF uses a **bottom-left origin**, so `y_offset` is the distance from the
//! bottom edge of the page to the bottom edge of the image. Since images are
//! centered this is symmetric and needs no flipping.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Slack applied before truncating a scaled dimension, so that products
/// like `900 * (612 / 1200)` land on 459 rather than 458.
const TRUNCATE_EPSILON: f64 = 1e-6;

/// Target page rectangle, in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub const LETTER: Self = Self::new(612.0, 792.0);
    pub const LEGAL: Self = Self::new(612.0, 1008.0);
    pub const A4: Self = Self::new(595.0, 842.0);
    pub const A5: Self = Self::new(420.0, 595.0);

    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    fn preset_name(self) -> Option<&'static str> {
        [
            (Self::LETTER, "letter"),
            (Self::LEGAL, "legal"),
            (Self::A4, "a4"),
            (Self::A5, "a5"),
        ]
        .into_iter()
        .find(|(size, _)| *size == self)
        .map(|(_, name)| name)
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::LETTER
    }
}

impl FromStr for PageSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "letter" => return Ok(Self::LETTER),
            "legal" => return Ok(Self::LEGAL),
            "a4" => return Ok(Self::A4),
            "a5" => return Ok(Self::A5),
            _ => {}
        }

        let invalid = || Error::InvalidPageSize(s.to_string());
        let (w, h) = normalized.split_once('x').ok_or_else(invalid)?;
        let width: f32 = w.trim().parse().map_err(|_| invalid())?;
        let height: f32 = h.trim().parse().map_err(|_| invalid())?;

        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(invalid());
        }

        Ok(Self::new(width, height))
    }
}

impl TryFrom<String> for PageSize {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PageSize> for String {
    fn from(size: PageSize) -> Self {
        size.to_string()
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.preset_name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}x{}", self.width, self.height),
        }
    }
}

/// Where and how large an image is drawn on its page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub scaled_width: f32,
    pub scaled_height: f32,
    pub x_offset: f32,
    pub y_offset: f32,
}

impl PageLayout {
    /// Fit an image of `width`×`height` pixels onto `page`.
    ///
    /// Images that fit are drawn at their natural size (one pixel per point).
    /// Larger images are downscaled, preserving aspect ratio, until they touch
    /// the page on the constraining axis; the other axis is truncated to whole
    /// points (never below one). The result is centered on both axes.
    #[allow(clippy::cast_possible_truncation)]
    pub fn fit(width: u32, height: u32, page: PageSize) -> Self {
        let page_w = f64::from(page.width);
        let page_h = f64::from(page.height);
        let img_w = f64::from(width);
        let img_h = f64::from(height);

        let (w, h) = if img_w > page_w || img_h > page_h {
            let scale_x = page_w / img_w;
            let scale_y = page_h / img_h;
            if scale_x <= scale_y {
                (page_w, truncate(img_h * scale_x))
            } else {
                (truncate(img_w * scale_y), page_h)
            }
        } else {
            (img_w, img_h)
        };

        Self {
            scaled_width: w as f32,
            scaled_height: h as f32,
            x_offset: ((page_w - w) / 2.0) as f32,
            y_offset: ((page_h - h) / 2.0) as f32,
        }
    }
}

fn truncate(value: f64) -> f64 {
    (value + TRUNCATE_EPSILON).floor().max(1.0)
}
