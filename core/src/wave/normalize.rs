//! Mapping between editor pixels on a square canvas and the portable
//! representation used by the engine and by interchange files.
//!
//! Portable x goes from 0 to 1, left to right. Portable y goes from -1 to 1,
//! bottom to top, so the editor's vertical axis is flipped. Portable values
//! are quantized to 3 decimals and editor values to whole pixels, which means
//! a round trip is close but not exact.

use serde_derive::{Deserialize, Serialize};

use crate::wave::curve::Point;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
  pub x: f64,
  pub y: f64,
}

impl NormalizedPoint {
  pub fn new(x: f64, y: f64) -> NormalizedPoint {
    NormalizedPoint { x, y }
  }
}

pub fn round3(value: f64) -> f64 {
  // adding zero turns -0.0 into 0.0
  (value * 1000.0).round() / 1000.0 + 0.0
}

pub fn normalize_x(x: f64, size: f64) -> f64 {
  round3(x / size)
}

pub fn normalize_y(y: f64, size: f64) -> f64 {
  round3(((size - y) / size) * 2.0 - 1.0)
}

pub fn denormalize_x(x: f64, size: f64) -> f64 {
  (x * size).round()
}

pub fn denormalize_y(y: f64, size: f64) -> f64 {
  ((1.0 - (y + 1.0) / 2.0) * size).round()
}

pub fn normalize(point: Point, size: f64) -> NormalizedPoint {
  NormalizedPoint {
    x: normalize_x(point.x, size),
    y: normalize_y(point.y, size),
  }
}

pub fn denormalize(point: NormalizedPoint, size: f64) -> Point {
  Point {
    x: denormalize_x(point.x, size),
    y: denormalize_y(point.y, size),
  }
}
