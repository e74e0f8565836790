use log::trace;

use crate::wave::normalize::{denormalize, denormalize_y, normalize, normalize_y, NormalizedPoint};

pub const DEFAULT_CANVAS_SIZE: f64 = 400.0;

/// Editor position, in pixels from the top left corner of the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
  pub x: f64,
  pub y: f64,
}

impl Point {
  pub fn new(x: f64, y: f64) -> Point {
    Point { x, y }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurvePoint {
  Start,
  ControlA,
  ControlB,
  End,
}

/// Portable projection of a curve. Start and end only carry their y since
/// they sit on the left and right edges of the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedCurve {
  pub start_y: f64,
  pub control_a: NormalizedPoint,
  pub control_b: NormalizedPoint,
  pub end_y: f64,
}

/// Cubic Bezier shaping one cycle of the oscillator, edited on a square canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
  size: f64,
  start: Point,
  control_a: Point,
  control_b: Point,
  end: Point,
}

impl Default for Curve {
  fn default() -> Self {
    Curve::new(DEFAULT_CANVAS_SIZE)
  }
}

impl Curve {
  /// A wave going up then down, on a canvas of side `size`.
  pub fn new(size: f64) -> Curve {
    let middle = size / 2.0;
    Curve {
      size,
      start: Point::new(0.0, middle),
      control_a: Point::new((size / 3.0).floor(), size / 4.0),
      control_b: Point::new((size * 2.0 / 3.0).floor(), size * 3.0 / 4.0),
      end: Point::new(size, middle),
    }
  }

  pub fn size(&self) -> f64 {
    self.size
  }

  pub fn point(&self, which: CurvePoint) -> Point {
    match which {
      CurvePoint::Start => self.start,
      CurvePoint::ControlA => self.control_a,
      CurvePoint::ControlB => self.control_b,
      CurvePoint::End => self.end,
    }
  }

  /// Moves a point, clamping it into the canvas. Start and end stay pinned to
  /// the canvas edges so only their y changes.
  pub fn move_point(&mut self, which: CurvePoint, x: f64, y: f64) {
    let x = self.clamp(x);
    let y = self.clamp(y);
    trace!("Moving {:?} to ({}, {})", which, x, y);
    match which {
      CurvePoint::Start => self.start.y = y,
      CurvePoint::End => self.end.y = y,
      CurvePoint::ControlA => self.control_a = Point::new(x, y),
      CurvePoint::ControlB => self.control_b = Point::new(x, y),
    }
  }

  pub fn normalized(&self) -> NormalizedCurve {
    NormalizedCurve {
      start_y: normalize_y(self.start.y, self.size),
      control_a: normalize(self.control_a, self.size),
      control_b: normalize(self.control_b, self.size),
      end_y: normalize_y(self.end.y, self.size),
    }
  }

  /// The y values handed to the synthesis engine: start, control A, control B, end.
  pub fn engine_y(&self) -> [f64; 4] {
    let normalized = self.normalized();
    [
      normalized.start_y,
      normalized.control_a.y,
      normalized.control_b.y,
      normalized.end_y,
    ]
  }

  /// Places the points from their portable projection at the current size.
  pub fn apply_normalized(&mut self, normalized: &NormalizedCurve) {
    self.start = Point::new(0.0, self.clamp(denormalize_y(normalized.start_y, self.size)));
    self.end = Point::new(self.size, self.clamp(denormalize_y(normalized.end_y, self.size)));
    self.control_a = self.clamp_point(denormalize(normalized.control_a, self.size));
    self.control_b = self.clamp_point(denormalize(normalized.control_b, self.size));
  }

  fn clamp(&self, value: f64) -> f64 {
    value.max(0.0).min(self.size)
  }

  fn clamp_point(&self, point: Point) -> Point {
    Point::new(self.clamp(point.x), self.clamp(point.y))
  }
}
