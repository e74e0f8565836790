pub mod curve;
pub mod normalize;

pub use self::curve::{Curve, CurvePoint, NormalizedCurve, Point};
pub use self::normalize::NormalizedPoint;
