/// Position or length on the timeline, in beats.
pub type Beats = f64;

pub fn pixels_to_beats(pixels: f64, zoom: f64) -> Beats {
  pixels / zoom
}

/// Rounds to the nearest multiple of `grid`. A non positive grid disables snapping.
pub fn snap_to_grid(beats: Beats, grid: Beats) -> Beats {
  if grid > 0.0 {
    (beats / grid).round() * grid
  } else {
    beats
  }
}
