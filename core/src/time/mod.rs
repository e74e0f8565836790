pub mod beats;
pub mod tempo;

pub use self::beats::{pixels_to_beats, snap_to_grid, Beats};
pub use self::tempo::Tempo;

pub type SampleRate = u32;
