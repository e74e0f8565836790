use failure::Fail;
use serde_derive::Serialize;

use crate::song::note::{Note, Octave, PitchClass};

#[derive(Debug, Fail, Clone, PartialEq)]
pub enum SynthesisError {
  #[fail(display = "Synthesis engine failed: {}", cause)]
  EngineFailure { cause: String },

  #[fail(display = "Synthesis engine is not ready")]
  EngineNotReady,
}

/// Note as consumed by the synthesis engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EngineNote {
  #[serde(rename = "id")]
  pub pitch: PitchClass,
  pub octave: Octave,
  pub beats: f64,
  pub amplitude: f64,
}

impl<'a> From<&'a Note> for EngineNote {
  fn from(note: &'a Note) -> Self {
    EngineNote {
      pitch: note.pitch_class(),
      octave: note.octave(),
      beats: note.duration(),
      amplitude: note.amplitude(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisParameters {
  /// Normalized y of start, control A, control B and end.
  pub curve_y: [f64; 4],
  pub bpm: u32,
  pub notes: Vec<EngineNote>,
  pub sample_rate: u32,
}

/// Turns a composition into audio bytes. Expected to be deterministic.
pub trait SynthesisEngine: Send {
  /// Called once from the worker thread before the first synthesis.
  fn initialise(&mut self) -> Result<(), SynthesisError> {
    Ok(())
  }

  fn synthesize(&mut self, parameters: &SynthesisParameters) -> Result<Vec<u8>, SynthesisError>;
}
