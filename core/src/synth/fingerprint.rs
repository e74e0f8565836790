use std::fmt;

use crate::synth::engine::SynthesisParameters;

/// Content hash of everything that changes the synthesized audio.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(blake3::Hash);

impl Fingerprint {
  pub fn of(parameters: &SynthesisParameters) -> Fingerprint {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&parameters.bpm.to_le_bytes());
    hasher.update(&parameters.sample_rate.to_le_bytes());
    hasher.update(&(parameters.notes.len() as u64).to_le_bytes());
    for note in &parameters.notes {
      hasher.update(&[note.pitch]);
      hasher.update(&note.octave.to_le_bytes());
      hasher.update(&note.beats.to_bits().to_le_bytes());
      hasher.update(&note.amplitude.to_bits().to_le_bytes());
    }
    for y in &parameters.curve_y {
      hasher.update(&y.to_bits().to_le_bytes());
    }
    Fingerprint(hasher.finalize())
  }

  /// First 16 hex digits, enough to tell renders apart in file names.
  pub fn short(&self) -> String {
    let hex = self.0.to_hex();
    hex.as_str()[..16].to_string()
  }
}

impl fmt::Display for Fingerprint {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", self.0.to_hex())
  }
}

impl fmt::Debug for Fingerprint {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "Fingerprint({})", self.short())
  }
}
