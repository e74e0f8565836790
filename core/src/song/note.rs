use std::fmt;

use uuid::Uuid;

use crate::time::Beats;

/// Semitone offset within an octave, 0 = C.
pub type PitchClass = u8;

pub type Octave = u32;

pub const PITCH_CLASSES: PitchClass = 12;

/// Reference pitch used for the silence inserted between notes.
pub const SILENCE_OCTAVE: Octave = 0;
pub const SILENCE_PITCH_CLASS: PitchClass = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteId(Uuid);

impl NoteId {
  pub fn new() -> NoteId {
    NoteId(Uuid::new_v4())
  }
}

impl Default for NoteId {
  fn default() -> Self {
    NoteId::new()
  }
}

impl fmt::Display for NoteId {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "note-{}", self.0)
  }
}

/// A note on the timeline. The end of the note is always `start + duration`.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
  id: NoteId,
  octave: Octave,
  pitch_class: PitchClass,
  start: Beats,
  duration: Beats,
  amplitude: f64,
}

impl Note {
  pub fn new(
    octave: Octave,
    pitch_class: PitchClass,
    start: Beats,
    duration: Beats,
    amplitude: f64,
  ) -> Note {
    Note {
      id: NoteId::new(),
      octave,
      pitch_class,
      start,
      duration,
      amplitude,
    }
  }

  pub fn silence(start: Beats, duration: Beats) -> Note {
    Note::new(SILENCE_OCTAVE, SILENCE_PITCH_CLASS, start, duration, 0.0)
  }

  pub fn id(&self) -> NoteId {
    self.id
  }

  pub fn octave(&self) -> Octave {
    self.octave
  }

  pub fn pitch_class(&self) -> PitchClass {
    self.pitch_class
  }

  pub fn start(&self) -> Beats {
    self.start
  }

  pub fn duration(&self) -> Beats {
    self.duration
  }

  pub fn end(&self) -> Beats {
    self.start + self.duration
  }

  pub fn amplitude(&self) -> f64 {
    self.amplitude
  }

  /// Half-open interval test, notes that only touch do not overlap.
  pub fn overlaps(&self, other: &Note) -> bool {
    other.start < self.end() && other.end() > self.start
  }

  /// Returns a copy with the present fields of `update` applied, keeping the id.
  pub fn with_update(&self, update: &NoteUpdate) -> Note {
    Note {
      id: self.id,
      octave: update.octave.unwrap_or(self.octave),
      pitch_class: update.pitch_class.unwrap_or(self.pitch_class),
      start: update.start.unwrap_or(self.start),
      duration: update.duration.unwrap_or(self.duration),
      amplitude: update.amplitude.unwrap_or(self.amplitude),
    }
  }

  pub fn check_fields(&self) -> Result<(), String> {
    if self.pitch_class >= PITCH_CLASSES {
      return Err(format!(
        "pitch class {} must be between 0 and 11",
        self.pitch_class
      ));
    }
    if !self.start.is_finite() || self.start < 0.0 {
      return Err(format!("start beat {} must be 0 or greater", self.start));
    }
    if !self.duration.is_finite() || self.duration <= 0.0 {
      return Err(format!(
        "duration {} must be greater than 0",
        self.duration
      ));
    }
    if !(0.0..=1.0).contains(&self.amplitude) {
      return Err(format!(
        "amplitude {} must be between 0.0 and 1.0",
        self.amplitude
      ));
    }
    Ok(())
  }
}

/// Partial update of a note. Absent fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NoteUpdate {
  pub octave: Option<Octave>,
  pub pitch_class: Option<PitchClass>,
  pub start: Option<Beats>,
  pub duration: Option<Beats>,
  pub amplitude: Option<f64>,
}

impl NoteUpdate {
  pub fn start(start: Beats) -> NoteUpdate {
    NoteUpdate {
      start: Some(start),
      ..NoteUpdate::default()
    }
  }

  pub fn duration(duration: Beats) -> NoteUpdate {
    NoteUpdate {
      duration: Some(duration),
      ..NoteUpdate::default()
    }
  }

  pub fn amplitude(amplitude: f64) -> NoteUpdate {
    NoteUpdate {
      amplitude: Some(amplitude),
      ..NoteUpdate::default()
    }
  }

}
