pub mod gesture;
pub mod note;
pub mod timeline;

use failure::Fail;
use log::debug;
use serde_derive::Serialize;

use crate::synth::engine::{EngineNote, SynthesisParameters};
use crate::synth::pipeline::{Observation, SettlingParams};
use crate::time::{SampleRate, Tempo};
use crate::wave::Curve;

use self::timeline::{Timeline, TimelineError};

pub const DEFAULT_SAMPLE_RATE: SampleRate = 44100;

#[derive(Debug, Fail, Clone, PartialEq)]
pub enum SongError {
  #[fail(display = "Invalid tempo: {} bpm", bpm)]
  InvalidTempo { bpm: u32 },

  #[fail(display = "Invalid sample rate: {}", sample_rate)]
  InvalidSampleRate { sample_rate: SampleRate },

  #[fail(display = "{}", _0)]
  Timeline(#[cause] TimelineError),
}

impl From<TimelineError> for SongError {
  fn from(err: TimelineError) -> Self {
    SongError::Timeline(err)
  }
}

/// Tempo, quality and notes, ready to be handed over.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameters {
  pub bpm: u32,
  pub sample_rate: SampleRate,
  pub notes: Vec<EngineNote>,
}

/// The composition: the notes, the wave shape and how to play them.
#[derive(Debug, Clone)]
pub struct Song {
  timeline: Timeline,
  curve: Curve,
  tempo: Tempo,
  sample_rate: SampleRate,
}

impl Default for Song {
  fn default() -> Self {
    Song::new(Curve::default(), Tempo::default(), DEFAULT_SAMPLE_RATE)
  }
}

impl Song {
  pub fn new(curve: Curve, tempo: Tempo, sample_rate: SampleRate) -> Song {
    Song {
      timeline: Timeline::new(),
      curve,
      tempo,
      sample_rate,
    }
  }

  pub fn timeline(&self) -> &Timeline {
    &self.timeline
  }

  pub fn timeline_mut(&mut self) -> &mut Timeline {
    &mut self.timeline
  }

  pub fn curve(&self) -> &Curve {
    &self.curve
  }

  pub fn curve_mut(&mut self) -> &mut Curve {
    &mut self.curve
  }

  pub fn tempo(&self) -> Tempo {
    self.tempo
  }

  pub fn bpm(&self) -> u32 {
    self.tempo.get_value()
  }

  pub fn set_bpm(&mut self, bpm: u32) -> Result<(), SongError> {
    let tempo = Tempo::new(bpm);
    if !tempo.is_valid() {
      return Err(SongError::InvalidTempo { bpm });
    }
    debug!("Tempo set to {} bpm", bpm);
    self.tempo = tempo;
    Ok(())
  }

  pub fn sample_rate(&self) -> SampleRate {
    self.sample_rate
  }

  pub fn set_sample_rate(&mut self, sample_rate: SampleRate) -> Result<(), SongError> {
    if sample_rate == 0 {
      return Err(SongError::InvalidSampleRate { sample_rate });
    }
    debug!("Sample rate set to {}", sample_rate);
    self.sample_rate = sample_rate;
    Ok(())
  }

  pub fn generate_parameters(&self) -> Parameters {
    Parameters {
      bpm: self.bpm(),
      sample_rate: self.sample_rate,
      notes: self.timeline.engine_notes(),
    }
  }

  pub fn synthesis_parameters(&self) -> SynthesisParameters {
    let Parameters {
      bpm,
      sample_rate,
      notes,
    } = self.generate_parameters();
    SynthesisParameters {
      curve_y: self.curve.engine_y(),
      bpm,
      notes,
      sample_rate,
    }
  }

  pub fn observation(&self) -> Observation {
    Observation {
      notes: self.timeline.engine_notes(),
      settling: SettlingParams {
        bpm: self.bpm(),
        sample_rate: self.sample_rate,
        curve_y: self.curve.engine_y(),
      },
    }
  }
}
