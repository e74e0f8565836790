use log::info;

use crate::config::Config;
use crate::interchange::{self, InterchangeError, NamedBuffer};
use crate::song::gesture::{GestureKind, NoteGesture};
use crate::song::note::NoteId;
use crate::song::timeline::TimelineError;
use crate::song::{Song, SongError};
use crate::synth::engine::SynthesisEngine;
use crate::synth::resource::ResourceHost;
use crate::synth::worker::{Orchestrator, WorkerError};
use crate::time::{pixels_to_beats, Beats, Tempo};
use crate::wave::Curve;

pub struct Studio {
  config: Config,
  song: Song,
}

impl Studio {
  pub fn new(config: Config) -> Result<Studio, SongError> {
    let mut song = Song::new(
      Curve::new(config.editor.canvas_size),
      Tempo::default(),
      config.audio.sample_rate,
    );
    song.set_bpm(config.audio.bpm)?;
    song.set_sample_rate(config.audio.sample_rate)?;

    info!(
      "New studio at {} bpm and {} Hz",
      song.bpm(),
      song.sample_rate()
    );
    Ok(Studio { config, song })
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn song(&self) -> &Song {
    &self.song
  }

  pub fn song_mut(&mut self) -> &mut Song {
    &mut self.song
  }

  pub fn grid(&self) -> Beats {
    self.config.editor.snap_to_grid
  }

  /// Beat under a horizontal pointer position of the piano roll.
  pub fn beat_at(&self, pixels: f64) -> Beats {
    pixels_to_beats(pixels, self.config.editor.zoom)
  }

  pub fn start_gesture(&self, id: NoteId, kind: GestureKind) -> Result<NoteGesture, TimelineError> {
    NoteGesture::start(self.song.timeline(), id, kind, self.grid())
  }

  pub fn import(&mut self, bytes: &[u8]) -> Result<(), InterchangeError> {
    interchange::import(&mut self.song, bytes)
  }

  pub fn export(&self, unix_millis: u128) -> Result<NamedBuffer, InterchangeError> {
    interchange::export(&self.song, unix_millis)
  }

  pub fn orchestrator<H: ResourceHost>(
    &self,
    host: H,
    engine: Box<dyn SynthesisEngine>,
  ) -> Result<Orchestrator<H>, WorkerError> {
    Orchestrator::new(
      &self.song,
      host,
      engine,
      self.config.pipeline.settle_delay(),
    )
  }
}

#[cfg(test)]
mod test {

  use super::Studio;
  use crate::config::Config;
  use crate::song::gesture::GestureKind;
  use crate::song::SongError;

  #[test]
  pub fn studio_from_config() {
    let config = Config::from_str("[audio]\nbpm = 96\nsample_rate = 22050\n[editor]\ncanvas_size = 200.0").unwrap();
    let studio = Studio::new(config).unwrap();
    assert_eq!(studio.song().bpm(), 96);
    assert_eq!(studio.song().sample_rate(), 22050);
    assert_eq!(studio.song().curve().size(), 200.0);
    assert_eq!(studio.grid(), 1.0);
    assert_eq!(studio.beat_at(125.0), 2.5);
  }

  #[test]
  pub fn studio_rejects_invalid_config() {
    let config = Config::from_str("[audio]\nbpm = 0").unwrap();
    assert_eq!(Studio::new(config).err(), Some(SongError::InvalidTempo { bpm: 0 }));
  }

  #[test]
  pub fn studio_import_export() {
    let mut studio = Studio::new(Config::default()).unwrap();
    studio
      .import(br#"{"bpm":100,"notes":[{"id":4,"beats":2.0,"octave":4,"amplitude":1.0}]}"#)
      .unwrap();
    assert_eq!(studio.song().bpm(), 100);

    let buffer = studio.export(7).unwrap();
    assert_eq!(buffer.name, "orchestrator_100bpm_7.json");

    assert!(studio.import(b"{}").is_err());
    assert_eq!(studio.song().bpm(), 100);
    assert_eq!(studio.song().timeline().len(), 1);
  }

  #[test]
  pub fn studio_gesture_uses_grid() {
    let mut studio = Studio::new(Config::from_str("[editor]\nsnap_to_grid = 0.5").unwrap()).unwrap();
    let id = studio.song_mut().timeline_mut().add_note(4, 0, 0.0, 1.0, 1.0).unwrap();
    let gesture = studio.start_gesture(id, GestureKind::Resize).unwrap();
    gesture.commit(studio.song_mut().timeline_mut(), 0.1).unwrap();
    assert_eq!(studio.song().timeline().get(id).unwrap().duration(), 0.5);
  }
}
