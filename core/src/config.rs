use failure::Error;
use serde_derive::Deserialize;

use std::fs::File;
use std::io::Read;
use std::time::Duration;

use crate::time::{Beats, SampleRate};

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Editor {
  /// Side of the square curve canvas, in pixels.
  pub canvas_size: f64,
  /// Pixels per beat on the piano roll.
  pub zoom: f64,
  /// Grid step in beats, 0 disables snapping.
  pub snap_to_grid: Beats,
}

impl Default for Editor {
  fn default() -> Editor {
    Editor {
      canvas_size: 400.0,
      zoom: 50.0,
      snap_to_grid: 1.0,
    }
  }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Audio {
  pub bpm: u32,
  pub sample_rate: SampleRate,
}

impl Default for Audio {
  fn default() -> Audio {
    Audio {
      bpm: 120,
      sample_rate: 44100,
    }
  }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Pipeline {
  pub settle_delay_ms: u64,
}

impl Default for Pipeline {
  fn default() -> Pipeline {
    Pipeline {
      settle_delay_ms: 500,
    }
  }
}

impl Pipeline {
  pub fn settle_delay(&self) -> Duration {
    Duration::from_millis(self.settle_delay_ms)
  }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
  pub editor: Editor,
  pub audio: Audio,
  pub pipeline: Pipeline,
}

impl Config {
  pub fn from_file<'a, T>(path: T) -> Result<Config, Error>
  where
    T: Into<&'a str>,
  {
    let mut content = String::new();
    let path_str = path.into();
    let mut file = File::open(path_str)?;
    file.read_to_string(&mut content)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
  }

  pub fn from_str<'a, T>(content: T) -> Result<Config, Error>
  where
    T: Into<&'a str>,
  {
    let config: Config = toml::from_str(content.into())?;
    Ok(config)
  }
}
