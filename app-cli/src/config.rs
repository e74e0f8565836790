use failure::Error;
use serde_derive::Deserialize;

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use bezier_studio_core::config::Config as StudioConfig;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Engine {
  /// Executable reading parameters as JSON on stdin and writing audio to stdout.
  pub command: String,
  pub args: Vec<String>,
  /// How long to wait for a render before giving up.
  pub timeout_secs: u64,
}

impl Default for Engine {
  fn default() -> Engine {
    Engine {
      command: "bezier-synth".to_string(),
      args: Vec::new(),
      timeout_secs: 60,
    }
  }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Output {
  pub directory: PathBuf,
}

impl Default for Output {
  fn default() -> Output {
    Output {
      directory: PathBuf::from("."),
    }
  }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
  pub engine: Engine,
  pub output: Output,
  pub studio: StudioConfig,
}

impl Config {
  pub fn from_file<'a, T>(path: T) -> Result<Config, Error>
  where
    T: Into<&'a str>,
  {
    let mut content = String::new();
    let mut file = File::open(path.into())?;
    file.read_to_string(&mut content)?;
    Config::from_str(content.as_str())
  }

  pub fn from_str<'a, T>(content: T) -> Result<Config, Error>
  where
    T: Into<&'a str>,
  {
    let config: Config = toml::from_str(content.into())?;
    Ok(config)
  }
}
