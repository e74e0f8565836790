use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use log::{debug, info, warn};

use failure::{Error, Fail};

use bezier_studio_core::interchange::NamedBuffer;
use bezier_studio_core::studio::Studio;
use bezier_studio_core::synth::{ObjectUrls, SynthesisError};

mod config;
use crate::config::Config;

mod engine;
use crate::engine::CommandEngine;

const BEZIER_STUDIO_CONFIG: &str = "BEZIER_STUDIO_CONFIG";
const DEFAULT_BEZIER_STUDIO_CONFIG: &str = "studio.toml";

const BEZIER_STUDIO_LOG_CONFIG: &str = "BEZIER_STUDIO_LOG_CONFIG";
const DEFAULT_BEZIER_STUDIO_LOG_CONFIG: &str = "log4rs.yaml";

#[derive(Debug, Fail)]
enum MainError {
  #[fail(display = "Failed to init logging: {}", cause)]
  LoggingInit { cause: String },

  #[fail(display = "Failed to import {}: {}", path, cause)]
  Import { path: String, cause: String },

  #[fail(display = "Failed to render: {}", cause)]
  Render { cause: SynthesisError },

  #[fail(display = "No audio after {} seconds", secs)]
  RenderTimeout { secs: u64 },
}

#[derive(Parser)]
#[command(name = "bezier-studio")]
#[command(about = "Bezier wave synthesizer studio", long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Render a composition to audio, then export it again
  Render {
    /// Interchange JSON file
    input: PathBuf,
  },

  /// Validate a composition and export it again without rendering
  Export {
    /// Interchange JSON file
    input: PathBuf,
  },
}

fn main() -> Result<(), Error> {
  let cli = Cli::parse();

  init_logging()?;

  let config = init_config()?;

  match cli.command {
    Commands::Render { input } => {
      let studio = init_studio(&config, &input)?;
      render(&studio, &config)?;
      export(&studio, &config)
    }
    Commands::Export { input } => {
      let studio = init_studio(&config, &input)?;
      export(&studio, &config)
    }
  }
}

fn init_logging() -> Result<(), Error> {
  let log_config_path = std::env::var(BEZIER_STUDIO_LOG_CONFIG)
    .unwrap_or_else(|_| DEFAULT_BEZIER_STUDIO_LOG_CONFIG.to_string());

  log4rs::init_file(log_config_path.as_str(), Default::default()).map_err(|err| {
    MainError::LoggingInit {
      cause: err.to_string(),
    }
  })?;

  Ok(())
}

fn init_config() -> Result<Config, Error> {
  let config_path = std::env::var(BEZIER_STUDIO_CONFIG)
    .unwrap_or_else(|_| DEFAULT_BEZIER_STUDIO_CONFIG.to_string());

  if !Path::new(&config_path).exists() {
    warn!("{} not found, using the default configuration", config_path);
    return Ok(Config::default());
  }

  info!("Loading studio configuration from {} ...", config_path);
  let config = Config::from_file(config_path.as_str())?;
  debug!("{:#?}", config);

  Ok(config)
}

fn init_studio(config: &Config, input: &Path) -> Result<Studio, Error> {
  info!("Initialising the studio ...");

  let mut studio = Studio::new(config.studio.clone())?;

  let bytes = fs::read(input)?;
  studio
    .import(&bytes)
    .map_err(|err| MainError::Import {
      path: input.display().to_string(),
      cause: err.to_string(),
    })?;

  Ok(studio)
}

fn render(studio: &Studio, config: &Config) -> Result<(), Error> {
  info!("Rendering with {} ...", config.engine.command);

  let engine = CommandEngine::new(config.engine.command.as_str(), config.engine.args.clone());
  let mut orchestrator = studio.orchestrator(ObjectUrls::new(), Box::new(engine))?;
  orchestrator.force_regenerate(Instant::now())?;

  let timeout = Duration::from_secs(config.engine.timeout_secs);
  let deadline = Instant::now() + timeout;
  let download = loop {
    let pipeline = orchestrator.pipeline();
    if let Some(resource) = pipeline.current() {
      break resource.download();
    }
    if let Some(SynthesisError::EngineFailure { cause }) = pipeline.last_error() {
      return Err(
        MainError::Render {
          cause: SynthesisError::EngineFailure {
            cause: cause.clone(),
          },
        }
        .into(),
      );
    }

    let now = Instant::now();
    if now >= deadline {
      return Err(
        MainError::RenderTimeout {
          secs: timeout.as_secs(),
        }
        .into(),
      );
    }
    orchestrator.wait_event(deadline - now)?;
  };

  write_buffer(&config.output.directory, &download)?;
  orchestrator.stop()?;

  Ok(())
}

fn export(studio: &Studio, config: &Config) -> Result<(), Error> {
  let unix_millis = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis();
  let buffer = studio.export(unix_millis)?;
  write_buffer(&config.output.directory, &buffer)
}

fn write_buffer(directory: &Path, buffer: &NamedBuffer) -> Result<(), Error> {
  fs::create_dir_all(directory)?;
  let path = directory.join(&buffer.name);
  fs::write(&path, &buffer.bytes)?;
  info!("Saved {} ({} bytes)", path.display(), buffer.bytes.len());
  Ok(())
}
