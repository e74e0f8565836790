use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use log::{debug, info};

use bezier_studio_core::synth::{SynthesisEngine, SynthesisError, SynthesisParameters};

fn failure<T: ToString>(err: T) -> SynthesisError {
  SynthesisError::EngineFailure {
    cause: err.to_string(),
  }
}

/// Synthesis through an external executable.
///
/// The parameters are written as JSON to its stdin, and whatever it writes to
/// stdout is taken as the audio file.
pub struct CommandEngine {
  command: String,
  args: Vec<String>,
  program: Option<PathBuf>,
}

impl CommandEngine {
  pub fn new<T>(command: T, args: Vec<String>) -> CommandEngine
  where
    T: Into<String>,
  {
    CommandEngine {
      command: command.into(),
      args,
      program: None,
    }
  }

  fn resolve(&self) -> Option<PathBuf> {
    let command = Path::new(&self.command);
    if command.components().count() > 1 {
      return Some(command.to_path_buf()).filter(|path| path.is_file());
    }
    env::var_os("PATH").and_then(|paths| {
      env::split_paths(&paths)
        .map(|dir| dir.join(command))
        .find(|path| path.is_file())
    })
  }
}

impl SynthesisEngine for CommandEngine {
  fn initialise(&mut self) -> Result<(), SynthesisError> {
    let program = self
      .resolve()
      .ok_or_else(|| failure(format!("{} not found", self.command)))?;
    info!("Synthesis engine at {}", program.display());
    self.program = Some(program);
    Ok(())
  }

  fn synthesize(&mut self, parameters: &SynthesisParameters) -> Result<Vec<u8>, SynthesisError> {
    let program = self.program.as_ref().ok_or(SynthesisError::EngineNotReady)?;
    let input = serde_json::to_vec(parameters).map_err(failure)?;

    let mut child = Command::new(program)
      .args(&self.args)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .map_err(failure)?;

    let writer = child.stdin.take().map(|mut stdin| {
      thread::spawn(move || stdin.write_all(&input))
    });

    let output = child.wait_with_output().map_err(failure)?;
    let written = match writer {
      Some(writer) => writer.join().map_err(|_| failure("stdin writer panicked"))?,
      None => Ok(()),
    };

    if !output.status.success() {
      return Err(failure(format!(
        "{} exited with {}: {}",
        self.command,
        output.status,
        String::from_utf8_lossy(&output.stderr).trim()
      )));
    }
    written.map_err(failure)?;

    debug!("{} wrote {} bytes", self.command, output.stdout.len());
    Ok(output.stdout)
  }
}
