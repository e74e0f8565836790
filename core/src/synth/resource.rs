use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::{trace, warn};
use uuid::Uuid;

use crate::interchange::NamedBuffer;
use crate::synth::fingerprint::Fingerprint;

/// Revocable reference to audio published for playback or download.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle(String);

impl ResourceHandle {
  pub fn new<T>(value: T) -> ResourceHandle
  where
    T: Into<String>,
  {
    ResourceHandle(value.into())
  }

  pub fn as_str(&self) -> &str {
    self.0.as_str()
  }
}

impl fmt::Display for ResourceHandle {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Where handles come from. Every created handle must be released exactly once.
pub trait ResourceHost {
  fn create(&mut self, bytes: &Arc<Vec<u8>>) -> ResourceHandle;

  fn release(&mut self, handle: &ResourceHandle);
}

/// The audio currently published by the pipeline.
#[derive(Debug)]
pub struct AudioResource {
  handle: ResourceHandle,
  bytes: Arc<Vec<u8>>,
  fingerprint: Fingerprint,
  seq: u64,
}

impl AudioResource {
  pub(crate) fn new(
    handle: ResourceHandle,
    bytes: Arc<Vec<u8>>,
    fingerprint: Fingerprint,
    seq: u64,
  ) -> AudioResource {
    AudioResource {
      handle,
      bytes,
      fingerprint,
      seq,
    }
  }

  pub fn handle(&self) -> &ResourceHandle {
    &self.handle
  }

  pub fn bytes(&self) -> &[u8] {
    self.bytes.as_slice()
  }

  pub fn fingerprint(&self) -> Fingerprint {
    self.fingerprint
  }

  pub fn seq(&self) -> u64 {
    self.seq
  }

  pub fn download(&self) -> NamedBuffer {
    NamedBuffer {
      name: format!("audio-{}.wav", self.fingerprint.short()),
      bytes: self.bytes.to_vec(),
    }
  }
}

/// In memory registry of object urls.
#[derive(Debug, Default)]
pub struct ObjectUrls {
  live: HashMap<ResourceHandle, Arc<Vec<u8>>>,
}

impl ObjectUrls {
  pub fn new() -> ObjectUrls {
    ObjectUrls::default()
  }

  pub fn live_count(&self) -> usize {
    self.live.len()
  }

  pub fn resolve(&self, handle: &ResourceHandle) -> Option<Arc<Vec<u8>>> {
    self.live.get(handle).cloned()
  }
}

impl ResourceHost for ObjectUrls {
  fn create(&mut self, bytes: &Arc<Vec<u8>>) -> ResourceHandle {
    let handle = ResourceHandle::new(format!("blob:bezier-studio/{}", Uuid::new_v4()));
    trace!("Created {} ({} bytes)", handle, bytes.len());
    self.live.insert(handle.clone(), bytes.clone());
    handle
  }

  fn release(&mut self, handle: &ResourceHandle) {
    match self.live.remove(handle) {
      Some(_) => trace!("Released {}", handle),
      None => warn!("Releasing unknown resource {}", handle),
    }
  }
}
