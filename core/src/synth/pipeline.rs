use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};

use crate::synth::engine::{EngineNote, SynthesisError, SynthesisParameters};
use crate::synth::fingerprint::Fingerprint;
use crate::synth::resource::{AudioResource, ResourceHost};
use crate::synth::settle::Settler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
  Idle,
  PendingRegeneration,
  Generating,
}

/// Inputs changed by continuous interactions, held back until they settle.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlingParams {
  pub bpm: u32,
  pub sample_rate: u32,
  pub curve_y: [f64; 4],
}

/// Everything the pipeline looks at, taken from the composition after each change.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
  /// Playable sequence, acted upon immediately.
  pub notes: Vec<EngineNote>,
  pub settling: SettlingParams,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
  pub seq: u64,
  pub fingerprint: Fingerprint,
  pub parameters: SynthesisParameters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
  /// The result became the current audio resource.
  Published,
  /// A later request already published, the result was dropped.
  Stale,
  Failed,
  /// The engine was not ready, the request will be initiated again.
  Deferred,
}

/// Decides when to call the synthesis engine and owns the published audio.
///
/// A generation is initiated whenever the fingerprint of the immediate notes
/// plus the settled parameters differs from the last initiated one. Results
/// are published in initiation order: a result older than the published one
/// is dropped.
pub struct Pipeline<H: ResourceHost> {
  host: H,
  notes: Vec<EngineNote>,
  settling: Settler<SettlingParams>,
  engine_ready: bool,
  force_next: bool,
  last_initiated: Option<Fingerprint>,
  next_seq: u64,
  in_flight: BTreeMap<u64, Fingerprint>,
  published_seq: u64,
  current: Option<AudioResource>,
  last_error: Option<SynthesisError>,
}

impl<H: ResourceHost> Pipeline<H> {
  pub fn new(host: H, initial: Observation, settle_delay: Duration) -> Pipeline<H> {
    Pipeline {
      host,
      notes: initial.notes,
      settling: Settler::new(initial.settling, settle_delay),
      engine_ready: false,
      force_next: false,
      last_initiated: None,
      next_seq: 0,
      in_flight: BTreeMap::new(),
      published_seq: 0,
      current: None,
      last_error: None,
    }
  }

  pub fn observe(&mut self, observation: Observation, now: Instant) {
    self.notes = observation.notes;
    self.settling.observe(observation.settling, now);
  }

  /// Evaluates the current state and returns the generation to run, if any.
  pub fn poll(&mut self, now: Instant) -> Option<GenerationRequest> {
    if self.settling.poll(now) {
      debug!("Settled {:?}", self.settling.settled());
    }

    let parameters = self.parameters();
    let fingerprint = Fingerprint::of(&parameters);
    if !self.is_eligible(fingerprint) {
      return None;
    }

    if !self.engine_ready {
      trace!("Deferring generation of {:?} until the engine is ready", fingerprint);
      if self.last_error.is_none() {
        self.last_error = Some(SynthesisError::EngineNotReady);
      }
      return None;
    }

    self.force_next = false;
    self.last_initiated = Some(fingerprint);
    self.next_seq += 1;
    let seq = self.next_seq;
    self.in_flight.insert(seq, fingerprint);

    info!("Generating #{} with fingerprint {:?}", seq, fingerprint);
    Some(GenerationRequest {
      seq,
      fingerprint,
      parameters,
    })
  }

  pub fn complete(&mut self, seq: u64, result: Result<Vec<u8>, SynthesisError>) -> Completion {
    let fingerprint = match self.in_flight.remove(&seq) {
      Some(fingerprint) => fingerprint,
      None => {
        warn!("Ignoring completion of unknown generation #{}", seq);
        return Completion::Stale;
      }
    };

    match result {
      Ok(_) if seq <= self.published_seq => {
        info!("Dropping stale generation #{}", seq);
        Completion::Stale
      }
      Ok(bytes) => {
        let bytes = Arc::new(bytes);
        let handle = self.host.create(&bytes);
        if let Some(previous) = self.current.take() {
          self.host.release(previous.handle());
        }
        info!("Published generation #{} as {}", seq, handle);
        self.current = Some(AudioResource::new(handle, bytes, fingerprint, seq));
        self.published_seq = seq;
        self.last_error = None;
        Completion::Published
      }
      Err(SynthesisError::EngineNotReady) if seq <= self.published_seq => {
        warn!("Engine not ready for superseded generation #{}", seq);
        self.engine_ready = false;
        Completion::Stale
      }
      Err(SynthesisError::EngineNotReady) => {
        warn!("Engine not ready for generation #{}, deferring", seq);
        self.engine_ready = false;
        self.force_next = true;
        self.last_error = Some(SynthesisError::EngineNotReady);
        Completion::Deferred
      }
      Err(err) => {
        warn!("Generation #{} failed: {}", seq, err);
        if seq > self.published_seq {
          self.last_error = Some(err);
        }
        Completion::Failed
      }
    }
  }

  /// Makes the next evaluation eligible regardless of the fingerprint.
  pub fn force_regenerate(&mut self) {
    debug!("Forcing regeneration");
    self.force_next = true;
  }

  pub fn set_engine_ready(&mut self) {
    info!("Synthesis engine ready");
    self.engine_ready = true;
    if self.last_error == Some(SynthesisError::EngineNotReady) {
      self.last_error = None;
    }
  }

  pub fn set_engine_unavailable(&mut self, error: SynthesisError) {
    warn!("Synthesis engine unavailable: {}", error);
    self.engine_ready = false;
    self.last_error = Some(error);
  }

  pub fn is_engine_ready(&self) -> bool {
    self.engine_ready
  }

  pub fn state(&self) -> PipelineState {
    if !self.in_flight.is_empty() {
      PipelineState::Generating
    } else if self.settling.is_pending() || self.is_eligible(Fingerprint::of(&self.parameters())) {
      PipelineState::PendingRegeneration
    } else {
      PipelineState::Idle
    }
  }

  /// Whether the live settling inputs differ from the settled ones.
  pub fn has_pending_changes(&self) -> bool {
    self.settling.is_pending()
  }

  /// When the pending settling inputs become usable.
  pub fn settle_deadline(&self) -> Option<Instant> {
    self.settling.deadline()
  }

  pub fn current(&self) -> Option<&AudioResource> {
    self.current.as_ref()
  }

  pub fn last_error(&self) -> Option<&SynthesisError> {
    self.last_error.as_ref()
  }

  pub fn host(&self) -> &H {
    &self.host
  }

  /// Parameters combining the immediate notes with the settled inputs.
  pub fn parameters(&self) -> SynthesisParameters {
    let settled = self.settling.settled();
    SynthesisParameters {
      curve_y: settled.curve_y,
      bpm: settled.bpm,
      notes: self.notes.clone(),
      sample_rate: settled.sample_rate,
    }
  }

  fn is_eligible(&self, fingerprint: Fingerprint) -> bool {
    self.force_next || self.last_initiated != Some(fingerprint)
  }
}

impl<H: ResourceHost> Drop for Pipeline<H> {
  fn drop(&mut self) {
    if let Some(current) = self.current.take() {
      self.host.release(current.handle());
    }
  }
}

#[cfg(test)]
mod test {

  use std::time::{Duration, Instant};

  use super::{Completion, Observation, Pipeline, PipelineState, SettlingParams};
  use crate::synth::engine::{EngineNote, SynthesisError};
  use crate::synth::resource::ObjectUrls;

  const DELAY: Duration = Duration::from_millis(500);

  fn note(amplitude: f64) -> EngineNote {
    EngineNote {
      pitch: 9,
      octave: 4,
      beats: 1.0,
      amplitude,
    }
  }

  fn observation(notes: Vec<EngineNote>, bpm: u32) -> Observation {
    Observation {
      notes,
      settling: SettlingParams {
        bpm,
        sample_rate: 44100,
        curve_y: [0.0, 0.5, -0.5, 0.0],
      },
    }
  }

  fn ready_pipeline() -> Pipeline<ObjectUrls> {
    let mut pipeline = Pipeline::new(ObjectUrls::new(), observation(vec![note(1.0)], 120), DELAY);
    pipeline.set_engine_ready();
    pipeline
  }

  #[test]
  /// The first evaluation always generates
  pub fn pipeline_first_run() {
    let t0 = Instant::now();
    let mut pipeline = ready_pipeline();
    assert_eq!(pipeline.state(), PipelineState::PendingRegeneration);

    let request = pipeline.poll(t0).unwrap();
    assert_eq!(request.seq, 1);
    assert_eq!(request.parameters.bpm, 120);
    assert_eq!(request.parameters.notes, vec![note(1.0)]);
    assert_eq!(pipeline.state(), PipelineState::Generating);

    assert_eq!(pipeline.complete(1, Ok(vec![1, 2, 3])), Completion::Published);
    assert_eq!(pipeline.state(), PipelineState::Idle);
    assert_eq!(pipeline.current().unwrap().bytes(), &[1, 2, 3]);
    assert_eq!(pipeline.current().unwrap().fingerprint(), request.fingerprint);
  }

  #[test]
  /// Identical settled states never reach the engine twice
  pub fn pipeline_deduplicates() {
    let t0 = Instant::now();
    let mut pipeline = ready_pipeline();
    let request = pipeline.poll(t0).unwrap();
    pipeline.complete(request.seq, Ok(vec![0]));

    // bpm goes away and comes back before settling
    pipeline.observe(observation(vec![note(1.0)], 90), t0);
    pipeline.observe(observation(vec![note(1.0)], 120), t0 + Duration::from_millis(100));
    assert!(pipeline.poll(t0 + Duration::from_secs(2)).is_none());

    // settles to a value equal to the last generation
    pipeline.observe(observation(vec![note(1.0)], 90), t0 + Duration::from_secs(3));
    pipeline.observe(observation(vec![note(1.0)], 120), t0 + Duration::from_secs(4));
    assert!(pipeline.poll(t0 + Duration::from_secs(5)).is_none());
    assert!(pipeline.poll(t0 + Duration::from_secs(6)).is_none());
    assert_eq!(pipeline.state(), PipelineState::Idle);
  }

  #[test]
  /// Note changes act immediately and once
  pub fn pipeline_note_change_triggers_once() {
    let t0 = Instant::now();
    let mut pipeline = ready_pipeline();
    let first = pipeline.poll(t0).unwrap();
    pipeline.complete(first.seq, Ok(vec![0]));

    pipeline.observe(observation(vec![note(0.999)], 120), t0);
    let second = pipeline.poll(t0).unwrap();
    assert_eq!(second.seq, 2);
    assert_ne!(second.fingerprint, first.fingerprint);
    assert!(pipeline.poll(t0).is_none());
    assert!(pipeline.poll(t0 + Duration::from_secs(1)).is_none());
  }

  #[test]
  /// Settling inputs wait for the delay before generating
  pub fn pipeline_settles_inputs() {
    let t0 = Instant::now();
    let mut pipeline = ready_pipeline();
    let first = pipeline.poll(t0).unwrap();
    pipeline.complete(first.seq, Ok(vec![0]));

    pipeline.observe(observation(vec![note(1.0)], 130), t0);
    assert!(pipeline.has_pending_changes());
    assert_eq!(pipeline.state(), PipelineState::PendingRegeneration);
    assert_eq!(pipeline.settle_deadline(), Some(t0 + DELAY));
    assert!(pipeline.poll(t0 + Duration::from_millis(100)).is_none());

    pipeline.observe(observation(vec![note(1.0)], 140), t0 + Duration::from_millis(200));
    assert!(pipeline.poll(t0 + Duration::from_millis(600)).is_none());

    let request = pipeline.poll(t0 + Duration::from_millis(700)).unwrap();
    assert_eq!(request.parameters.bpm, 140);
    assert!(!pipeline.has_pending_changes());
  }

  #[test]
  /// Pending settling inputs don't hold back note changes
  pub fn pipeline_notes_use_settled_values() {
    let t0 = Instant::now();
    let mut pipeline = ready_pipeline();
    let first = pipeline.poll(t0).unwrap();
    pipeline.complete(first.seq, Ok(vec![0]));

    pipeline.observe(observation(vec![note(0.5)], 200), t0);
    let request = pipeline.poll(t0).unwrap();
    assert_eq!(request.parameters.bpm, 120);
    assert_eq!(request.parameters.notes, vec![note(0.5)]);
    assert!(pipeline.has_pending_changes());
  }

  #[test]
  /// Requests wait for the engine instead of being dropped
  pub fn pipeline_waits_for_engine() {
    let t0 = Instant::now();
    let mut pipeline = Pipeline::new(ObjectUrls::new(), observation(vec![], 120), DELAY);
    assert!(pipeline.poll(t0).is_none());
    assert_eq!(pipeline.last_error(), Some(&SynthesisError::EngineNotReady));
    assert_eq!(pipeline.state(), PipelineState::PendingRegeneration);

    pipeline.set_engine_ready();
    assert_eq!(pipeline.last_error(), None);
    let request = pipeline.poll(t0).unwrap();
    assert!(request.parameters.notes.is_empty());
  }

  #[test]
  pub fn pipeline_engine_not_ready_on_completion() {
    let t0 = Instant::now();
    let mut pipeline = ready_pipeline();
    let request = pipeline.poll(t0).unwrap();
    assert_eq!(
      pipeline.complete(request.seq, Err(SynthesisError::EngineNotReady)),
      Completion::Deferred
    );
    assert!(!pipeline.is_engine_ready());
    assert!(pipeline.poll(t0).is_none());

    pipeline.set_engine_ready();
    let retry = pipeline.poll(t0).unwrap();
    assert_eq!(retry.fingerprint, request.fingerprint);
  }

  #[test]
  /// A superseded request hitting an unready engine is not retried
  pub fn pipeline_engine_not_ready_after_newer_publish() {
    let t0 = Instant::now();
    let mut pipeline = ready_pipeline();
    let first = pipeline.poll(t0).unwrap();
    pipeline.observe(observation(vec![note(0.3)], 120), t0);
    let second = pipeline.poll(t0).unwrap();

    assert_eq!(pipeline.complete(second.seq, Ok(vec![2])), Completion::Published);
    assert_eq!(
      pipeline.complete(first.seq, Err(SynthesisError::EngineNotReady)),
      Completion::Stale
    );
    assert!(!pipeline.is_engine_ready());
    assert_eq!(pipeline.last_error(), None);

    pipeline.set_engine_ready();
    assert!(pipeline.poll(t0).is_none());
    assert_eq!(pipeline.state(), PipelineState::Idle);
    assert_eq!(pipeline.current().unwrap().seq(), second.seq);
  }

  #[test]
  pub fn pipeline_engine_unavailable_keeps_error() {
    let t0 = Instant::now();
    let mut pipeline = Pipeline::new(ObjectUrls::new(), observation(vec![], 120), DELAY);
    let failure = SynthesisError::EngineFailure {
      cause: "no module".into(),
    };
    pipeline.set_engine_unavailable(failure.clone());
    assert!(pipeline.poll(t0).is_none());
    assert_eq!(pipeline.last_error(), Some(&failure));
  }

  #[test]
  /// Forcing bypasses deduplication exactly once
  pub fn pipeline_force_regenerate() {
    let t0 = Instant::now();
    let mut pipeline = ready_pipeline();
    let first = pipeline.poll(t0).unwrap();
    pipeline.complete(first.seq, Ok(vec![0]));

    pipeline.force_regenerate();
    let forced = pipeline.poll(t0).unwrap();
    assert_eq!(forced.fingerprint, first.fingerprint);
    assert!(pipeline.poll(t0).is_none());

    assert_eq!(pipeline.complete(forced.seq, Ok(vec![1])), Completion::Published);
    assert_eq!(pipeline.current().unwrap().seq(), forced.seq);
  }

  #[test]
  /// Only the latest published resource stays alive
  pub fn pipeline_single_resource() {
    let t0 = Instant::now();
    let mut pipeline = ready_pipeline();
    let mut handles = Vec::new();
    for step in 0..5u8 {
      pipeline.observe(observation(vec![note(f64::from(step) / 10.0)], 120), t0);
      let request = pipeline.poll(t0).unwrap();
      pipeline.complete(request.seq, Ok(vec![step]));
      handles.push(pipeline.current().unwrap().handle().clone());
    }

    assert_eq!(pipeline.host().live_count(), 1);
    let (last, released) = handles.split_last().unwrap();
    assert!(pipeline.host().resolve(last).is_some());
    for handle in released {
      assert!(pipeline.host().resolve(handle).is_none());
    }
  }

  #[test]
  /// The latest initiated request wins over older results arriving late
  pub fn pipeline_drops_stale_results() {
    let t0 = Instant::now();
    let mut pipeline = ready_pipeline();
    let first = pipeline.poll(t0).unwrap();

    pipeline.observe(observation(vec![note(0.3)], 120), t0);
    let second = pipeline.poll(t0).unwrap();
    assert_eq!(pipeline.state(), PipelineState::Generating);

    assert_eq!(pipeline.complete(second.seq, Ok(vec![2])), Completion::Published);
    assert_eq!(pipeline.state(), PipelineState::Generating);
    assert_eq!(pipeline.complete(first.seq, Ok(vec![1])), Completion::Stale);

    assert_eq!(pipeline.state(), PipelineState::Idle);
    assert_eq!(pipeline.current().unwrap().bytes(), &[2]);
    assert_eq!(pipeline.host().live_count(), 1);
  }

  #[test]
  pub fn pipeline_in_order_results_both_publish() {
    let t0 = Instant::now();
    let mut pipeline = ready_pipeline();
    let first = pipeline.poll(t0).unwrap();
    pipeline.observe(observation(vec![note(0.3)], 120), t0);
    let second = pipeline.poll(t0).unwrap();

    assert_eq!(pipeline.complete(first.seq, Ok(vec![1])), Completion::Published);
    assert_eq!(pipeline.complete(second.seq, Ok(vec![2])), Completion::Published);
    assert_eq!(pipeline.current().unwrap().bytes(), &[2]);
    assert_eq!(pipeline.host().live_count(), 1);
  }

  #[test]
  /// A failed generation keeps the previous audio and is not retried
  pub fn pipeline_failure_keeps_previous() {
    let t0 = Instant::now();
    let mut pipeline = ready_pipeline();
    let first = pipeline.poll(t0).unwrap();
    pipeline.complete(first.seq, Ok(vec![1]));
    let handle = pipeline.current().unwrap().handle().clone();

    pipeline.observe(observation(vec![note(0.2)], 120), t0);
    let second = pipeline.poll(t0).unwrap();
    let failure = SynthesisError::EngineFailure {
      cause: "boom".into(),
    };
    assert_eq!(pipeline.complete(second.seq, Err(failure.clone())), Completion::Failed);

    assert_eq!(pipeline.last_error(), Some(&failure));
    assert_eq!(pipeline.current().unwrap().handle(), &handle);
    assert_eq!(pipeline.state(), PipelineState::Idle);
    assert!(pipeline.poll(t0 + Duration::from_secs(1)).is_none());

    // the next change is eligible again and clears the error once published
    pipeline.observe(observation(vec![note(0.4)], 120), t0);
    let third = pipeline.poll(t0).unwrap();
    pipeline.complete(third.seq, Ok(vec![3]));
    assert_eq!(pipeline.last_error(), None);
  }

  #[test]
  pub fn pipeline_unknown_completion() {
    let mut pipeline = ready_pipeline();
    assert_eq!(pipeline.complete(42, Ok(vec![1])), Completion::Stale);
    assert!(pipeline.current().is_none());
    assert_eq!(pipeline.host().live_count(), 0);
  }
}
