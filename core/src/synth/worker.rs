use std::thread;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use failure::Fail;
use log::{debug, info};

use crate::song::Song;
use crate::synth::engine::{SynthesisEngine, SynthesisError};
use crate::synth::pipeline::{GenerationRequest, Pipeline};
use crate::synth::resource::ResourceHost;

#[derive(Debug, Fail)]
pub enum WorkerError {
  #[fail(display = "Failed to create the synthesis thread: {}", cause)]
  Start { cause: String },

  #[fail(display = "Failed to join the synthesis thread")]
  Stop,

  #[fail(display = "The synthesis thread is gone")]
  Disconnected,
}

pub enum Protocol {
  Stop,

  Generate(GenerationRequest),
}

#[derive(Debug)]
pub enum Event {
  EngineInitialised,

  EngineUnavailable { error: SynthesisError },

  Generated {
    seq: u64,
    result: Result<Vec<u8>, SynthesisError>,
  },
}

struct WorkerThread {
  engine: Box<dyn SynthesisEngine>,
  events_tx: Sender<Event>,
}

impl WorkerThread {
  fn new(engine: Box<dyn SynthesisEngine>, events_tx: Sender<Event>) -> WorkerThread {
    WorkerThread { engine, events_tx }
  }

  pub fn handle_messages(&mut self, protocol_rx: Receiver<Protocol>) {
    let ready = match self.engine.initialise() {
      Ok(()) => {
        drop(self.events_tx.send(Event::EngineInitialised));
        true
      }
      Err(err) => {
        drop(self.events_tx.send(Event::EngineUnavailable { error: err }));
        false
      }
    };

    for msg in protocol_rx.iter() {
      match msg {
        Protocol::Stop => break,

        Protocol::Generate(request) => {
          debug!("Synthesizing #{}", request.seq);
          let result = if ready {
            self.engine.synthesize(&request.parameters)
          } else {
            Err(SynthesisError::EngineNotReady)
          };
          drop(self.events_tx.send(Event::Generated {
            seq: request.seq,
            result,
          }));
        }
      }
    }
  }
}

/// Runs the synthesis engine on its own thread.
pub struct Worker {
  handler: JoinHandle<()>,
  protocol_tx: Sender<Protocol>,
  events_rx: Receiver<Event>,
}

impl Worker {
  pub const CHANNEL_CAPACITY: usize = 1024;

  pub fn new(engine: Box<dyn SynthesisEngine>) -> Result<Worker, WorkerError> {
    info!("Starting synthesis Worker ...");

    let (protocol_tx, protocol_rx) = crossbeam_channel::bounded::<Protocol>(Self::CHANNEL_CAPACITY);
    let (events_tx, events_rx) = crossbeam_channel::unbounded::<Event>();

    thread::Builder::new()
      .name("synthesis".into())
      .spawn(move || WorkerThread::new(engine, events_tx).handle_messages(protocol_rx))
      .map_err(|err| WorkerError::Start {
        cause: err.to_string(),
      })
      .map(|handler| Worker {
        handler,
        protocol_tx,
        events_rx,
      })
  }

  pub fn submit(&self, request: GenerationRequest) -> Result<(), WorkerError> {
    self
      .protocol_tx
      .send(Protocol::Generate(request))
      .map_err(|_| WorkerError::Disconnected)
  }

  pub fn events(&self) -> &Receiver<Event> {
    &self.events_rx
  }

  pub fn stop(self) -> Result<(), WorkerError> {
    info!("Stopping synthesis Worker ...");

    self
      .protocol_tx
      .send(Protocol::Stop)
      .map_err(|_| WorkerError::Stop)
      .and_then(|()| self.handler.join().map_err(|_| WorkerError::Stop))
  }
}

/// Feeds a song into the pipeline and the pipeline requests into the worker.
pub struct Orchestrator<H: ResourceHost> {
  pipeline: Pipeline<H>,
  worker: Worker,
}

impl<H: ResourceHost> Orchestrator<H> {
  pub fn new(
    song: &Song,
    host: H,
    engine: Box<dyn SynthesisEngine>,
    settle_delay: Duration,
  ) -> Result<Orchestrator<H>, WorkerError> {
    let pipeline = Pipeline::new(host, song.observation(), settle_delay);
    let worker = Worker::new(engine)?;
    Ok(Orchestrator { pipeline, worker })
  }

  pub fn pipeline(&self) -> &Pipeline<H> {
    &self.pipeline
  }

  /// Handles pending worker events, then looks at the song as it is `now`.
  pub fn tick(&mut self, song: &Song, now: Instant) -> Result<(), WorkerError> {
    loop {
      match self.worker.events().try_recv() {
        Ok(event) => self.handle_event(event),
        Err(TryRecvError::Empty) => break,
        Err(TryRecvError::Disconnected) => return Err(WorkerError::Disconnected),
      }
    }
    self.pipeline.observe(song.observation(), now);
    self.dispatch(now).map(|_| ())
  }

  /// Blocks until the worker reports something or pending settling inputs
  /// become usable, whichever comes first.
  ///
  /// Returns false when the timeout elapsed without any progress.
  pub fn wait_event(&mut self, timeout: Duration) -> Result<bool, WorkerError> {
    let now = Instant::now();
    let timeout = match self.pipeline.settle_deadline() {
      Some(deadline) => timeout.min(deadline.saturating_duration_since(now)),
      None => timeout,
    };

    match self.worker.events().recv_timeout(timeout) {
      Ok(event) => {
        self.handle_event(event);
        self.dispatch(Instant::now())?;
        Ok(true)
      }
      Err(RecvTimeoutError::Timeout) => self.dispatch(Instant::now()),
      Err(RecvTimeoutError::Disconnected) => Err(WorkerError::Disconnected),
    }
  }

  pub fn force_regenerate(&mut self, now: Instant) -> Result<(), WorkerError> {
    self.pipeline.force_regenerate();
    self.dispatch(now).map(|_| ())
  }

  pub fn stop(self) -> Result<(), WorkerError> {
    self.worker.stop()
  }

  /// Submits the generation the pipeline asks for, if any.
  fn dispatch(&mut self, now: Instant) -> Result<bool, WorkerError> {
    match self.pipeline.poll(now) {
      Some(request) => self.worker.submit(request).map(|()| true),
      None => Ok(false),
    }
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::EngineInitialised => self.pipeline.set_engine_ready(),
      Event::EngineUnavailable { error } => self.pipeline.set_engine_unavailable(error),
      Event::Generated { seq, result } => {
        let completion = self.pipeline.complete(seq, result);
        debug!("Generation #{} completed as {:?}", seq, completion);
      }
    }
  }
}
