pub mod engine;
pub mod fingerprint;
pub mod pipeline;
pub mod resource;
pub mod settle;
pub mod worker;

pub use self::engine::{EngineNote, SynthesisEngine, SynthesisError, SynthesisParameters};
pub use self::fingerprint::Fingerprint;
pub use self::pipeline::{Completion, GenerationRequest, Observation, Pipeline, PipelineState, SettlingParams};
pub use self::resource::{AudioResource, ObjectUrls, ResourceHandle, ResourceHost};
pub use self::worker::{Event, Orchestrator, Worker, WorkerError};
