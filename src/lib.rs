//! emolet: HTTP prediction server for the emotion detection worker.

mod emotions;
mod input_validation;
mod prediction;
mod reconciler;
mod service;

pub mod transport;
pub mod worker;

pub use emotions::EMOTION_LABELS;
pub use prediction::{PredictionError, augment_success};
pub use service::PredictionService;
pub use transport::{ServerConfig, serve};
pub use worker::{ScriptSpawner, SpawnError, WorkerConfig, WorkerSpawner};
