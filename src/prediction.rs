//! Prediction error taxonomy and response shaping.

use serde_json::{Map, Value};

use crate::worker::SpawnError;

/// Every way a prediction can fail. Each variant maps onto exactly one HTTP
/// response; the mapping lives in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    /// The `text` field was missing, not a string, or empty after trimming.
    /// The worker is never started for these.
    #[error("Invalid input: text is required and must be a non-empty string")]
    InvalidInput,

    /// Process creation itself failed (executable missing, permissions,
    /// resource exhaustion). Distinct from the worker running and failing.
    #[error("Prediction failed (subprocess error): {0}")]
    SpawnFailure(#[source] std::io::Error),

    /// The worker ran and exited non-zero. Carries whatever it wrote to
    /// stderr for diagnosis.
    #[error("Prediction failed (exit code {code})")]
    WorkerExitedNonZero { code: i32, stderr: String },

    /// The worker exited 0 but its stdout was not a single JSON object.
    #[error("Failed to parse prediction result: {error}")]
    ParseFailure { error: String, raw: String },

    /// The worker exited 0 and produced valid JSON that itself reports an
    /// error. Only the embedded message is surfaced.
    #[error("{0}")]
    ResultError(String),

    /// The worker outlived the configured window and was terminated.
    #[error("Prediction timeout - process took too long")]
    Timeout,
}

impl From<SpawnError> for PredictionError {
    fn from(err: SpawnError) -> Self {
        match err {
            SpawnError::Spawn(source) => PredictionError::SpawnFailure(source),
        }
    }
}

/// Attach response metadata to a successful worker result.
///
/// Worker-produced fields pass through unmodified; only the `timestamp` and
/// `success` keys are added.
pub fn augment_success(mut result: Map<String, Value>) -> Value {
    result.insert(
        "timestamp".to_string(),
        Value::String(chrono::Utc::now().to_rfc3339()),
    );
    result.insert("success".to_string(), Value::Bool(true));
    Value::Object(result)
}
