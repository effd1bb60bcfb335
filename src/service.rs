//! Prediction service: the request gate, worker invoker, and outcome
//! reconciler behind one handle shared by the transport layer.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::input_validation::validate_text;
use crate::prediction::PredictionError;
use crate::reconciler::reconcile;
use crate::worker::{ScriptSpawner, WorkerConfig, WorkerSpawner};

pub struct PredictionService {
    config: WorkerConfig,
    spawner: Arc<dyn WorkerSpawner>,
}

impl PredictionService {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config,
            spawner: Arc::new(ScriptSpawner),
        }
    }

    /// Replace the spawner. Test seam; production wiring is unchanged.
    pub fn with_spawner(mut self, spawner: Arc<dyn WorkerSpawner>) -> Self {
        self.spawner = spawner;
        self
    }

    pub fn worker_config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Run one prediction end to end: validate, spawn, reconcile.
    ///
    /// Everything owned by this call (process handle, output buffers) is
    /// released by the time it returns; no state survives across requests.
    pub async fn predict(
        &self,
        body: Option<&Value>,
    ) -> Result<Map<String, Value>, PredictionError> {
        let text = validate_text(body)?;
        debug!(chars = text.len(), "starting prediction worker");
        let child = self.spawner.spawn(&self.config, &text)?;
        reconcile(child, self.config.predict_timeout).await
    }
}
