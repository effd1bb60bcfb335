//! Binary entrypoint: environment configuration, tracing, serve.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use emolet::{PredictionService, ServerConfig, WorkerConfig, serve};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "emolet=info,tower_http=debug".into()),
        )
        .init();

    let program = std::env::var("EMOLET_WORKER_PROGRAM").unwrap_or_else(|_| "python3".to_string());
    let script = std::env::var("EMOLET_WORKER_SCRIPT")
        .unwrap_or_else(|_| "python_scripts/predict.py".to_string());

    let mut worker = WorkerConfig::new(program, script);
    if let Ok(dir) = std::env::var("EMOLET_WORKER_DIR") {
        worker = worker.with_working_dir(dir);
    }
    if let Ok(secs) = std::env::var("EMOLET_PREDICT_TIMEOUT_SECS") {
        let secs: u64 = secs
            .parse()
            .context("EMOLET_PREDICT_TIMEOUT_SECS must be a whole number of seconds")?;
        worker = worker.with_predict_timeout(Duration::from_secs(secs));
    }

    let server = ServerConfig {
        host: std::env::var("EMOLET_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
        port: std::env::var("PORT")
            .ok()
            .map(|p| p.parse().context("PORT must be a port number"))
            .transpose()?
            .unwrap_or(3000),
    };

    let service = Arc::new(PredictionService::new(worker));
    serve(server, service).await
}
