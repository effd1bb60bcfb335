//! Worker invocation: launch configuration, spawning, and output draining.
//!
//! The worker is an opaque collaborator: `<program> <script> <text>` that
//! writes one JSON object to stdout and exits 0, or writes diagnostics to
//! stderr and exits non-zero.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

/// How a prediction worker is launched.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Executable, e.g. `python3`.
    pub program: String,
    /// Script path passed as the first argument.
    pub script: PathBuf,
    /// Working directory for the worker, if different from ours.
    pub working_dir: Option<PathBuf>,
    /// How long a single prediction may run before being terminated.
    pub predict_timeout: Duration,
}

impl WorkerConfig {
    pub fn new(program: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            script: script.into(),
            working_dir: None,
            predict_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_predict_timeout(mut self, timeout: Duration) -> Self {
        self.predict_timeout = timeout;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("failed to spawn worker process: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Extension point for different worker launch strategies.
///
/// Also the seam a pooled long-lived worker model would plug into, and how
/// tests assert that invalid input never reaches a spawn.
pub trait WorkerSpawner: Send + Sync {
    fn spawn(&self, config: &WorkerConfig, text: &str) -> Result<Child, SpawnError>;
}

/// Default spawner: one process per request with piped output channels.
pub struct ScriptSpawner;

impl WorkerSpawner for ScriptSpawner {
    fn spawn(&self, config: &WorkerConfig, text: &str) -> Result<Child, SpawnError> {
        let mut command = Command::new(&config.program);
        command
            .arg(&config.script)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // If the handling task is dropped mid-flight (client disconnect),
            // the child must not be left running.
            .kill_on_drop(true);
        if let Some(dir) = &config.working_dir {
            command.current_dir(dir);
        }
        Ok(command.spawn()?)
    }
}

/// Drain one output channel into a lossless buffer, chunk by chunk, for the
/// lifetime of the process.
///
/// Runs concurrently with the process; reading only after exit would deadlock
/// a worker that fills its pipe buffer.
pub fn drain<R>(mut reader: R) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => buffer.extend_from_slice(&chunk[..n]),
            }
        }
        buffer
    })
}
