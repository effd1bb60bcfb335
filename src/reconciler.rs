//! Outcome reconciliation: race worker completion against the timeout and
//! classify every possible worker outcome exactly once.
//!
//! The priority order is fixed: a spawn failure short-circuits everything; a
//! timeout beats a later natural exit; a non-zero exit beats whatever was
//! written to stdout; only a clean exit has its output parsed.

use std::time::Duration;

use serde_json::{Map, Value};
use tokio::process::Child;
use tracing::{debug, warn};

use crate::prediction::PredictionError;
use crate::worker::drain;

/// Run a spawned worker to its single terminal outcome.
///
/// Returning exactly one `Result` is what makes the at-most-one-response
/// guarantee structural: a timed-out worker's later natural exit happens in a
/// detached reaper task and can never produce a second outcome.
pub async fn reconcile(
    mut child: Child,
    timeout: Duration,
) -> Result<Map<String, Value>, PredictionError> {
    // Both channels are drained while the process runs; a full pipe buffer
    // would otherwise deadlock the worker.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(status) => status.map_err(PredictionError::SpawnFailure)?,
        Err(_elapsed) => {
            warn!(timeout_secs = timeout.as_secs_f64(), "worker timed out, terminating");
            terminate(&mut child);
            // Reap off the request path so the worker never lingers as a
            // zombie. Its eventual exit status is ignored; the drain tasks
            // wind down on their own once the pipes close.
            tokio::spawn(async move {
                let _ = child.wait().await;
            });
            return Err(PredictionError::Timeout);
        }
    };

    let stdout = collect(stdout).await;
    let stderr = collect(stderr).await;

    if !status.success() {
        // Killed-by-signal has no code on unix; surface it as -1.
        let code = status.code().unwrap_or(-1);
        return Err(PredictionError::WorkerExitedNonZero {
            code,
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        });
    }

    debug!(stdout_bytes = stdout.len(), "worker exited cleanly");
    parse_output(&stdout)
}

/// Parse the accumulated stdout of a cleanly-exited worker.
fn parse_output(stdout: &[u8]) -> Result<Map<String, Value>, PredictionError> {
    let raw = String::from_utf8_lossy(stdout);
    let trimmed = raw.trim();

    let value: Value =
        serde_json::from_str(trimmed).map_err(|e| PredictionError::ParseFailure {
            error: e.to_string(),
            raw: trimmed.to_string(),
        })?;

    let map = match value {
        Value::Object(map) => map,
        _ => {
            return Err(PredictionError::ParseFailure {
                error: "worker output is not a JSON object".to_string(),
                raw: trimmed.to_string(),
            });
        }
    };

    // The worker can report a logical failure despite a clean exit.
    if let Some(embedded) = map.get("error")
        && !embedded.is_null()
    {
        let message = embedded
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| embedded.to_string());
        return Err(PredictionError::ResultError(message));
    }

    Ok(map)
}

async fn collect(handle: Option<tokio::task::JoinHandle<Vec<u8>>>) -> Vec<u8> {
    match handle {
        Some(handle) => handle.await.unwrap_or_default(),
        None => Vec::new(),
    }
}

/// Ask the worker to stop, gracefully. Idempotent: signalling a process that
/// has already exited is a no-op.
#[cfg(unix)]
fn terminate(child: &mut Child) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    // No graceful signal to send on this platform.
    let _ = child.start_kill();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::{ScriptSpawner, WorkerConfig, WorkerSpawner};
    use std::io::Write;
    use std::time::Instant;

    /// Write a throwaway shell script standing in for the real worker.
    fn fake_worker(body: &str) -> (tempfile::TempDir, WorkerConfig) {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("predict.sh");
        let mut file = std::fs::File::create(&script).unwrap();
        writeln!(file, "#!/bin/sh").unwrap();
        writeln!(file, "{body}").unwrap();
        let config = WorkerConfig::new("sh", script).with_predict_timeout(Duration::from_secs(5));
        (dir, config)
    }

    async fn run(config: &WorkerConfig, text: &str) -> Result<Map<String, Value>, PredictionError> {
        let child = ScriptSpawner.spawn(config, text).unwrap();
        reconcile(child, config.predict_timeout).await
    }

    #[tokio::test]
    async fn clean_exit_with_json_succeeds() {
        let (_dir, config) = fake_worker(
            r#"echo '{"predicted_emotion":"joy","probabilities":{"joy":0.9,"sadness":0.1}}'"#,
        );
        let result = run(&config, "what a day").await.unwrap();
        assert_eq!(result["predicted_emotion"], "joy");
        assert_eq!(result["probabilities"]["joy"], 0.9);
    }

    #[tokio::test]
    async fn output_surrounded_by_whitespace_still_parses() {
        let (_dir, config) = fake_worker(r#"printf '\n  {"predicted_emotion":"fear"}  \n'"#);
        let result = run(&config, "x").await.unwrap();
        assert_eq!(result["predicted_emotion"], "fear");
    }

    #[tokio::test]
    async fn non_zero_exit_carries_stderr_and_code() {
        let (_dir, config) = fake_worker(r#"echo 'model not loaded' >&2; exit 1"#);
        let err = run(&config, "x").await.unwrap_err();
        match err {
            PredictionError::WorkerExitedNonZero { code, stderr } => {
                assert_eq!(code, 1);
                assert_eq!(stderr.trim(), "model not loaded");
            }
            other => panic!("expected WorkerExitedNonZero, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_zero_exit_wins_over_valid_stdout() {
        let (_dir, config) =
            fake_worker(r#"echo '{"predicted_emotion":"joy"}'; echo 'boom' >&2; exit 3"#);
        let err = run(&config, "x").await.unwrap_err();
        assert!(matches!(
            err,
            PredictionError::WorkerExitedNonZero { code: 3, .. }
        ));
    }

    #[tokio::test]
    async fn malformed_output_is_parse_failure_with_raw_text() {
        let (_dir, config) = fake_worker("echo 'not json'");
        let err = run(&config, "x").await.unwrap_err();
        match err {
            PredictionError::ParseFailure { raw, .. } => assert_eq!(raw, "not json"),
            other => panic!("expected ParseFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_object_output_is_parse_failure() {
        let (_dir, config) = fake_worker(r#"echo '"joy"'"#);
        let err = run(&config, "x").await.unwrap_err();
        assert!(matches!(err, PredictionError::ParseFailure { .. }));
    }

    #[tokio::test]
    async fn embedded_error_field_is_result_error() {
        let (_dir, config) = fake_worker(r#"echo '{"error":"Model not loaded"}'"#);
        let err = run(&config, "x").await.unwrap_err();
        match err {
            PredictionError::ResultError(message) => assert_eq!(message, "Model not loaded"),
            other => panic!("expected ResultError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn null_error_field_is_not_a_failure() {
        let (_dir, config) = fake_worker(r#"echo '{"predicted_emotion":"joy","error":null}'"#);
        let result = run(&config, "x").await.unwrap();
        assert_eq!(result["predicted_emotion"], "joy");
    }

    #[tokio::test]
    async fn hung_worker_times_out_within_bounded_margin() {
        let (_dir, config) = fake_worker("sleep 30");
        let config = config.with_predict_timeout(Duration::from_millis(200));

        let started = Instant::now();
        let err = run(&config, "x").await.unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, PredictionError::Timeout));
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timed_out_worker_is_terminated() {
        let (_dir, config) = fake_worker("sleep 30");
        let config = config.with_predict_timeout(Duration::from_millis(100));

        let child = ScriptSpawner.spawn(&config, "x").unwrap();
        let pid = child.id().unwrap() as i32;

        let err = reconcile(child, config.predict_timeout).await.unwrap_err();
        assert!(matches!(err, PredictionError::Timeout));

        // Give the detached reaper a moment, then verify no lingering process.
        tokio::time::sleep(Duration::from_millis(300)).await;
        let alive = nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), None).is_ok();
        assert!(!alive, "worker process {pid} still running after timeout");
    }

    #[tokio::test]
    async fn large_output_is_collected_losslessly() {
        // Well past any pipe buffer, to prove stdout is drained concurrently.
        let (_dir, config) = fake_worker(
            r#"awk 'BEGIN { printf "{\"predicted_emotion\":\"joy\",\"filler\":\""; for (i = 0; i < 200000; i++) printf "x"; printf "\"}" }'"#,
        );
        let result = run(&config, "x").await.unwrap();
        assert_eq!(result["filler"].as_str().unwrap().len(), 200_000);
    }
}
