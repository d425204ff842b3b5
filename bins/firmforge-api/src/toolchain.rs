//! External toolchain invocation.
//!
//! The compiler binary is executed by direct argument-vector spawn, never
//! through a shell: the sketch source is caller-controlled and must not be
//! able to influence the command line. Output capture is bounded and the
//! whole invocation runs under a hard wall-clock timeout, with the
//! subprocess killed on expiry.

use std::process::Stdio;
use std::time::{Duration, Instant};

use firmforge_common::config::ServiceConfig;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Capture ceiling per stream. A pathological build cannot grow the
/// diagnostic blob past twice this.
pub const MAX_CAPTURE_BYTES: u64 = 16 * 1024 * 1024;

/// Terminal result of one toolchain run that actually exited.
///
/// Both zero and non-zero exits land here; a failed compile is an expected
/// outcome, not an invocation error.
#[derive(Debug)]
pub struct ToolchainOutcome {
    /// stdout followed by stderr, lossily decoded.
    pub combined_output: String,
    pub exit_succeeded: bool,
}

#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("toolchain binary not found at {path}")]
    NotFound { path: String },
    #[error("toolchain did not exit within {}s", .budget.as_secs())]
    Timeout { budget: Duration },
    #[error("toolchain i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run the configured toolchain binary with `args`.
///
/// When the shared toolchain config file exists on disk it is injected as a
/// leading `--config-file <path>` pair so every invocation resolves the same
/// data directory; when absent the arguments pass through unmodified.
pub async fn invoke(
    cfg: &ServiceConfig,
    args: &[String],
    timeout: Duration,
) -> Result<ToolchainOutcome, ToolchainError> {
    let mut argv: Vec<String> = Vec::with_capacity(args.len() + 2);
    if cfg.toolchain_config.exists() {
        argv.push("--config-file".to_string());
        argv.push(cfg.toolchain_config.display().to_string());
    }
    argv.extend_from_slice(args);

    debug!(
        binary = %cfg.toolchain_path.display(),
        args = ?argv,
        timeout_secs = timeout.as_secs(),
        "Invoking toolchain"
    );

    let mut child = Command::new(&cfg.toolchain_path)
        .args(&argv)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ToolchainError::NotFound {
                path: cfg.toolchain_path.display().to_string(),
            },
            _ => ToolchainError::Io(e),
        })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "child stdout not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "child stderr not piped"))?;

    let started = Instant::now();

    let capture = async {
        let mut out_buf = Vec::new();
        let mut err_buf = Vec::new();
        let mut out_take = stdout.take(MAX_CAPTURE_BYTES);
        let mut err_take = stderr.take(MAX_CAPTURE_BYTES);
        let (out_res, err_res) = tokio::join!(
            out_take.read_to_end(&mut out_buf),
            err_take.read_to_end(&mut err_buf),
        );
        out_res?;
        err_res?;
        let status = child.wait().await?;
        Ok::<_, std::io::Error>((status, out_buf, err_buf))
    };

    // capture borrows the child; it must be dropped before the kill below
    let captured = tokio::time::timeout(timeout, capture).await;

    match captured {
        Ok(Ok((status, out_buf, err_buf))) => {
            let mut combined = String::from_utf8_lossy(&out_buf).into_owned();
            combined.push_str(&String::from_utf8_lossy(&err_buf));
            debug!(
                exit_code = ?status.code(),
                output_bytes = combined.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Toolchain exited"
            );
            Ok(ToolchainOutcome {
                combined_output: combined,
                exit_succeeded: status.success(),
            })
        }
        Ok(Err(e)) => Err(ToolchainError::Io(e)),
        Err(_) => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "Toolchain exceeded wall-clock budget; killing subprocess"
            );
            if let Err(e) = child.kill().await {
                warn!(error = %e, "Failed to kill timed-out toolchain process");
            }
            Err(ToolchainError::Timeout { budget: timeout })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config_with(binary: &str) -> ServiceConfig {
        ServiceConfig {
            toolchain_path: PathBuf::from(binary),
            // Point at a path that never exists so no --config-file pair is
            // injected unless a test sets one up.
            toolchain_config: PathBuf::from("/nonexistent/toolchain-config.yaml"),
            ..ServiceConfig::default()
        }
    }

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn captures_stdout_on_success() {
        let cfg = config_with("/bin/echo");
        let outcome = invoke(&cfg, &args(&["hello", "world"]), Duration::from_secs(5))
            .await
            .unwrap();

        assert!(outcome.exit_succeeded);
        assert!(outcome.combined_output.contains("hello world"));
    }

    #[tokio::test]
    async fn combined_output_is_stdout_then_stderr() {
        let cfg = config_with("/bin/sh");
        let outcome = invoke(
            &cfg,
            &args(&["-c", "echo first-out; echo second-err 1>&2"]),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        let out_pos = outcome.combined_output.find("first-out").unwrap();
        let err_pos = outcome.combined_output.find("second-err").unwrap();
        assert!(out_pos < err_pos);
    }

    #[tokio::test]
    async fn nonzero_exit_is_an_outcome_not_an_error() {
        let cfg = config_with("/bin/sh");
        let outcome = invoke(
            &cfg,
            &args(&["-c", "echo boom 1>&2; exit 1"]),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert!(!outcome.exit_succeeded);
        assert!(outcome.combined_output.contains("boom"));
    }

    #[tokio::test]
    async fn missing_binary_is_classified() {
        let cfg = config_with("/nonexistent/arduino-cli");
        let err = invoke(&cfg, &args(&["version"]), Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolchainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn timeout_kills_and_reports_promptly() {
        let cfg = config_with("/bin/sleep");
        let started = Instant::now();
        let err = invoke(&cfg, &args(&["5"]), Duration::from_millis(100))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolchainError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn config_file_is_injected_when_present() {
        let dir = tempfile::TempDir::new().unwrap();
        let config_file = dir.path().join("arduino-cli.yaml");
        std::fs::write(&config_file, "directories:\n  data: /tmp\n").unwrap();

        let cfg = ServiceConfig {
            toolchain_path: PathBuf::from("/bin/echo"),
            toolchain_config: config_file.clone(),
            ..ServiceConfig::default()
        };

        // echo prints its argv, so the injected pair is observable.
        let outcome = invoke(&cfg, &args(&["compile"]), Duration::from_secs(5))
            .await
            .unwrap();

        assert!(outcome.combined_output.starts_with("--config-file"));
        assert!(outcome
            .combined_output
            .contains(&config_file.display().to_string()));
    }
}
