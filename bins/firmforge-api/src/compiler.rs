//! Compile-job orchestration.
//!
//! Composes the workspace manager, toolchain invoker, and diagnostics
//! extractor into the end-to-end lifecycle for one request: validate,
//! prepare the workspace, run the toolchain under the concurrency gate,
//! classify the result, and always tear the workspace down.

use firmforge_common::boards::BoardRegistry;
use firmforge_common::config::ServiceConfig;
use firmforge_common::types::{CompileRequest, SizeMetrics};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::diagnostics;
use crate::toolchain::{self, ToolchainError};
use crate::workspace::{self, Job, WorkspaceError, WorkspaceGuard};

/// Fixed name of the firmware image the toolchain is expected to emit into
/// the job's output directory.
pub const HEX_ARTIFACT: &str = "sketch.ino.hex";

/// Upper bound on submitted source size.
pub const MAX_SOURCE_BYTES: usize = 1024 * 1024;

/// Failures that are not a well-formed compile result.
///
/// `Validation` maps to a 400 response; everything else is an environment
/// fault and maps to a 500. An ordinary failed compile is *not* an error;
/// it is a `CompileOutcome::Failure`.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error("toolchain binary not found at {path}")]
    ToolchainMissing { path: String },
    #[error("internal error: {0}")]
    Internal(String),
}

/// Terminal result of a compile attempt that ran to completion.
#[derive(Debug)]
pub enum CompileOutcome {
    Success {
        hex: String,
        output: String,
        size: SizeMetrics,
    },
    /// Compile error, timeout, or a toolchain that claimed success without
    /// producing the artifact. Always reported as data, never as a transport
    /// error.
    Failure { error: String, output: String },
}

/// Run one compile job end to end.
///
/// Validation happens before any filesystem side effect: a rejected request
/// never creates a workspace. After that point the workspace guard ensures
/// the job tree is removed on every exit path.
pub async fn run(
    cfg: &ServiceConfig,
    boards: &BoardRegistry,
    gate: &Semaphore,
    request: CompileRequest,
) -> Result<CompileOutcome, CompileError> {
    let code = match request.code {
        Some(code) if !code.trim().is_empty() => code,
        _ => return Err(CompileError::Validation("Missing code parameter".to_string())),
    };
    let fqbn = match request.fqbn {
        Some(fqbn) if !fqbn.is_empty() => fqbn,
        _ => return Err(CompileError::Validation("Missing fqbn parameter".to_string())),
    };
    if boards.lookup(&fqbn).is_none() {
        return Err(CompileError::Validation(format!(
            "Unsupported board: {}. Supported: {}",
            fqbn,
            boards.supported_list()
        )));
    }
    if code.len() > MAX_SOURCE_BYTES {
        return Err(CompileError::Validation(format!(
            "Source code exceeds maximum size of {} bytes",
            MAX_SOURCE_BYTES
        )));
    }

    let job = workspace::create(cfg).await?;
    info!(
        job_id = %job.id,
        fqbn = %fqbn,
        source_bytes = code.len(),
        "Compile job started"
    );

    let guard = WorkspaceGuard::new(job);
    let result = attempt(cfg, guard.job(), &code, &fqbn, gate).await;
    guard.close().await;
    result
}

/// The compile attempt proper, from source write to outcome classification.
/// Runs with the workspace already provisioned; the caller owns cleanup.
async fn attempt(
    cfg: &ServiceConfig,
    job: &Job,
    code: &str,
    fqbn: &str,
    gate: &Semaphore,
) -> Result<CompileOutcome, CompileError> {
    workspace::write_source(job, code).await?;

    let args = vec![
        "compile".to_string(),
        "--fqbn".to_string(),
        fqbn.to_string(),
        "--output-dir".to_string(),
        job.output_dir.display().to_string(),
        job.sketch_dir.display().to_string(),
    ];

    let _permit = gate
        .acquire()
        .await
        .map_err(|_| CompileError::Internal("compile gate closed".to_string()))?;

    match toolchain::invoke(cfg, &args, cfg.compile_timeout).await {
        Ok(outcome) if outcome.exit_succeeded => {
            let Some(artifact) = workspace::locate_artifact(job, HEX_ARTIFACT).await else {
                warn!(
                    job_id = %job.id,
                    artifact = HEX_ARTIFACT,
                    "Toolchain reported success but produced no artifact"
                );
                return Ok(CompileOutcome::Failure {
                    error: format!(
                        "Compilation reported success but no {} artifact was produced",
                        HEX_ARTIFACT
                    ),
                    output: outcome.combined_output,
                });
            };

            let hex = tokio::fs::read_to_string(&artifact).await.map_err(|e| {
                CompileError::Internal(format!(
                    "failed to read artifact {}: {}",
                    artifact.display(),
                    e
                ))
            })?;

            let size = diagnostics::size_metrics(&outcome.combined_output);
            info!(
                job_id = %job.id,
                hex_bytes = hex.len(),
                flash = ?size.flash,
                ram = ?size.ram,
                "Compile succeeded"
            );

            Ok(CompileOutcome::Success {
                hex,
                output: outcome.combined_output,
                size,
            })
        }
        Ok(outcome) => {
            // Expected, common case: the sketch itself does not compile.
            let summary = diagnostics::error_summary(&outcome.combined_output);
            info!(job_id = %job.id, "Compile failed");
            Ok(CompileOutcome::Failure {
                error: summary,
                output: outcome.combined_output,
            })
        }
        Err(ToolchainError::Timeout { budget, .. }) => {
            warn!(job_id = %job.id, timeout_secs = budget.as_secs(), "Compile timed out");
            Ok(CompileOutcome::Failure {
                error: format!("Compilation timed out after {}s", budget.as_secs()),
                output: String::new(),
            })
        }
        Err(ToolchainError::NotFound { path }) => Err(CompileError::ToolchainMissing { path }),
        Err(ToolchainError::Io(e)) => Err(CompileError::Internal(format!(
            "toolchain invocation failed: {}",
            e
        ))),
    }
}
