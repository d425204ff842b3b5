//! Per-job workspace management.
//!
//! Every compile job gets a fresh, uniquely named directory tree under the
//! scratch root. Concurrent jobs never share a path, so no locking is needed
//! for filesystem isolation. The tree must not outlive the request: removal
//! runs on every exit path and removal failures are logged, never raised,
//! so a leaked directory cannot mask the job's real outcome.

use std::path::PathBuf;

use firmforge_common::config::ServiceConfig;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

/// Directory holding the sketch source. The toolchain requires the primary
/// source file to carry the same base name as its directory.
pub const SKETCH_DIR: &str = "sketch";
/// Fixed file name of the primary translation unit.
pub const SKETCH_FILE: &str = "sketch.ino";
/// Directory the toolchain writes build products into.
pub const OUTPUT_DIR: &str = "build";

/// One compile attempt's isolated directory tree.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub root: PathBuf,
    pub sketch_dir: PathBuf,
    pub sketch_path: PathBuf,
    pub output_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create workspace directory {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write sketch source to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Allocate a fresh workspace: `<scratch>/firmforge-<uuid>/{sketch,build}`.
pub async fn create(cfg: &ServiceConfig) -> Result<Job, WorkspaceError> {
    let id = Uuid::new_v4();
    let root = cfg.scratch_root.join(format!("firmforge-{}", id));
    let sketch_dir = root.join(SKETCH_DIR);
    let output_dir = root.join(OUTPUT_DIR);

    for dir in [&sketch_dir, &output_dir] {
        fs::create_dir_all(dir).await.map_err(|e| WorkspaceError::Create {
            path: dir.clone(),
            source: e,
        })?;
    }

    let sketch_path = sketch_dir.join(SKETCH_FILE);
    debug!(job_id = %id, root = %root.display(), "Workspace created");

    Ok(Job {
        id,
        root,
        sketch_dir,
        sketch_path,
        output_dir,
    })
}

/// Write the submitted source verbatim into the job's sketch file.
pub async fn write_source(job: &Job, code: &str) -> Result<(), WorkspaceError> {
    fs::write(&job.sketch_path, code)
        .await
        .map_err(|e| WorkspaceError::Write {
            path: job.sketch_path.clone(),
            source: e,
        })
}

/// Check for a specific build product by name under the job's output
/// directory. No recursion, no fuzzy matching.
pub async fn locate_artifact(job: &Job, file_name: &str) -> Option<PathBuf> {
    let candidate = job.output_dir.join(file_name);
    match fs::metadata(&candidate).await {
        Ok(meta) if meta.is_file() => Some(candidate),
        _ => None,
    }
}

/// Best-effort recursive removal of the job's entire tree.
pub async fn destroy(job: &Job) {
    if let Err(e) = fs::remove_dir_all(&job.root).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(
                job_id = %job.id,
                path = %job.root.display(),
                error = %e,
                "Failed to remove workspace"
            );
        }
    }
}

/// Workspace cleanup guard.
///
/// The orchestrator calls `close()` once the job reaches a terminal state.
/// If the guard is dropped without `close()` (panic, task cancellation) the
/// removal is spawned onto the runtime instead, so the tree is still
/// reclaimed.
pub struct WorkspaceGuard {
    job: Job,
    armed: bool,
}

impl WorkspaceGuard {
    pub fn new(job: Job) -> Self {
        Self { job, armed: true }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    /// Remove the workspace now and disarm the drop path.
    pub async fn close(mut self) {
        self.armed = false;
        destroy(&self.job).await;
    }
}

impl Drop for WorkspaceGuard {
    fn drop(&mut self) {
        if self.armed {
            let job = self.job.clone();
            tokio::spawn(async move {
                destroy(&job).await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config(scratch: &TempDir) -> ServiceConfig {
        ServiceConfig {
            scratch_root: scratch.path().to_path_buf(),
            ..ServiceConfig::default()
        }
    }

    #[tokio::test]
    async fn create_builds_sketch_and_output_dirs() {
        let scratch = TempDir::new().unwrap();
        let job = create(&test_config(&scratch)).await.unwrap();

        assert!(job.sketch_dir.is_dir());
        assert!(job.output_dir.is_dir());
        assert!(job.root.starts_with(scratch.path()));
        assert_eq!(
            job.sketch_path.file_name(),
            Some(std::ffi::OsStr::new(SKETCH_FILE))
        );
    }

    #[tokio::test]
    async fn concurrent_jobs_never_collide() {
        let scratch = TempDir::new().unwrap();
        let cfg = test_config(&scratch);
        let a = create(&cfg).await.unwrap();
        let b = create(&cfg).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_ne!(a.root, b.root);
        assert!(a.root.is_dir());
        assert!(b.root.is_dir());
    }

    #[tokio::test]
    async fn write_source_is_verbatim() {
        let scratch = TempDir::new().unwrap();
        let job = create(&test_config(&scratch)).await.unwrap();
        let code = "void setup() {}\nvoid loop() {}\n";

        write_source(&job, code).await.unwrap();

        let on_disk = tokio::fs::read_to_string(&job.sketch_path).await.unwrap();
        assert_eq!(on_disk, code);
    }

    #[tokio::test]
    async fn locate_artifact_requires_exact_name() {
        let scratch = TempDir::new().unwrap();
        let job = create(&test_config(&scratch)).await.unwrap();

        assert!(locate_artifact(&job, "sketch.ino.hex").await.is_none());

        tokio::fs::write(job.output_dir.join("sketch.ino.hex"), ":00000001FF\n")
            .await
            .unwrap();

        assert!(locate_artifact(&job, "sketch.ino.hex").await.is_some());
        assert!(locate_artifact(&job, "sketch.ino.elf").await.is_none());
    }

    #[tokio::test]
    async fn destroy_removes_the_whole_tree() {
        let scratch = TempDir::new().unwrap();
        let job = create(&test_config(&scratch)).await.unwrap();
        write_source(&job, "void setup() {}").await.unwrap();

        destroy(&job).await;

        assert!(!job.root.exists());
    }

    #[tokio::test]
    async fn destroy_of_missing_tree_is_silent() {
        let scratch = TempDir::new().unwrap();
        let job = create(&test_config(&scratch)).await.unwrap();
        destroy(&job).await;
        // Second removal must not panic or error.
        destroy(&job).await;
    }

    #[tokio::test]
    async fn guard_close_removes_workspace() {
        let scratch = TempDir::new().unwrap();
        let job = create(&test_config(&scratch)).await.unwrap();
        let root = job.root.clone();

        let guard = WorkspaceGuard::new(job);
        guard.close().await;

        assert!(!root.exists());
    }

    #[tokio::test]
    async fn guard_drop_spawns_removal() {
        let scratch = TempDir::new().unwrap();
        let job = create(&test_config(&scratch)).await.unwrap();
        let root = job.root.clone();

        drop(WorkspaceGuard::new(job));

        // Removal runs on a spawned task; poll briefly for it to land.
        for _ in 0..50 {
            if !root.exists() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        panic!("workspace still present after guard drop");
    }
}
