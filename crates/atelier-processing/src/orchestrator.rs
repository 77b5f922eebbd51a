//! Parallel derivation orchestrator
//!
//! Runs the category-specific derivation sub-tasks for one asset
//! concurrently and settles all of them: a failing or panicking sub-task
//! contributes a warning and omits its artifact, and never aborts siblings.
//! Retries are not the orchestrator's concern.

use atelier_core::models::ArtifactKind;
use futures::future::BoxFuture;

/// Derived bytes awaiting a storage write.
#[derive(Debug)]
pub struct PendingArtifact {
    pub kind: ArtifactKind,
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub extension: String,
}

/// A sub-task yields an artifact, nothing (legitimately skipped), or an error.
pub type SubtaskFuture = BoxFuture<'static, anyhow::Result<Option<PendingArtifact>>>;

/// A named derivation sub-task. The name appears in warnings.
pub struct Subtask {
    pub name: &'static str,
    pub future: SubtaskFuture,
}

impl Subtask {
    pub fn new(name: &'static str, future: SubtaskFuture) -> Self {
        Self { name, future }
    }
}

/// Execute all sub-tasks concurrently and collect artifacts and warnings.
///
/// Sub-tasks are spawned so a panic is confined to its own task and reduced
/// to a warning.
pub async fn settle_all(subtasks: Vec<Subtask>) -> (Vec<PendingArtifact>, Vec<String>) {
    let mut handles = Vec::with_capacity(subtasks.len());
    for subtask in subtasks {
        handles.push((subtask.name, tokio::spawn(subtask.future)));
    }

    let mut artifacts = Vec::new();
    let mut warnings = Vec::new();

    for (name, handle) in handles {
        match handle.await {
            Ok(Ok(Some(artifact))) => artifacts.push(artifact),
            Ok(Ok(None)) => {}
            Ok(Err(e)) => {
                tracing::warn!(subtask = name, error = %e, "Derivation sub-task failed");
                warnings.push(format!("{}: {}", name, e));
            }
            Err(join_err) => {
                tracing::warn!(subtask = name, error = %join_err, "Derivation sub-task panicked");
                warnings.push(format!("{}: task aborted", name));
            }
        }
    }

    (artifacts, warnings)
}
