// NeuroSuite - app/workflow.rs
//
// Upload/classify state machine shared by every analysis screen:
//
//   idle --select--> selected --submit--> submitting --ok--> done
//                                          submitting --fail--> error
//   selected | done | error --select--> selected
//   any --reset--> idle
//
// The network call itself is injected by the screen as a classify function,
// so the workflow knows nothing about endpoints or tokens.
//
// At most one submission is in flight per workflow. The lock is released
// while the classify function runs; a generation counter discards the
// outcome of a submission that was abandoned by `reset`.

use crate::core::model::{ClassificationResult, UploadFile};
use crate::core::validation;
use crate::util::error::{Result, ValidationError};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Where a task is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadStatus {
    #[default]
    Idle,
    Selected,
    Submitting,
    Done,
    Error,
}

/// Snapshot of one upload interaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadTask {
    pub status: UploadStatus,
    pub file: Option<UploadFile>,
    pub result: Option<ClassificationResult>,
    pub error_message: Option<String>,
    /// Set when the failure means "send the user to login".
    pub auth_failure: bool,
}

/// What `submit` did.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The classify function ran and succeeded.
    Done(ClassificationResult),
    /// Another submission was already in flight; nothing was sent.
    AlreadySubmitting,
    /// The task was reset while the call was in flight; its result was dropped.
    Discarded,
}

#[derive(Debug, Default)]
struct Inner {
    task: UploadTask,
    generation: u64,
}

/// One screen's upload task.
#[derive(Debug, Default)]
pub struct UploadWorkflow {
    inner: Mutex<Inner>,
}

impl UploadWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate `candidate` and make it the selected file.
    ///
    /// On failure the task is left exactly as it was.
    pub fn select_file(
        &self,
        candidate: Option<UploadFile>,
        allowed: &[&str],
        max_size: Option<u64>,
    ) -> std::result::Result<UploadFile, ValidationError> {
        let mut inner = self.inner();
        if inner.task.status == UploadStatus::Submitting {
            return Err(ValidationError::SubmissionInProgress);
        }

        if let Err(e) = validation::validate_upload(candidate.as_ref(), allowed, max_size) {
            tracing::debug!(error = %e, "Upload candidate rejected");
            return Err(e);
        }
        let Some(file) = candidate else {
            return Err(ValidationError::NoFile);
        };

        tracing::debug!(file = %file.name, size = file.size, "File selected");
        inner.generation += 1;
        inner.task = UploadTask {
            status: UploadStatus::Selected,
            file: Some(file.clone()),
            ..UploadTask::default()
        };
        Ok(file)
    }

    /// Run `classify` on the selected file.
    ///
    /// Requires a selected file; otherwise fails with
    /// `ValidationError::NothingSelected`. A call while another submission
    /// is in flight returns `AlreadySubmitting` without invoking `classify`.
    /// Failures of `classify` move the task to `Error` and are returned.
    pub async fn submit<F, Fut>(&self, classify: F) -> Result<SubmitOutcome>
    where
        F: FnOnce(UploadFile) -> Fut,
        Fut: Future<Output = Result<ClassificationResult>>,
    {
        let (file, generation) = {
            let mut inner = self.inner();
            match (inner.task.status, inner.task.file.clone()) {
                (UploadStatus::Submitting, _) => {
                    tracing::debug!("Submission already in flight; ignoring");
                    return Ok(SubmitOutcome::AlreadySubmitting);
                }
                (UploadStatus::Selected, Some(file)) => {
                    inner.task.status = UploadStatus::Submitting;
                    (file, inner.generation)
                }
                _ => return Err(ValidationError::NothingSelected.into()),
            }
        };

        tracing::info!(file = %file.name, "Submitting for analysis");
        let outcome = classify(file).await;

        let mut inner = self.inner();
        if inner.generation != generation {
            tracing::debug!("Task was reset during submission; dropping the outcome");
            return Ok(SubmitOutcome::Discarded);
        }

        match outcome {
            Ok(result) => {
                tracing::info!(kind = ?result.kind(), "Analysis complete");
                inner.task.status = UploadStatus::Done;
                inner.task.result = Some(result.clone());
                Ok(SubmitOutcome::Done(result))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Analysis failed");
                inner.task.status = UploadStatus::Error;
                inner.task.error_message = Some(e.to_string());
                inner.task.auth_failure = e.is_auth_failure();
                Err(e)
            }
        }
    }

    /// Back to idle, discarding file, result and error.
    pub fn reset(&self) {
        let mut inner = self.inner();
        inner.generation += 1;
        inner.task = UploadTask::default();
    }

    pub fn task(&self) -> UploadTask {
        self.inner().task.clone()
    }

    pub fn status(&self) -> UploadStatus {
        self.inner().task.status
    }

    pub fn result(&self) -> Option<ClassificationResult> {
        self.inner().task.result.clone()
    }

    pub fn error_message(&self) -> Option<String> {
        self.inner().task.error_message.clone()
    }
}

// =============================================================================
// Unit tests
// =============================================================================
