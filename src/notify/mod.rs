//! Candidate notification hand-off
//!
//! After a job is committed the engine hands a [`JobNotice`] to a
//! [`NotificationDispatcher`]. Delivery (SMS gateway, push) happens outside the
//! engine; a failed hand-off is logged and never reverses the fee debit.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::engine::models::{Job, Urgency};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Dispatch failed: {0}")]
    DispatchFailed(String),
}

pub type Result<T> = std::result::Result<T, NotifyError>;

/// What candidates need to hear about a freshly posted job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobNotice {
    pub job_id: String,
    pub employer_id: String,
    pub job_type: String,
    pub location: String,
    pub urgency: Urgency,
    pub candidates: Vec<String>,
}

impl From<&Job> for JobNotice {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            employer_id: job.employer_id.clone(),
            job_type: job.job_type.clone(),
            location: job.location.clone(),
            urgency: job.urgency,
            candidates: job.selected_candidates.clone(),
        }
    }
}

/// Queues candidate notifications; returns once the notice is accepted, not delivered
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, notice: JobNotice) -> Result<()>;
}

/// Dispatcher that only records the hand-off in the log
#[derive(Debug, Clone, Default)]
pub struct LogDispatcher;

impl LogDispatcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn dispatch(&self, notice: JobNotice) -> Result<()> {
        tracing::info!(
            job_id = %notice.job_id,
            recipients = notice.candidates.len(),
            urgency = ?notice.urgency,
            "Notification queued"
        );
        Ok(())
    }
}
