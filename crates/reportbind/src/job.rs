//! In-memory job status tracking for batch assembly runs.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Overall status of an assembly job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "Queued"),
            JobStatus::Processing => write!(f, "Processing"),
            JobStatus::Completed => write!(f, "Completed"),
            JobStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// Per-document conversion status, keyed by display name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    Pending,
    Converting,
    Done,
    Failed,
}

/// Outcome of the optional email delivery step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Skipped,
    Sent,
    Failed,
}

/// Snapshot of one job's progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobState {
    /// Unique job identifier.
    pub job_id: String,
    /// Current status.
    pub status: JobStatus,
    /// Human-readable message describing current activity.
    pub message: String,
    /// When the job was queued.
    pub started_at: DateTime<Utc>,
    /// Last state change.
    pub updated_at: DateTime<Utc>,
    /// When the job finished (if it did).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Documents converted so far. Never exceeds `progress_total`.
    pub progress_done: usize,
    /// Documents in the batch.
    pub progress_total: usize,
    /// Resolved report number label, e.g. "3".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_number: Option<String>,
    /// Path of the merged PDF (set on completion).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_pdf: Option<String>,
    /// Email delivery outcome (set after the merge step).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_delivery: Option<DeliveryStatus>,
    /// Error message (if failed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Display names in conversion order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conversion_order: Vec<String>,
    /// Per-document conversion status, keyed by display name. An
    /// [`IndexMap`] so serialized output lists documents in batch order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub conversion_statuses: IndexMap<String, ConversionStatus>,
    /// Whether per-document progress should be surfaced yet.
    #[serde(default)]
    pub show_conversion_progress: bool,
}

impl JobState {
    fn new(job_id: &str, message: &str) -> Self {
        let now = Utc::now();
        Self {
            job_id: job_id.to_string(),
            status: JobStatus::Queued,
            message: message.to_string(),
            started_at: now,
            updated_at: now,
            completed_at: None,
            progress_done: 0,
            progress_total: 0,
            report_number: None,
            merged_pdf: None,
            email_delivery: None,
            error: None,
            conversion_order: Vec::new(),
            conversion_statuses: IndexMap::new(),
            show_conversion_progress: false,
        }
    }

    /// Returns true if this job is finished (completed or failed).
    pub fn is_finished(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Partial update applied to a job; unset fields keep their value.
#[derive(Debug, Default, Clone)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub message: Option<String>,
    pub progress_done: Option<usize>,
    pub progress_total: Option<usize>,
    pub report_number: Option<String>,
    pub merged_pdf: Option<String>,
    pub email_delivery: Option<DeliveryStatus>,
    pub error: Option<String>,
}

impl JobUpdate {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn status(status: JobStatus, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Thread-safe registry of job states.
///
/// Workers update it, status queries read it. Uses `std::sync::RwLock`;
/// all operations are sub-millisecond.
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, JobState>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, JobState>> {
        match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, JobState>> {
        match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Registers a new queued job.
    pub fn create(&self, job_id: &str, message: &str) -> JobState {
        let state = JobState::new(job_id, message);
        self.write().insert(job_id.to_string(), state.clone());
        state
    }

    /// Applies a partial update; unknown job ids are logged and dropped.
    pub fn update(&self, job_id: &str, update: JobUpdate) {
        let mut jobs = self.write();
        let Some(job) = jobs.get_mut(job_id) else {
            log::warn!("Update for unknown job {} dropped", job_id);
            return;
        };

        if let Some(status) = update.status {
            if matches!(status, JobStatus::Completed | JobStatus::Failed) {
                job.completed_at = Some(Utc::now());
            }
            job.status = status;
        }
        if let Some(message) = update.message {
            job.message = message;
        }
        if let Some(total) = update.progress_total {
            job.progress_total = total;
        }
        if let Some(done) = update.progress_done {
            job.progress_done = done.min(job.progress_total);
        }
        if let Some(number) = update.report_number {
            job.report_number = Some(number);
        }
        if let Some(path) = update.merged_pdf {
            job.merged_pdf = Some(path);
        }
        if let Some(delivery) = update.email_delivery {
            job.email_delivery = Some(delivery);
        }
        if let Some(error) = update.error {
            job.error = Some(error);
        }
        job.updated_at = Utc::now();
    }

    /// Seeds the per-document progress table once the final conversion
    /// order is known. All documents start pending.
    pub fn init_conversion_progress(&self, job_id: &str, order: &[String]) {
        let mut jobs = self.write();
        let Some(job) = jobs.get_mut(job_id) else {
            log::warn!("Conversion progress init for unknown job {} dropped", job_id);
            return;
        };
        job.conversion_order = order.to_vec();
        job.conversion_statuses = order
            .iter()
            .map(|name| (name.clone(), ConversionStatus::Pending))
            .collect();
        job.progress_done = 0;
        job.progress_total = order.len();
        job.show_conversion_progress = true;
        job.updated_at = Utc::now();
    }

    /// Updates a single document's conversion status and recomputes the
    /// done counter from the table.
    pub fn set_conversion_status(&self, job_id: &str, document: &str, status: ConversionStatus) {
        let mut jobs = self.write();
        let Some(job) = jobs.get_mut(job_id) else {
            log::warn!("Conversion status for unknown job {} dropped", job_id);
            return;
        };
        match job.conversion_statuses.get_mut(document) {
            Some(entry) => *entry = status,
            None => {
                log::warn!(
                    "Conversion status for unknown document '{}' in job {} dropped",
                    document,
                    job_id
                );
                return;
            }
        }
        job.progress_done = job
            .conversion_statuses
            .values()
            .filter(|s| matches!(s, ConversionStatus::Done | ConversionStatus::Failed))
            .count()
            .min(job.progress_total);
        job.updated_at = Utc::now();
    }

    /// Returns a specific job by ID.
    pub fn get(&self, job_id: &str) -> Option<JobState> {
        self.read().get(job_id).cloned()
    }

    /// Returns all jobs sorted by started_at (newest first).
    pub fn get_all(&self) -> Vec<JobState> {
        let mut result: Vec<JobState> = self.read().values().cloned().collect();
        result.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        result
    }

    /// Removes a finished job from the registry.
    pub fn remove(&self, job_id: &str) -> Option<JobState> {
        self.write().remove(job_id)
    }

    /// Returns the count of jobs by status.
    pub fn counts(&self) -> (usize, usize, usize) {
        let jobs = self.read();
        let mut active = 0;
        let mut completed = 0;
        let mut failed = 0;
        for job in jobs.values() {
            match job.status {
                JobStatus::Queued | JobStatus::Processing => active += 1,
                JobStatus::Completed => completed += 1,
                JobStatus::Failed => failed += 1,
            }
        }
        (active, completed, failed)
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}
