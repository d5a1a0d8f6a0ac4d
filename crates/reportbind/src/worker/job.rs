use std::path::PathBuf;

/// One queued assembly request: a ZIP of reports plus the submitter's
/// layout choices.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    /// The uploaded archive on disk.
    pub zip_path: PathBuf,
    /// Filename the archive was uploaded under, when known. Used as a
    /// team-name fallback and a report-number hint.
    pub zip_original_name: Option<String>,
    /// Final document order as display names, when the submitter arranged
    /// one. `None` means the learned layout decides.
    pub order: Option<Vec<String>>,
    /// Recipient for the merged PDF; delivery is skipped when absent.
    pub recipient: Option<String>,
}

impl Job {
    pub fn new(zip_path: PathBuf) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            zip_path,
            zip_original_name: None,
            order: None,
            recipient: None,
        }
    }

    pub fn with_original_name(mut self, name: impl Into<String>) -> Self {
        self.zip_original_name = Some(name.into());
        self
    }

    pub fn with_order(mut self, order: Vec<String>) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }
}

/// Parses the pipe-delimited order field submitted with an upload.
///
/// Empty and whitespace-only segments are dropped; an entirely empty
/// field means no explicit order.
pub fn parse_order_data(raw: &str) -> Option<Vec<String>> {
    let names: Vec<String> = raw
        .split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (!names.is_empty()).then_some(names)
}

#[derive(Debug)]
pub struct JobResult {
    pub job_id: String,
    pub success: bool,
    pub merged_pdf: Option<PathBuf>,
    pub error: Option<String>,
}

impl JobResult {
    pub fn success(job: &Job, merged_pdf: PathBuf) -> Self {
        Self {
            job_id: job.id.clone(),
            success: true,
            merged_pdf: Some(merged_pdf),
            error: None,
        }
    }

    pub fn failure(job: &Job, error: String) -> Self {
        Self {
            job_id: job.id.clone(),
            success: false,
            merged_pdf: None,
            error: Some(error),
        }
    }
}
