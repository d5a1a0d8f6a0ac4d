pub mod archive;
pub mod config;
pub mod convert;
pub mod email;
pub mod error;
pub mod job;
pub mod logging;
pub mod naming;
pub mod order;
pub mod worker;

pub use archive::{extract_entries, infer_team_level, Entry};
pub use config::Config;
pub use convert::{merge_pdfs, DocumentConverter, LibreOfficeConverter, TextPdfConverter};
pub use email::EmailConfig;
pub use error::{
    ArchiveError, ConversionError, DeliveryError, PreferenceStoreError, ReportbindError, Result,
    WorkerError,
};
pub use job::{JobRegistry, JobState, JobStatus};
pub use naming::sanitize_report_filename;
pub use order::{OrderPreferences, OrderStore, TeamLayout};
pub use worker::{Job, JobResult, Pipeline, WorkerPool};
