use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportbindError {
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Preference store error: {0}")]
    PreferenceStore(#[from] PreferenceStoreError),

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Failed to open archive '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive '{path}' is not a readable ZIP: {message}")]
    Unreadable { path: PathBuf, message: String },

    #[error("Failed to extract archive to '{path}': {message}")]
    Extract { path: PathBuf, message: String },

    #[error("No Word documents found in the archive")]
    NoDocuments,

    #[error("Extracted file missing: {0}")]
    MissingFile(PathBuf),
}

#[derive(Error, Debug)]
pub enum PreferenceStoreError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write preferences to '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize preferences: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Failed to read document '{path}': {source}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to process DOCX: {0}")]
    DocxProcessing(String),

    #[error("Failed to process PDF: {0}")]
    PdfProcessing(String),

    #[error("Converter backend failed for '{path}': {message}")]
    Backend { path: PathBuf, message: String },

    #[error("Failed to merge PDFs: {0}")]
    Merge(String),
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Email configuration is incomplete")]
    NotConfigured,

    #[error("Failed to read attachment '{path}': {source}")]
    ReadAttachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to send email: {0}")]
    SendFailed(String),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,

    #[error("Job failed: {0}")]
    JobFailed(String),
}

pub type Result<T> = std::result::Result<T, ReportbindError>;
