//! The assembly pipeline: extract, order, convert, merge, deliver.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use log::{debug, info, warn};

use crate::archive::{apply_team_prefixes, extract_archive, extract_entries, Entry};
use crate::config::Config;
use crate::convert::{merge_pdfs, DocumentConverter};
use crate::email::EmailConfig;
use crate::error::{ConversionError, ReportbindError};
use crate::job::{ConversionStatus, DeliveryStatus, JobRegistry, JobStatus, JobUpdate};
use crate::naming::report::{determine_report_number, format_elapsed};
use crate::order::OrderStore;
use crate::worker::job::{Job, JobResult};

/// Runs one assembly job end to end. Shared across workers.
pub struct Pipeline {
    config: Arc<Config>,
    store: Arc<OrderStore>,
    registry: Arc<JobRegistry>,
    converter: Arc<dyn DocumentConverter>,
    email: Option<EmailConfig>,
}

impl Pipeline {
    pub fn new(
        config: Arc<Config>,
        store: Arc<OrderStore>,
        registry: Arc<JobRegistry>,
        converter: Arc<dyn DocumentConverter>,
        email: Option<EmailConfig>,
    ) -> Self {
        Self {
            config,
            store,
            registry,
            converter,
            email,
        }
    }

    pub fn run(&self, job: &Job) -> JobResult {
        let started = Instant::now();
        self.registry.update(
            &job.id,
            JobUpdate::status(JobStatus::Processing, "ZIPを展開しています..."),
        );

        let result = match self.assemble(job, started) {
            Ok(merged_pdf) => JobResult::success(job, merged_pdf),
            Err(error) => {
                let message = error.to_string();
                self.registry.update(
                    &job.id,
                    JobUpdate {
                        status: Some(JobStatus::Failed),
                        message: Some("処理に失敗しました".to_string()),
                        error: Some(message.clone()),
                        ..JobUpdate::default()
                    },
                );
                JobResult::failure(job, message)
            }
        };

        // The upload is consumed either way.
        if let Err(error) = fs::remove_file(&job.zip_path) {
            warn!(
                "Failed to remove processed upload {}: {}",
                job.zip_path.display(),
                error
            );
        }

        result
    }

    fn assemble(&self, job: &Job, started: Instant) -> Result<PathBuf, ReportbindError> {
        let mut entries =
            extract_entries(&job.zip_path, job.zip_original_name.as_deref())?;
        if entries.is_empty() {
            return Err(crate::error::ArchiveError::NoDocuments.into());
        }

        let extract_dir = self.config.work_dir.join(&job.id);
        extract_archive(&job.zip_path, &extract_dir)?;
        apply_team_prefixes(&extract_dir, entries.iter_mut())?;

        let ordered = self.resolve_order(entries, job.order.as_deref());
        let report_number =
            determine_report_number(job.zip_original_name.as_deref().unwrap_or(""), &ordered);
        info!(
            "Job {}: {} documents, report number {}",
            job.id,
            ordered.len(),
            report_number
        );

        let display_names: Vec<String> = ordered
            .iter()
            .map(|entry| entry.display_name.clone())
            .collect();
        self.registry.update(
            &job.id,
            JobUpdate {
                message: Some("PDFに変換しています...".to_string()),
                report_number: Some(report_number.clone()),
                ..JobUpdate::default()
            },
        );
        self.registry
            .init_conversion_progress(&job.id, &display_names);

        let pdf_dir = extract_dir.join("pdf");
        fs::create_dir_all(&pdf_dir).map_err(|source| ConversionError::ReadDocument {
            path: pdf_dir.clone(),
            source,
        })?;

        let converted = self.convert_all(job, &ordered, &extract_dir, &pdf_dir)?;

        self.registry
            .update(&job.id, JobUpdate::message("PDFを結合しています..."));
        let output_name = format!("第{report_number}回報告書.pdf");
        let merged_pdf = self.config.output_dir.join(output_name);
        merge_pdfs(&converted, &merged_pdf)?;

        let elapsed = format_elapsed(started.elapsed().as_secs_f64());
        self.registry.update(
            &job.id,
            JobUpdate {
                status: Some(JobStatus::Completed),
                message: Some(format!("処理が完了しました（{elapsed}）")),
                merged_pdf: Some(merged_pdf.display().to_string()),
                ..JobUpdate::default()
            },
        );

        self.deliver(job, &merged_pdf, &report_number);

        // Learned preferences update after a successful run; a write
        // failure must not fail the job.
        if let Err(error) = self.store.merge_from_final_order(&ordered) {
            warn!("Failed to persist order preferences: {}", error);
        }

        Ok(merged_pdf)
    }

    /// Flattens the learned layout, then rearranges it to the submitter's
    /// explicit order when one was given. Explicit names that match no
    /// entry are ignored; entries the explicit order omits keep their
    /// layout position at the end.
    fn resolve_order(&self, entries: Vec<Entry>, explicit: Option<&[String]>) -> Vec<Entry> {
        let mut ordered: Vec<Entry> = self
            .store
            .initial_layout(entries)
            .into_iter()
            .flat_map(|block| block.entries)
            .collect();

        if let Some(names) = explicit {
            let mut remaining = std::mem::take(&mut ordered);
            for name in names {
                if let Some(position) = remaining
                    .iter()
                    .position(|entry| entry.display_name == *name)
                {
                    ordered.push(remaining.remove(position));
                } else {
                    debug!("Explicit order names unknown document '{}'", name);
                }
            }
            ordered.append(&mut remaining);
        }

        ordered
    }

    /// Converts every document to PDF, in parallel, preserving batch
    /// order in the returned paths. Any single failure fails the batch.
    fn convert_all(
        &self,
        job: &Job,
        ordered: &[Entry],
        extract_dir: &std::path::Path,
        pdf_dir: &std::path::Path,
    ) -> Result<Vec<PathBuf>, ReportbindError> {
        let slots: Vec<Mutex<Option<Result<PathBuf, ConversionError>>>> =
            (0..ordered.len()).map(|_| Mutex::new(None)).collect();
        let next = AtomicUsize::new(0);
        let thread_count = self.config.worker_count.min(ordered.len()).max(1);

        std::thread::scope(|scope| {
            for _ in 0..thread_count {
                scope.spawn(|| loop {
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(entry) = ordered.get(index) else {
                        break;
                    };

                    self.registry.set_conversion_status(
                        &job.id,
                        &entry.display_name,
                        ConversionStatus::Converting,
                    );
                    let source = extract_dir.join(&entry.archive_path);
                    let outcome = self.converter.convert(&source, pdf_dir);
                    let status = if outcome.is_ok() {
                        ConversionStatus::Done
                    } else {
                        ConversionStatus::Failed
                    };
                    self.registry
                        .set_conversion_status(&job.id, &entry.display_name, status);

                    let mut slot = match slots[index].lock() {
                        Ok(guard) => guard,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    *slot = Some(outcome);
                });
            }
        });

        let mut converted = Vec::with_capacity(ordered.len());
        for (slot, entry) in slots.into_iter().zip(ordered) {
            let outcome = match slot.into_inner() {
                Ok(outcome) => outcome,
                Err(poisoned) => poisoned.into_inner(),
            };
            match outcome {
                Some(Ok(path)) => converted.push(path),
                Some(Err(error)) => return Err(error.into()),
                None => {
                    return Err(ConversionError::Backend {
                        path: PathBuf::from(&entry.archive_path),
                        message: "conversion did not run".to_string(),
                    }
                    .into())
                }
            }
        }
        Ok(converted)
    }

    /// Sends the merged PDF when a recipient and credentials are present.
    /// Delivery failure never fails the job.
    fn deliver(&self, job: &Job, merged_pdf: &std::path::Path, report_number: &str) {
        let recipient = job
            .recipient
            .as_deref()
            .or(self.config.recipient.as_deref());

        let status = match (recipient, &self.email) {
            (Some(recipient), Some(email)) if email.is_configured() => {
                let subject = format!("第{report_number}回報告書");
                let body = format!("第{report_number}回報告書を送付いたします。ご確認ください。");
                match email.send_with_attachment(recipient, &subject, &body, merged_pdf) {
                    Ok(()) => {
                        info!("Job {}: merged PDF sent to {}", job.id, recipient);
                        DeliveryStatus::Sent
                    }
                    Err(error) => {
                        warn!("Job {}: email delivery failed: {}", job.id, error);
                        DeliveryStatus::Failed
                    }
                }
            }
            _ => DeliveryStatus::Skipped,
        };

        self.registry.update(
            &job.id,
            JobUpdate {
                email_delivery: Some(status),
                ..JobUpdate::default()
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::TextPdfConverter;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn test_pipeline(temp: &TempDir) -> (Pipeline, Arc<JobRegistry>) {
        let config = Arc::new(Config {
            data_dir: temp.path().to_path_buf(),
            upload_dir: temp.path().join("uploads"),
            work_dir: temp.path().join("work"),
            output_dir: temp.path().join("output"),
            order_file: temp.path().join("order.json"),
            worker_count: 2,
            recipient: None,
        });
        config.ensure_directories().unwrap();

        let store = Arc::new(OrderStore::new(config.order_file.clone()));
        let registry = Arc::new(JobRegistry::new());
        let pipeline = Pipeline::new(
            Arc::clone(&config),
            store,
            Arc::clone(&registry),
            Arc::new(TextPdfConverter::new()),
            None,
        );
        (pipeline, registry)
    }

    fn write_docx(zip: &mut zip::ZipWriter<std::fs::File>, name: &str, text: &str) {
        let options = SimpleFileOptions::default();
        zip.start_file(name, options).unwrap();
        zip.write_all(minimal_docx(text).as_slice()).unwrap();
    }

    fn minimal_docx(text: &str) -> Vec<u8> {
        let mut buffer = std::io::Cursor::new(Vec::new());
        {
            let mut docx = zip::ZipWriter::new(&mut buffer);
            let options = SimpleFileOptions::default();
            docx.start_file("word/document.xml", options).unwrap();
            write!(
                docx,
                "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:body></w:document>",
                text
            )
            .unwrap();
            docx.finish().unwrap();
        }
        buffer.into_inner()
    }

    fn build_batch_zip(path: &std::path::Path) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        write_docx(&mut zip, "R班/第3回報告書 田中.docx", "田中の報告");
        write_docx(&mut zip, "R班/第3回報告書 鈴木.docx", "鈴木の報告");
        write_docx(&mut zip, "N班/第3回報告書 山田.docx", "山田の報告");
        zip.finish().unwrap();
    }

    #[test]
    fn test_run_full_batch() {
        let temp = TempDir::new().unwrap();
        let (pipeline, registry) = test_pipeline(&temp);

        let zip_path = temp.path().join("uploads").join("第3回報告書.zip");
        build_batch_zip(&zip_path);

        let job = Job::new(zip_path.clone()).with_original_name("第3回報告書.zip");
        registry.create(&job.id, "Queued");

        let result = pipeline.run(&job);
        assert!(result.success, "pipeline failed: {:?}", result.error);

        let merged = result.merged_pdf.unwrap();
        assert_eq!(
            merged.file_name().and_then(|n| n.to_str()),
            Some("第3回報告書.pdf")
        );
        assert!(merged.is_file());

        let state = registry.get(&job.id).unwrap();
        assert_eq!(state.status, JobStatus::Completed);
        assert_eq!(state.report_number.as_deref(), Some("3"));
        assert_eq!(state.progress_done, 3);
        assert_eq!(state.email_delivery, Some(DeliveryStatus::Skipped));

        // The upload is consumed.
        assert!(!zip_path.exists());
    }

    #[test]
    fn test_run_learns_preferences() {
        let temp = TempDir::new().unwrap();
        let (pipeline, registry) = test_pipeline(&temp);

        let zip_path = temp.path().join("uploads").join("batch.zip");
        build_batch_zip(&zip_path);

        let job = Job::new(zip_path)
            .with_original_name("第3回報告書.zip")
            .with_order(vec![
                "[N班] 第3回報告書 山田.docx".to_string(),
                "[R班] 第3回報告書 鈴木.docx".to_string(),
                "[R班] 第3回報告書 田中.docx".to_string(),
            ]);
        registry.create(&job.id, "Queued");

        let result = pipeline.run(&job);
        assert!(result.success, "pipeline failed: {:?}", result.error);

        let store = OrderStore::new(temp.path().join("order.json"));
        let prefs = store.load_preferences();
        assert_eq!(prefs.team_sequence, vec!["N班", "R班"]);
        assert_eq!(
            prefs.member_sequences["R班"],
            vec!["鈴木".to_string(), "田中".to_string()]
        );
    }

    #[test]
    fn test_run_bad_archive_fails() {
        let temp = TempDir::new().unwrap();
        let (pipeline, registry) = test_pipeline(&temp);

        let zip_path = temp.path().join("uploads").join("broken.zip");
        std::fs::write(&zip_path, b"not a zip").unwrap();

        let job = Job::new(zip_path);
        registry.create(&job.id, "Queued");

        let result = pipeline.run(&job);
        assert!(!result.success);

        let state = registry.get(&job.id).unwrap();
        assert_eq!(state.status, JobStatus::Failed);
        assert!(state.error.is_some());
    }

    #[test]
    fn test_resolve_order_ignores_unknown_names() {
        let temp = TempDir::new().unwrap();
        let (pipeline, _registry) = test_pipeline(&temp);

        let entries = vec![
            crate::archive::entries::test_entry("第3回報告書 田中.docx", Some("R班")),
            crate::archive::entries::test_entry("第3回報告書 鈴木.docx", Some("R班")),
        ];
        let explicit = vec![
            "[R班] 第3回報告書 鈴木.docx".to_string(),
            "ghost.docx".to_string(),
        ];
        let ordered = pipeline.resolve_order(entries, Some(&explicit));

        let names: Vec<&str> = ordered.iter().map(|e| e.display_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["[R班] 第3回報告書 鈴木.docx", "[R班] 第3回報告書 田中.docx"]
        );
    }
}
