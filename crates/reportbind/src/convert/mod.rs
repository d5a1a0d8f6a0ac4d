//! Word-to-PDF conversion backends and PDF merging.

pub mod libreoffice;
pub mod merge;
pub mod text_pdf;

use std::path::{Path, PathBuf};

use crate::error::ConversionError;

pub use libreoffice::LibreOfficeConverter;
pub use merge::merge_pdfs;
pub use text_pdf::TextPdfConverter;

/// Converts a single Word document to a PDF in `output_dir` and returns
/// the written path. Implementations must be callable from worker threads.
pub trait DocumentConverter: Send + Sync {
    fn convert(&self, source: &Path, output_dir: &Path) -> Result<PathBuf, ConversionError>;
}

/// The PDF filename for a converted document: same stem, `.pdf` extension.
pub(crate) fn pdf_output_path(source: &Path, output_dir: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    output_dir.join(format!("{stem}.pdf"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_output_path() {
        assert_eq!(
            pdf_output_path(
                Path::new("/work/R班/[R班] 第3回報告書 田中.docx"),
                Path::new("/work/pdf")
            ),
            PathBuf::from("/work/pdf/[R班] 第3回報告書 田中.pdf")
        );
    }
}
