//! LibreOffice-backed converter for full layout fidelity, including
//! legacy `.doc` files. Requires `soffice` on the host.

use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;

use crate::convert::{pdf_output_path, DocumentConverter};
use crate::error::ConversionError;

pub struct LibreOfficeConverter {
    soffice: PathBuf,
}

impl LibreOfficeConverter {
    /// Uses `soffice` from PATH.
    pub fn new() -> Self {
        Self::with_binary("soffice")
    }

    pub fn with_binary(soffice: impl Into<PathBuf>) -> Self {
        Self {
            soffice: soffice.into(),
        }
    }
}

impl Default for LibreOfficeConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentConverter for LibreOfficeConverter {
    fn convert(&self, source: &Path, output_dir: &Path) -> Result<PathBuf, ConversionError> {
        debug!("Converting {} via LibreOffice", source.display());

        let output = Command::new(&self.soffice)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(output_dir)
            .arg(source)
            .output()
            .map_err(|e| ConversionError::Backend {
                path: source.to_path_buf(),
                message: format!("failed to launch soffice: {}", e),
            })?;

        if !output.status.success() {
            return Err(ConversionError::Backend {
                path: source.to_path_buf(),
                message: format!(
                    "soffice exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let output_path = pdf_output_path(source, output_dir);
        if !output_path.is_file() {
            return Err(ConversionError::Backend {
                path: source.to_path_buf(),
                message: "soffice reported success but produced no PDF".to_string(),
            });
        }

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_binary_is_backend_error() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("report.docx");
        std::fs::write(&source, b"docx").unwrap();

        let converter = LibreOfficeConverter::with_binary("/nonexistent/soffice");
        let result = converter.convert(&source, temp.path());
        assert!(matches!(result, Err(ConversionError::Backend { .. })));
    }
}
