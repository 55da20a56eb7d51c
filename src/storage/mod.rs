// src/storage/mod.rs
use std::fs;
use std::path::{Path, PathBuf};

use crate::edgar::models::FilingMetadata;
use crate::pipeline::RunReport;
use crate::utils::error::StorageError;

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self {
            base_dir: base_path,
        })
    }

    /// Where the downloaded filing document lands for this company.
    pub fn document_path(&self, ticker: &str, metadata: &FilingMetadata) -> PathBuf {
        self.base_dir.join(metadata.output_filename(ticker, "html"))
    }

    /// Where the rendered PDF lands for this company.
    pub fn pdf_path(&self, ticker: &str, metadata: &FilingMetadata) -> PathBuf {
        self.base_dir.join(metadata.output_filename(ticker, "pdf"))
    }

    /// Writes the document body, overwriting any previous download.
    pub fn write_document(&self, path: &Path, body: &[u8]) -> Result<(), StorageError> {
        fs::write(path, body).map_err(StorageError::IoError)?;
        tracing::debug!("Saved HTML: {}", path.display());
        Ok(())
    }

    /// Saves the per-company stage summary in JSON format
    pub fn write_run_report(&self, report: &RunReport) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join("run_report.json");

        let payload = serde_json::json!({
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "companies": report.companies,
        });

        let payload_str = serde_json::to_string_pretty(&payload)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        fs::write(&file_path, payload_str).map_err(StorageError::IoError)?;

        tracing::info!("Saved run report to {}", file_path.display());

        Ok(file_path)
    }
}
