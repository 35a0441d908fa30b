use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::suite::{ModelId, TestCase};

/// Separator for flattening the expected-result list into one CSV column.
const EXPECTED_SEPARATOR: &str = "|";

/// One row of the results file. Built once per (model, test, image) triple
/// and written immediately; never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct ResultRecord {
    pub timestamp: String,
    pub model: String,
    pub test_description: String,
    pub image_path: String,
    pub prompt: String,
    pub output: String,
    pub expected_result: String,
    pub check: bool,
}

impl ResultRecord {
    pub fn completed(
        model: &ModelId,
        test: &TestCase,
        image_path: &Path,
        prompt: &str,
        output: &str,
        check: bool,
    ) -> Self {
        Self {
            timestamp: now_timestamp(),
            model: model.0.clone(),
            test_description: test.test_description.clone(),
            image_path: image_path.display().to_string(),
            prompt: prompt.to_string(),
            output: output.to_string(),
            expected_result: test.expected_result.join(EXPECTED_SEPARATOR),
            check,
        }
    }

    /// Record for a failed iteration: the error message lands in the output
    /// column and the check is false.
    pub fn degraded(
        model: &ModelId,
        test_description: &str,
        image_path: Option<&Path>,
        error: &anyhow::Error,
    ) -> Self {
        Self {
            timestamp: now_timestamp(),
            model: model.0.clone(),
            test_description: test_description.to_string(),
            image_path: image_path
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            prompt: String::new(),
            output: format!("Error: {:#}", error),
            expected_result: String::new(),
            check: false,
        }
    }
}

fn now_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Append-only CSV reporter. The header is written only when the file does
/// not exist at open time; repeated runs keep appending rows under the
/// original header.
pub struct CsvReporter {
    path: PathBuf,
}

impl CsvReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&mut self, record: &ResultRecord) -> Result<()> {
        let file_exists = self.path.exists();

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open results file: {}", self.path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(!file_exists)
            .from_writer(file);

        writer
            .serialize(record)
            .context("Failed to serialize result record")?;
        writer.flush().context("Failed to flush results file")?;

        debug!("Appended result row to {}", self.path.display());
        Ok(())
    }
}
