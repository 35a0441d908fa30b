use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Opaque identifier naming a model the backend knows how to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelId(pub String);

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One evaluation unit: a prompt run against every image in a directory,
/// passing when any expected substring shows up in the output.
#[derive(Debug, Clone, Deserialize)]
pub struct TestCase {
    pub test_description: String,
    pub prompt: String,
    pub image_directory: PathBuf,
    pub expected_result: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SystemPromptEntry {
    system_prompt: Option<String>,
}

/// Reads a newline-delimited model list. Blank lines and `#` comment lines
/// are dropped; order is preserved.
pub fn load_model_list(path: &Path) -> Result<Vec<ModelId>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read model list: {}", path.display()))?;

    let models: Vec<ModelId> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| ModelId(line.to_string()))
        .collect();

    info!("Loaded {} models from {}", models.len(), path.display());
    Ok(models)
}

/// Parses the JSON test suite. Entries whose description starts with `#`
/// are treated as commented out and skipped.
pub fn load_test_suite(path: &Path) -> Result<Vec<TestCase>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read test suite: {}", path.display()))?;

    let tests: Vec<TestCase> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid test suite JSON: {}", path.display()))?;

    let tests: Vec<TestCase> = tests
        .into_iter()
        .filter(|t| !t.test_description.trim().starts_with('#'))
        .collect();

    info!("Loaded {} test cases from {}", tests.len(), path.display());
    Ok(tests)
}

/// Extracts the `system_prompt` field from the first entry of a JSON array.
pub fn load_system_prompt(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read system prompt: {}", path.display()))?;

    let entries: Vec<SystemPromptEntry> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid system prompt JSON: {}", path.display()))?;

    entries
        .into_iter()
        .next()
        .and_then(|e| e.system_prompt)
        .with_context(|| {
            format!(
                "No system_prompt field in first entry of {}",
                path.display()
            )
        })
}
