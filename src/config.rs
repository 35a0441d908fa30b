use clap::Parser;
use std::path::PathBuf;

const DEFAULT_MODELS_FILE: &str = "models.txt";
const DEFAULT_TESTS_FILE: &str = "tests.json";
const DEFAULT_SYSTEM_PROMPT_FILE: &str = "system_prompt.json";
const DEFAULT_OUTPUT_FILE: &str = "results.csv";
const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Run a suite of vision-language model tests and append results to a CSV.
#[derive(Debug, Parser)]
#[command(name = "vlm-harness", version)]
pub struct Config {
    /// Path to the model list (one identifier per line, `#` comments allowed)
    #[arg(long, default_value = DEFAULT_MODELS_FILE)]
    pub models: PathBuf,

    /// Path to the JSON test suite
    #[arg(long, default_value = DEFAULT_TESTS_FILE)]
    pub tests: PathBuf,

    /// Path to the JSON system prompt file
    #[arg(long, default_value = DEFAULT_SYSTEM_PROMPT_FILE)]
    pub system_prompt: PathBuf,

    /// Path to the output CSV (appended to if it exists)
    #[arg(long, default_value = DEFAULT_OUTPUT_FILE)]
    pub output: PathBuf,

    /// Base URL of the OpenAI-compatible inference backend
    #[arg(long, env = "VLM_BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    pub backend_url: String,

    /// API key for the backend, if it requires one
    #[arg(long, env = "VLM_BACKEND_API_KEY")]
    pub api_key: Option<String>,
}

impl Config {
    pub fn print_banner(&self) {
        tracing::info!("vlm-harness v{}", env!("CARGO_PKG_VERSION"));
        tracing::info!("  Models:        {}", self.models.display());
        tracing::info!("  Tests:         {}", self.tests.display());
        tracing::info!("  System prompt: {}", self.system_prompt.display());
        tracing::info!("  Output:        {}", self.output.display());
        tracing::info!("  Backend:       {}", self.backend_url);
        tracing::info!(
            "  Auth:          {}",
            if self.api_key.is_some() {
                "enabled"
            } else {
                "disabled"
            }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let cfg = Config::parse_from(["vlm-harness"]);
        assert_eq!(cfg.models, PathBuf::from(DEFAULT_MODELS_FILE));
        assert_eq!(cfg.tests, PathBuf::from(DEFAULT_TESTS_FILE));
        assert_eq!(cfg.output, PathBuf::from(DEFAULT_OUTPUT_FILE));
        assert_eq!(cfg.backend_url, DEFAULT_BACKEND_URL);
    }

    #[test]
    fn test_config_overrides() {
        let cfg = Config::parse_from([
            "vlm-harness",
            "--models",
            "my-models.txt",
            "--output",
            "/tmp/out.csv",
            "--backend-url",
            "http://gpu-box:8000",
        ]);
        assert_eq!(cfg.models, PathBuf::from("my-models.txt"));
        assert_eq!(cfg.output, PathBuf::from("/tmp/out.csv"));
        assert_eq!(cfg.backend_url, "http://gpu-box:8000");
    }
}
