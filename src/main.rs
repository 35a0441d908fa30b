mod config;
mod evaluation;
mod images;
mod inference;
mod report;
mod suite;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use evaluation::HarnessRunner;
use inference::OpenAiCompatBackend;
use report::CsvReporter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vlm_harness=info".parse().unwrap()),
        )
        .init();

    let config = config::Config::parse();
    config.print_banner();

    // Configuration errors are fatal; nothing has been loaded or written yet.
    let models = suite::load_model_list(&config.models)?;
    let tests = suite::load_test_suite(&config.tests)?;
    let system_prompt = suite::load_system_prompt(&config.system_prompt)?;

    let backend = OpenAiCompatBackend::new(&config.backend_url, config.api_key.clone())?;
    let mut reporter = CsvReporter::new(&config.output);

    let mut runner = HarnessRunner::new(&backend, &mut reporter, system_prompt);
    let summary = runner.run(&models, &tests).await?;

    info!(
        "Run complete: {} rows written ({} passed, {} failed, {} errored)",
        summary.records, summary.passed, summary.failed, summary.errored
    );
    info!("Results saved to {}", config.output.display());

    Ok(())
}
