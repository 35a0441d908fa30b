use anyhow::Result;
use tracing::{info, warn};

use crate::evaluation::check_result;
use crate::images::{list_image_files, load_image};
use crate::inference::VisionBackend;
use crate::report::{CsvReporter, ResultRecord};
use crate::suite::{ModelId, TestCase};

/// Totals for one harness run.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    pub records: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
}

/// Drives the evaluation loop: every model against every test case against
/// every image in that test's directory, one combination at a time. A failure
/// in one iteration is downgraded to a result row; it never aborts the run.
pub struct HarnessRunner<'a> {
    backend: &'a dyn VisionBackend,
    reporter: &'a mut CsvReporter,
    system_prompt: String,
}

impl<'a> HarnessRunner<'a> {
    pub fn new(
        backend: &'a dyn VisionBackend,
        reporter: &'a mut CsvReporter,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            reporter,
            system_prompt: system_prompt.into(),
        }
    }

    pub async fn run(&mut self, models: &[ModelId], tests: &[TestCase]) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for model in models {
            // One load per model, reused for every test case against it.
            let loaded = match self.backend.load_model(model).await {
                Ok(loaded) => loaded,
                Err(e) => {
                    warn!("Failed to load model {}: {:#}", model, e);
                    for test in tests {
                        let record =
                            ResultRecord::degraded(model, &test.test_description, None, &e);
                        self.record(&record, true, &mut summary)?;
                    }
                    continue;
                }
            };

            for test in tests {
                info!("Running test {} on {}", test.test_description, model);

                let image_files = match list_image_files(&test.image_directory) {
                    Ok(files) => files,
                    Err(e) => {
                        warn!(
                            "Skipping test {}: {:#}",
                            test.test_description, e
                        );
                        let record =
                            ResultRecord::degraded(model, &test.test_description, None, &e);
                        self.record(&record, true, &mut summary)?;
                        continue;
                    }
                };

                for image_path in &image_files {
                    let prompt = format!("{}\n{}", self.system_prompt, test.prompt);

                    let generation = match load_image(image_path) {
                        Ok(image) => loaded.generate(&prompt, &image).await,
                        Err(e) => Err(e),
                    };

                    let (record, degraded) = match generation {
                        Ok(generation) => {
                            let check = check_result(&generation.text, &test.expected_result);
                            let record = ResultRecord::completed(
                                model,
                                test,
                                image_path,
                                &prompt,
                                &generation.text,
                                check,
                            );
                            (record, false)
                        }
                        Err(e) => {
                            warn!(
                                "Iteration failed for {} on {}: {:#}",
                                image_path.display(),
                                model,
                                e
                            );
                            let record = ResultRecord::degraded(
                                model,
                                &test.test_description,
                                Some(image_path),
                                &e,
                            );
                            (record, true)
                        }
                    };

                    self.record(&record, degraded, &mut summary)?;
                }
            }
        }

        Ok(summary)
    }

    // Write errors propagate and terminate the run.
    fn record(
        &mut self,
        record: &ResultRecord,
        degraded: bool,
        summary: &mut RunSummary,
    ) -> Result<()> {
        self.reporter.append(record)?;
        summary.records += 1;
        if degraded {
            summary.errored += 1;
        } else if record.check {
            summary.passed += 1;
        } else {
            summary.failed += 1;
        }
        Ok(())
    }
}
