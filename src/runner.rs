//! Batch prediction over a dataset split.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use tracing::{error, info};

use crate::dataset::SpiderExample;
use crate::error::Result;
use crate::generate::generate_sql;
use crate::index::IndexBundle;

/// Line written when generation fails for an example. Keeps the output
/// aligned one-to-one with the input so failures stay visible downstream.
pub const ERROR_SENTINEL: &str = "ERROR";

const PROGRESS_EVERY: usize = 50;

/// Generates one prediction per example, in order, into `output_file`.
/// A failed example logs the question and database and emits the sentinel;
/// it never aborts the batch.
pub async fn run_split(
    bundles: &HashMap<String, IndexBundle>,
    examples: &[SpiderExample],
    output_file: &Path,
) -> Result<()> {
    let start = Instant::now();
    info!(
        "Generating {} predictions into {}",
        examples.len(),
        output_file.display()
    );

    let file = File::create(output_file)?;
    let mut writer = BufWriter::new(file);
    let mut failed = 0usize;

    for (i, example) in examples.iter().enumerate() {
        let line = match bundles.get(&example.db_id) {
            Some(bundle) => match generate_sql(bundle, &example.question).await {
                Ok(sql) => sql,
                Err(err) => {
                    error!(
                        "Failed to generate SQL for question: {} on database: {}. {}",
                        example.question, example.db_id, err
                    );
                    failed += 1;
                    ERROR_SENTINEL.to_string()
                }
            },
            None => {
                error!(
                    "No index for database: {} (question: {})",
                    example.db_id, example.question
                );
                failed += 1;
                ERROR_SENTINEL.to_string()
            }
        };
        writeln!(writer, "{}", line)?;

        if (i + 1) % PROGRESS_EVERY == 0 {
            info!("{}/{} predictions generated", i + 1, examples.len());
        }
    }

    writer.flush()?;
    info!(
        "Wrote {} predictions ({} failed) to {} in {:.1}s",
        examples.len(),
        failed,
        output_file.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
