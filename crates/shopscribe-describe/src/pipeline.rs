//! The description run loop: skip, generate, buffer, checkpoint, throttle.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use shopscribe_ai::{GenerationRequest, Generator};
use shopscribe_core::{GenerationResult, GenerationStatus, ProductRecord};
use tracing::{debug, info, warn};

use crate::DescribeError;
use crate::output::{CheckpointWriter, load_completed, load_input, prepare_output};
use crate::prompt::{SYSTEM_PROMPT, build_prompt};
use crate::throttle::Throttle;

pub const DEFAULT_INPUT: &str = "input/products.csv";
pub const DEFAULT_OUTPUT: &str = "output/products_with_descriptions.csv";
pub const DEFAULT_CHECKPOINT_EVERY: usize = 10;
pub const DEFAULT_MAX_TOKENS: u32 = 300;

const TITLE_LOG_CHARS: usize = 60;

#[derive(Debug, Clone)]
pub struct JobOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Only process the first N rows. `None` or `Some(0)` means all rows.
    pub limit: Option<usize>,
    /// Skip rows already complete in the output file.
    pub resume: bool,
    pub checkpoint_every: usize,
    pub max_tokens: u32,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            output: PathBuf::from(DEFAULT_OUTPUT),
            limit: None,
            resume: false,
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Rows considered (after any limit).
    pub total: usize,
    /// Rows with a generated description.
    pub processed: usize,
    pub errors: usize,
    /// Rows already complete from an earlier run.
    pub skipped: usize,
    /// Rows appended to the output file.
    pub written: usize,
}

/// A description run over one input file.
pub struct DescribeJob {
    generator: Arc<dyn Generator>,
    throttle: Arc<dyn Throttle>,
    options: JobOptions,
}

impl DescribeJob {
    pub fn new(
        generator: Arc<dyn Generator>,
        throttle: Arc<dyn Throttle>,
        options: JobOptions,
    ) -> Self {
        Self {
            generator,
            throttle,
            options,
        }
    }

    pub fn options(&self) -> &JobOptions {
        &self.options
    }

    /// Load the input, prepare the output file, and process every row.
    ///
    /// Setup failures (missing input, unreadable CSV, unwritable output) are
    /// returned as errors. Per-row generation failures are recorded in the
    /// output and never abort the run.
    pub async fn run(&self) -> Result<RunStats, DescribeError> {
        let opts = &self.options;
        let mut table = load_input(&opts.input)?;

        if let Some(limit) = opts.limit.filter(|n| *n > 0) {
            table.records.truncate(limit);
            info!(limit, "limited to first rows");
        }

        let fieldnames = table.output_fieldnames();
        let completed = if opts.resume {
            let completed = load_completed(&opts.output)?;
            info!(completed = completed.len(), "resuming");
            completed
        } else {
            HashSet::new()
        };
        prepare_output(&opts.output, &fieldnames)?;

        let mut writer = CheckpointWriter::new(&opts.output, fieldnames, opts.checkpoint_every);
        let mut stats = self
            .process(&table.records, &completed, &mut writer)
            .await?;
        stats.written = writer.finish()?;

        info!(
            processed = stats.processed,
            skipped = stats.skipped,
            errors = stats.errors,
            written = stats.written,
            output = %opts.output.display(),
            "run complete"
        );
        Ok(stats)
    }

    /// Process records in order, pushing augmented rows into `writer`.
    ///
    /// The caller owns the final flush.
    pub async fn process(
        &self,
        records: &[ProductRecord],
        completed: &HashSet<String>,
        writer: &mut CheckpointWriter,
    ) -> Result<RunStats, DescribeError> {
        let mut stats = RunStats {
            total: records.len(),
            ..RunStats::default()
        };

        for (i, record) in records.iter().enumerate() {
            let key = record.identity_key();
            if completed.contains(key) {
                stats.skipped += 1;
                debug!(sku = key, "already complete, skipping");
                continue;
            }

            let title: String = record.title().chars().take(TITLE_LOG_CHARS).collect();
            info!(row = i + 1, total = stats.total, title = %title, "processing");

            let result = self.describe(record).await;
            match &result.status {
                GenerationStatus::Success => stats.processed += 1,
                GenerationStatus::Error(message) => {
                    stats.errors += 1;
                    warn!(row = i + 1, sku = key, error = %message, "generation failed");
                }
                GenerationStatus::Skipped => {}
            }

            if writer.push(result.augment(record))? {
                info!(
                    processed = stats.processed,
                    errors = stats.errors,
                    skipped = stats.skipped,
                    "checkpoint saved"
                );
            }

            self.throttle.wait().await;
        }

        Ok(stats)
    }

    async fn describe(&self, record: &ProductRecord) -> GenerationResult {
        let request = GenerationRequest {
            system: SYSTEM_PROMPT,
            prompt: build_prompt(record),
            max_tokens: self.options.max_tokens,
        };
        let key = record.identity_key();
        match self.generator.generate(&request).await {
            Ok(text) => GenerationResult::success(key, text),
            Err(e) => GenerationResult::failure(key, e.to_string()),
        }
    }
}
