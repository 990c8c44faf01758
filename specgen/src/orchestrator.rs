//! Run orchestration
//!
//! **Sequence:** discovery → worker pool → progress reporter → terminal summary.
//!
//! Discovery and pool construction failures abort the run. Per-item failures are
//! recorded in the [`RunSummary`] and never abort it. Inputs that would write the
//! same image as an earlier input are skipped before dispatch.

use crate::error::{FatalError, Result};
use crate::pipeline::SpectrogramPipeline;
use crate::pool::WorkerPool;
use crate::progress::ProgressReporter;
use crate::services::FileScanner;
use crate::types::RunSummary;
use specgen_common::{Config, Logger};
use std::time::Instant;
use tracing::{error, info, warn};

/// Wires discovery, processing and reporting for one run
pub struct Orchestrator {
    config: Config,
    logger: Logger,
    pipeline: SpectrogramPipeline,
}

impl Orchestrator {
    /// Build with the decoder and renderer selected by `config`
    pub fn new(config: Config, logger: Logger) -> Result<Self> {
        let pipeline = SpectrogramPipeline::from_config(&config)?;
        Ok(Self::with_pipeline(config, logger, pipeline))
    }

    /// Build with an explicit pipeline (substitute decoder or renderer)
    pub fn with_pipeline(config: Config, logger: Logger, pipeline: SpectrogramPipeline) -> Self {
        Self {
            config,
            logger,
            pipeline,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Execute the run, logging through this orchestrator's logger
    pub fn run(&self) -> Result<RunSummary> {
        self.logger.in_scope(|| self.run_inner())
    }

    fn run_inner(&self) -> Result<RunSummary> {
        let start = Instant::now();
        let root = &self.config.root_folder;

        let scanner = FileScanner::new(self.config.normalized_extensions());
        let files = scanner.scan(root).map_err(|e| {
            error!("Cannot scan {}: {}", root.display(), e);
            FatalError::from(e)
        })?;

        info!("{} items to process", files.len());

        let mut summary = RunSummary::new(files.len());

        let (files, collisions) = self.pipeline.claim_outputs(files);
        for collision in &collisions {
            warn!("Skipped {}: {}", collision.item, collision);
            summary.record_skipped(&collision.item);
        }

        if !files.is_empty() {
            let pool = WorkerPool::new(self.config.workers.count)
                .with_dispatch(self.logger.dispatch().clone());

            let pipeline = self.pipeline.clone();
            let completions = pool
                .process(files, move |item| pipeline.process(item))
                .map_err(|e| {
                    error!("{}", e);
                    e
                })?;

            let mut reporter = ProgressReporter::new(completions.len(), self.config.progress);
            let route = reporter
                .progress_bar()
                .map(|bar| self.logger.route_console_through(bar.clone()));
            for completion in reporter.observe(completions) {
                summary.record(&completion);
            }
            reporter.finish();
            drop(route);
        }

        summary.elapsed = start.elapsed();

        info!("processing complete: {}", summary);
        for path in &summary.failed {
            warn!("Skipped: {}", path.display());
        }

        Ok(summary)
    }
}
