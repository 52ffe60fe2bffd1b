use crate::core::batch::BatchOutcome;
use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::BatchMonitor;

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Written files, comma separated.
    pub output: String,
    pub outcome: BatchOutcome,
}

pub struct GeocodeEngine<P: Pipeline<Output = BatchOutcome>> {
    pipeline: P,
    monitor: BatchMonitor,
}

impl<P: Pipeline<Output = BatchOutcome>> GeocodeEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: BatchMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        tracing::info!("Starting batch geocoding...");

        // Extract
        let items = self.pipeline.extract().await?;
        tracing::info!("Read {} addresses", items.len());
        self.monitor.log_stage("extract", items.len());

        // Transform
        let outcome = self.pipeline.transform(items).await?;
        tracing::info!(
            "Geocoded {} of {} addresses ({} errors)",
            outcome.report.stats.successes,
            outcome.report.stats.requested,
            outcome.report.stats.errors
        );
        self.monitor.log_stage("geocode", outcome.layer.len());

        // Load
        let output = self.pipeline.load(&outcome).await?;
        tracing::info!("Output saved to: {}", output);
        self.monitor.log_stage("write", outcome.layer.len());
        self.monitor.log_final();

        Ok(RunSummary { output, outcome })
    }
}
