use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting tenure ETL process");

        // Extract
        tracing::info!("📥 Extracting roster snapshots...");
        let snapshots = self.pipeline.extract().await?;
        let entries: usize = snapshots.iter().map(|s| s.roster.len()).sum();
        tracing::info!(
            "Extracted {} snapshots ({} roster entries)",
            snapshots.len(),
            entries
        );
        self.monitor.log_stats("Extract", "roster entries", entries);

        // Transform
        tracing::info!("🔧 Reconciling tenures...");
        let result = self.pipeline.transform(snapshots).await?;
        let open = result.records.iter().filter(|r| r.is_open()).count();
        tracing::info!(
            "Reconciled {} tenure records ({} closed, {} open)",
            result.records.len(),
            result.records.len() - open,
            open
        );
        self.monitor.log_stats("Transform", "tenures", result.records.len());

        // Load
        tracing::info!("💾 Writing output...");
        let rows = result.rows.len();
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("Output saved to: {}", output_path);
        self.monitor.log_stats("Load", "rows", rows);
        self.monitor.log_final_stats();

        Ok(output_path)
    }
}
