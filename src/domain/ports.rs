use crate::adapters::emitter::OutputFormat;
use crate::adapters::html_roster::RosterSelectors;
use crate::config::DuplicatePolicy;
use crate::domain::model::{DatePrecision, RawSnapshot, Snapshot, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Lists file names (not full paths) directly under `dir`.
    fn list_files(
        &self,
        dir: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Returns raw snapshots sorted ascending by date.
    async fn snapshots(&self) -> Result<Vec<RawSnapshot>>;
    fn describe(&self) -> String;
}

pub trait ConfigProvider: Send + Sync {
    fn output_path(&self) -> &str;
    fn organization(&self) -> &str;
    fn output_formats(&self) -> &[String];
    fn date_precision(&self) -> Option<DatePrecision>;
    fn table_name(&self) -> &str;
    fn roster_selectors(&self) -> RosterSelectors;
    fn duplicate_policy(&self) -> DuplicatePolicy;
    /// File name for one output format, e.g. `tenures.csv`.
    fn output_filename(&self, format: OutputFormat) -> String;
    /// ZIP archive name when outputs should be bundled.
    fn archive_filename(&self) -> Option<&str>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Snapshot>>;
    async fn transform(&self, snapshots: Vec<Snapshot>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
