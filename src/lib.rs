pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::cli::LocalStorage;
pub use config::toml_config::TomlConfig;

pub use adapters::snapshot_source::{DirectorySource, HttpSource};
pub use app::pipelines::TenurePipeline;
pub use self::core::{etl::EtlEngine, reconcile::reconcile, reconcile::Reconciler};
pub use domain::model::{DatePrecision, RosterEntry, Snapshot, SnapshotDate, TenureRecord};
pub use utils::error::{EtlError, Result};
