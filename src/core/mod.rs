pub mod etl;
pub mod normalize;
pub mod reconcile;

pub use crate::domain::model::{Snapshot, TenureRecord, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, SnapshotSource, Storage};
pub use crate::utils::error::Result;
