pub mod tenure_pipeline;

pub use tenure_pipeline::TenurePipeline;
