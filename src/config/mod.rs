pub mod cli;
pub mod toml_config;

use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[cfg(feature = "cli")]
use crate::adapters::emitter::OutputFormat;
#[cfg(feature = "cli")]
use crate::adapters::html_roster::RosterSelectors;
#[cfg(feature = "cli")]
use crate::core::ConfigProvider;
#[cfg(feature = "cli")]
use crate::domain::model::DatePrecision;
#[cfg(feature = "cli")]
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_sql_identifier, Validate,
};

/// What to do when one snapshot lists the same person twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Abort the run.
    #[default]
    Reject,
    /// Keep the first occurrence and warn about the rest.
    KeepFirst,
}

impl FromStr for DuplicatePolicy {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "reject" => Ok(DuplicatePolicy::Reject),
            "keep_first" => Ok(DuplicatePolicy::KeepFirst),
            other => Err(EtlError::InvalidConfigValueError {
                field: "duplicate_policy".to_string(),
                value: other.to_string(),
                reason: "Valid policies: reject, keep_first".to_string(),
            }),
        }
    }
}

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "tenure-etl")]
#[command(about = "Rebuild a tenure history from dated roster snapshots")]
pub struct CliConfig {
    #[arg(long, default_value = "./snapshots")]
    pub snapshot_dir: String,

    #[arg(long, default_value = "html")]
    pub extension: String,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, default_value = "")]
    pub organization: String,

    /// Date precision attached to output rows (day or month)
    #[arg(long)]
    pub precision: Option<DatePrecision>,

    #[arg(long, value_delimiter = ',', default_value = "csv,sql")]
    pub formats: Vec<String>,

    #[arg(long, default_value = "positions")]
    pub table: String,

    #[arg(long, default_value = "reject")]
    pub duplicate_policy: DuplicatePolicy,

    /// Bundle all outputs into this ZIP file
    #[arg(long)]
    pub zip: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Enable system monitoring")]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn organization(&self) -> &str {
        &self.organization
    }

    fn output_formats(&self) -> &[String] {
        &self.formats
    }

    fn date_precision(&self) -> Option<DatePrecision> {
        self.precision
    }

    fn table_name(&self) -> &str {
        &self.table
    }

    fn roster_selectors(&self) -> RosterSelectors {
        RosterSelectors::default()
    }

    fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicate_policy
    }

    fn output_filename(&self, format: OutputFormat) -> String {
        format!("tenures.{}", format.extension())
    }

    fn archive_filename(&self) -> Option<&str> {
        self.zip.as_deref()
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("snapshot_dir", &self.snapshot_dir)?;
        validate_path("output_path", &self.output_path)?;
        validate_non_empty_string("extension", &self.extension)?;
        validate_non_empty_string("table", &self.table)?;
        validate_sql_identifier("table", &self.table)?;
        if self.formats.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "formats".to_string(),
            });
        }
        for format in &self.formats {
            format.parse::<OutputFormat>()?;
        }
        Ok(())
    }
}
