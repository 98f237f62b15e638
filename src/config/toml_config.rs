use crate::adapters::emitter::OutputFormat;
use crate::adapters::html_roster::RosterSelectors;
use crate::adapters::snapshot_source::SnapshotUrl;
use crate::config::DuplicatePolicy;
use crate::core::ConfigProvider;
use crate::domain::model::DatePrecision;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Directory,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub r#type: SourceKind,
    /// 快照目錄 (type = "directory")
    pub path: Option<String>,
    pub extension: Option<String>,
    pub timeout_seconds: Option<u64>,
    /// 快照網址清單 (type = "http")
    pub snapshots: Option<Vec<SnapshotUrl>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractConfig {
    pub selectors: Option<RosterSelectors>,
    pub duplicate_policy: Option<DuplicatePolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_formats: Vec<String>,
    pub organization: Option<String>,
    pub date_precision: Option<DatePrecision>,
    pub table_name: Option<String>,
    pub compression: Option<CompressionConfig>,
    pub filenames: Option<FilenameConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilenameConfig {
    pub csv: Option<String>,
    pub json: Option<String>,
    pub sql: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SNAPSHOT_DIR})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        match self.source.r#type {
            SourceKind::Directory => {
                let path = validation::validate_required_field("source.path", &self.source.path)?;
                validation::validate_path("source.path", path)?;
            }
            SourceKind::Http => {
                let snapshots = validation::validate_required_field(
                    "source.snapshots",
                    &self.source.snapshots,
                )?;
                if snapshots.is_empty() {
                    return Err(EtlError::InvalidConfigValueError {
                        field: "source.snapshots".to_string(),
                        value: "[]".to_string(),
                        reason: "At least one snapshot URL is required".to_string(),
                    });
                }
                for snapshot in snapshots {
                    validation::validate_url("source.snapshots.url", &snapshot.url)?;
                }
            }
        }

        if let Some(selectors) = &self.extract.selectors {
            selectors.compile()?;
        }

        validation::validate_path("load.output_path", &self.load.output_path)?;
        validation::validate_sql_identifier("load.table_name", self.table_name())?;

        if self.load.output_formats.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "load.output_formats".to_string(),
            });
        }
        for format in &self.load.output_formats {
            format.parse::<OutputFormat>()?;
        }

        if let Some(compression) = &self.load.compression {
            if compression.enabled {
                validation::validate_non_empty_string(
                    "load.compression.filename",
                    &compression.filename,
                )?;
            }
        }

        Ok(())
    }

    pub fn source_dir(&self) -> Option<&str> {
        self.source.path.as_deref()
    }

    pub fn source_extension(&self) -> &str {
        self.source.extension.as_deref().unwrap_or("html")
    }

    pub fn snapshot_urls(&self) -> &[SnapshotUrl] {
        self.source.snapshots.as_deref().unwrap_or(&[])
    }

    /// 取得監控設定
    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn organization(&self) -> &str {
        self.load.organization.as_deref().unwrap_or("")
    }

    fn output_formats(&self) -> &[String] {
        &self.load.output_formats
    }

    fn date_precision(&self) -> Option<DatePrecision> {
        self.load.date_precision
    }

    fn table_name(&self) -> &str {
        self.load.table_name.as_deref().unwrap_or("positions")
    }

    fn roster_selectors(&self) -> RosterSelectors {
        self.extract.selectors.clone().unwrap_or_default()
    }

    fn duplicate_policy(&self) -> DuplicatePolicy {
        self.extract.duplicate_policy.unwrap_or_default()
    }

    fn output_filename(&self, format: OutputFormat) -> String {
        let custom = self.load.filenames.as_ref().and_then(|f| match format {
            OutputFormat::Csv => f.csv.clone(),
            OutputFormat::Json => f.json.clone(),
            OutputFormat::Sql => f.sql.clone(),
        });
        custom.unwrap_or_else(|| format!("{}.{}", self.pipeline.name, format.extension()))
    }

    fn archive_filename(&self) -> Option<&str> {
        self.load
            .compression
            .as_ref()
            .filter(|c| c.enabled)
            .map(|c| c.filename.as_str())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_directory_config() {
        let toml_content = r#"
[pipeline]
name = "gfi-team"
description = "GFI team page history"
version = "1.0.0"

[source]
type = "directory"
path = "./snapshots"

[extract]
duplicate_policy = "keep_first"

[extract.selectors]
board_title = "Board Member"

[load]
output_path = "./test-output"
output_formats = ["csv", "sql"]
organization = "Global Fund Institute"
date_precision = "month"

[load.filenames]
sql = "insert.sql"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.pipeline.name, "gfi-team");
        assert_eq!(config.source.r#type, SourceKind::Directory);
        assert_eq!(config.source_dir(), Some("./snapshots"));
        assert_eq!(config.source_extension(), "html");
        assert_eq!(config.duplicate_policy(), DuplicatePolicy::KeepFirst);
        assert_eq!(config.date_precision(), Some(DatePrecision::Month));
        assert_eq!(config.organization(), "Global Fund Institute");

        let selectors = config.roster_selectors();
        assert_eq!(selectors.board_title, "Board Member");
        assert_eq!(selectors.row, "div.bioRow");

        assert_eq!(config.output_filename(OutputFormat::Sql), "insert.sql");
        assert_eq!(config.output_filename(OutputFormat::Csv), "gfi-team.csv");
        assert_eq!(config.archive_filename(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_http_config() {
        let toml_content = r#"
[pipeline]
name = "web"

[source]
type = "http"
timeout_seconds = 10

[[source.snapshots]]
date = "2020-01"
url = "https://web.archive.org/web/20200101000000/https://example.org/team"

[[source.snapshots]]
date = "2020-06-15"
url = "https://web.archive.org/web/20200615000000/https://example.org/team"

[load]
output_path = "./output"
output_formats = ["json"]

[load.compression]
enabled = true
filename = "tenures.zip"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.snapshot_urls().len(), 2);
        assert_eq!(config.snapshot_urls()[1].date.to_string(), "2020-06-15");
        assert_eq!(config.date_precision(), None);
        assert_eq!(config.archive_filename(), Some("tenures.zip"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TENURE_TEST_SNAPSHOT_DIR", "/data/snapshots");

        let toml_content = r#"
[pipeline]
name = "test"

[source]
type = "directory"
path = "${TENURE_TEST_SNAPSHOT_DIR}"

[load]
output_path = "./output"
output_formats = ["csv"]
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.source_dir(), Some("/data/snapshots"));

        std::env::remove_var("TENURE_TEST_SNAPSHOT_DIR");
    }

    #[test]
    fn test_config_validation() {
        let missing_path = r#"
[pipeline]
name = "test"

[source]
type = "directory"

[load]
output_path = "./output"
output_formats = ["csv"]
"#;
        let config = TomlConfig::from_toml_str(missing_path).unwrap();
        assert!(matches!(
            config.validate(),
            Err(EtlError::MissingConfigError { .. })
        ));

        let bad_url = r#"
[pipeline]
name = "test"

[source]
type = "http"

[[source.snapshots]]
date = "2020-01"
url = "ftp://example.org"

[load]
output_path = "./output"
output_formats = ["csv"]
"#;
        let config = TomlConfig::from_toml_str(bad_url).unwrap();
        assert!(config.validate().is_err());

        let bad_format = r#"
[pipeline]
name = "test"

[source]
type = "directory"
path = "./snapshots"

[load]
output_path = "./output"
output_formats = ["tsv"]
"#;
        let config = TomlConfig::from_toml_str(bad_format).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_snapshot_date_fails_parsing() {
        let toml_content = r#"
[pipeline]
name = "test"

[source]
type = "http"

[[source.snapshots]]
date = "someday"
url = "https://example.org"

[load]
output_path = "./output"
output_formats = ["csv"]
"#;
        assert!(TomlConfig::from_toml_str(toml_content).is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[pipeline]
name = "file-test"

[source]
type = "directory"
path = "./snapshots"

[load]
output_path = "./output"
output_formats = ["csv"]
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.pipeline.name, "file-test");
    }
}
