use crate::adapters::emitter::{render_csv, render_json, render_sql, OutputFormat};
use crate::adapters::html_roster::extract_roster;
use crate::config::DuplicatePolicy;
use crate::core::reconcile::{dedupe_keep_first, reconcile};
use crate::core::{ConfigProvider, Pipeline, Snapshot, SnapshotSource, Storage, TransformResult};
use crate::domain::model::{DatePrecision, TenureRow};
use crate::utils::error::{EtlError, Result};
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

/// Reads roster snapshots from a source, reconciles them into tenures and
/// writes the rendered rows to storage.
pub struct TenurePipeline<S: Storage, Src: SnapshotSource, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) source: Src,
    pub(crate) config: C,
}

impl<S: Storage, Src: SnapshotSource, C: ConfigProvider> TenurePipeline<S, Src, C> {
    pub fn new(storage: S, source: Src, config: C) -> Self {
        Self {
            storage,
            source,
            config,
        }
    }

    fn formats(&self) -> Result<Vec<OutputFormat>> {
        let mut formats = Vec::new();
        for name in self.config.output_formats() {
            let format: OutputFormat = name.parse()?;
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        Ok(formats)
    }

    fn rendered(result: &TransformResult) -> Vec<(OutputFormat, &str)> {
        let mut outputs = Vec::new();
        if let Some(csv) = &result.csv_output {
            outputs.push((OutputFormat::Csv, csv.as_str()));
        }
        if let Some(json) = &result.json_output {
            outputs.push((OutputFormat::Json, json.as_str()));
        }
        if let Some(sql) = &result.sql_output {
            outputs.push((OutputFormat::Sql, sql.as_str()));
        }
        outputs
    }
}

/// Snapshot dates must stay distinct once rendered, otherwise a closed tenure
/// would print with `start_date == end_date`.
fn check_rendered_dates(snapshots: &[Snapshot], precision: Option<DatePrecision>) -> Result<()> {
    for pair in snapshots.windows(2) {
        let previous = pair[0].date.format(precision);
        let current = pair[1].date.format(precision);
        if previous >= current {
            tracing::error!(
                "❌ Snapshots {} and {} collapse to {} at the configured precision",
                pair[0].date,
                pair[1].date,
                current
            );
            return Err(EtlError::DuplicateSnapshotDate { date: current });
        }
    }
    Ok(())
}

#[async_trait::async_trait]
impl<S: Storage, Src: SnapshotSource, C: ConfigProvider> Pipeline for TenurePipeline<S, Src, C> {
    async fn extract(&self) -> Result<Vec<Snapshot>> {
        tracing::info!("📡 Reading snapshots from {}", self.source.describe());

        let raw_snapshots = self.source.snapshots().await?;
        let selectors = self.config.roster_selectors().compile()?;

        let mut snapshots = Vec::with_capacity(raw_snapshots.len());
        let mut skipped_rows = 0usize;

        for raw in raw_snapshots {
            let extraction = extract_roster(&raw.body, &selectors, &raw.label);
            skipped_rows += extraction.skipped.len();

            let mut roster = extraction.entries;
            if self.config.duplicate_policy() == DuplicatePolicy::KeepFirst {
                for person in dedupe_keep_first(&mut roster) {
                    tracing::warn!(
                        "⚠️ {} lists '{}' more than once, keeping the first entry",
                        raw.label,
                        person
                    );
                }
            }

            tracing::debug!(
                "Snapshot {} ({}): {} roster entries",
                raw.date,
                raw.label,
                roster.len()
            );
            snapshots.push(Snapshot::new(raw.date, roster));
        }

        if skipped_rows > 0 {
            tracing::warn!("⚠️ Skipped {} malformed roster rows", skipped_rows);
        }

        Ok(snapshots)
    }

    async fn transform(&self, snapshots: Vec<Snapshot>) -> Result<TransformResult> {
        let records = reconcile(&snapshots)?;

        let organization = self.config.organization();
        let precision = self.config.date_precision();
        check_rendered_dates(&snapshots, precision)?;
        let rows: Vec<TenureRow> = records
            .iter()
            .map(|record| TenureRow::from_record(record, organization, precision))
            .collect();

        let mut result = TransformResult {
            records,
            rows,
            csv_output: None,
            json_output: None,
            sql_output: None,
        };

        for format in self.formats()? {
            match format {
                OutputFormat::Csv => result.csv_output = Some(render_csv(&result.rows)?),
                OutputFormat::Json => result.json_output = Some(render_json(&result.rows)?),
                OutputFormat::Sql => {
                    result.sql_output = Some(render_sql(self.config.table_name(), &result.rows)?)
                }
            }
        }

        Ok(result)
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let outputs = Self::rendered(&result);

        if let Some(archive) = self.config.archive_filename() {
            tracing::debug!("Creating ZIP file with {} files", outputs.len());

            let zip_data = {
                let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
                for (format, content) in &outputs {
                    zip.start_file::<_, ()>(
                        self.config.output_filename(*format),
                        FileOptions::default(),
                    )?;
                    zip.write_all(content.as_bytes())?;
                }
                zip.finish()?.into_inner()
            };

            self.storage.write_file(archive, &zip_data).await?;
            let output_path = format!("{}/{}", self.config.output_path(), archive);
            tracing::info!("📦 Output archive saved: {}", output_path);
            return Ok(output_path);
        }

        for (format, content) in &outputs {
            let filename = self.config.output_filename(*format);
            self.storage.write_file(&filename, content.as_bytes()).await?;
            tracing::info!("📄 Wrote {}/{}", self.config.output_path(), filename);
        }

        Ok(self.config.output_path().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::emitter::OutputFormat;
    use crate::adapters::html_roster::RosterSelectors;
    use crate::domain::model::{RawSnapshot, SnapshotDate};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn list_files(&self, _dir: &str) -> Result<Vec<String>> {
            let files = self.files.lock().await;
            Ok(files.keys().cloned().collect())
        }
    }

    struct StaticSource(Vec<RawSnapshot>);

    #[async_trait::async_trait]
    impl SnapshotSource for StaticSource {
        async fn snapshots(&self) -> Result<Vec<RawSnapshot>> {
            Ok(self.0.clone())
        }

        fn describe(&self) -> String {
            "static".to_string()
        }
    }

    struct TestConfig {
        formats: Vec<String>,
        policy: DuplicatePolicy,
        archive: Option<String>,
    }

    impl ConfigProvider for TestConfig {
        fn output_path(&self) -> &str {
            "/out"
        }

        fn organization(&self) -> &str {
            "GFI"
        }

        fn output_formats(&self) -> &[String] {
            &self.formats
        }

        fn date_precision(&self) -> Option<DatePrecision> {
            Some(DatePrecision::Month)
        }

        fn table_name(&self) -> &str {
            "positions"
        }

        fn roster_selectors(&self) -> RosterSelectors {
            RosterSelectors::default()
        }

        fn duplicate_policy(&self) -> DuplicatePolicy {
            self.policy
        }

        fn output_filename(&self, format: OutputFormat) -> String {
            format!("tenures.{}", format.extension())
        }

        fn archive_filename(&self) -> Option<&str> {
            self.archive.as_deref()
        }
    }

    fn staff_page(members: &[(&str, &str)]) -> String {
        let rows: String = members
            .iter()
            .map(|(name, title)| {
                format!(
                    r#"<div class="bioRow"><div class="staff"><h1 class="staffName">{}</h1><h3 class="staffTitle">{}</h3></div></div>"#,
                    name, title
                )
            })
            .collect();
        format!("<html><body>{}</body></html>", rows)
    }

    fn raw(date: &str, members: &[(&str, &str)]) -> RawSnapshot {
        RawSnapshot {
            date: SnapshotDate::parse(date).unwrap(),
            label: format!("{}.html", date),
            body: staff_page(members),
        }
    }

    fn pipeline(
        snapshots: Vec<RawSnapshot>,
        config: TestConfig,
    ) -> TenurePipeline<MockStorage, StaticSource, TestConfig> {
        TenurePipeline::new(MockStorage::default(), StaticSource(snapshots), config)
    }

    fn config(formats: &[&str]) -> TestConfig {
        TestConfig {
            formats: formats.iter().map(|f| f.to_string()).collect(),
            policy: DuplicatePolicy::Reject,
            archive: None,
        }
    }

    #[tokio::test]
    async fn test_extract_transform_load() {
        let pipeline = pipeline(
            vec![
                raw("2020-01", &[("Alice", "Researcher")]),
                raw("2020-06", &[("Alice", "Senior  Researcher")]),
                raw("2021-01", &[]),
            ],
            config(&["csv", "sql"]),
        );

        let snapshots = pipeline.extract().await.unwrap();
        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[1].roster[0].title, "Senior Researcher");

        let result = pipeline.transform(snapshots).await.unwrap();
        assert_eq!(result.records.len(), 2);
        assert!(result.json_output.is_none());

        let sql = result.sql_output.clone().unwrap();
        assert!(sql.contains("('Alice', 'GFI', 'Researcher', '2020-01', 'month', '2020-06', 'month')"));

        let path = pipeline.load(result).await.unwrap();
        assert_eq!(path, "/out");
        let csv = pipeline.storage.get_file("tenures.csv").await.unwrap();
        let csv = String::from_utf8(csv).unwrap();
        assert!(csv.contains("Alice,GFI,Senior Researcher,2020-06,month,2021-01,month"));
        assert!(pipeline.storage.get_file("tenures.sql").await.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_person_rejected_by_default() {
        let pipeline = pipeline(
            vec![raw("2020-01", &[("Alice", "Researcher"), ("Alice", "Advisor")])],
            config(&["csv"]),
        );

        let snapshots = pipeline.extract().await.unwrap();
        assert!(matches!(
            pipeline.transform(snapshots).await,
            Err(EtlError::DuplicatePerson { .. })
        ));
    }

    #[tokio::test]
    async fn test_same_month_snapshots_rejected_at_month_precision() {
        let pipeline = pipeline(
            vec![
                raw("2020-06-01", &[("Alice", "Researcher")]),
                raw("2020-06-15", &[("Alice", "Senior Researcher")]),
            ],
            config(&["csv"]),
        );

        let snapshots = pipeline.extract().await.unwrap();
        match pipeline.transform(snapshots).await {
            Err(EtlError::DuplicateSnapshotDate { date }) => assert_eq!(date, "2020-06"),
            other => panic!("expected duplicate snapshot date, got {:?}", other),
        }
        assert!(pipeline.storage.get_file("tenures.csv").await.is_none());
    }

    #[test]
    fn test_day_precision_keeps_same_month_snapshots_apart() {
        let snapshots = vec![
            Snapshot::new(SnapshotDate::parse("2020-06-01").unwrap(), vec![]),
            Snapshot::new(SnapshotDate::parse("2020-06-15").unwrap(), vec![]),
        ];
        assert!(check_rendered_dates(&snapshots, Some(DatePrecision::Day)).is_ok());
        assert!(check_rendered_dates(&snapshots, None).is_ok());
        assert!(check_rendered_dates(&snapshots, Some(DatePrecision::Month)).is_err());
    }

    #[tokio::test]
    async fn test_duplicate_person_keep_first() {
        let mut cfg = config(&["json"]);
        cfg.policy = DuplicatePolicy::KeepFirst;
        let pipeline = pipeline(
            vec![raw("2020-01", &[("Alice", "Researcher"), ("Alice", "Advisor")])],
            cfg,
        );

        let snapshots = pipeline.extract().await.unwrap();
        let result = pipeline.transform(snapshots).await.unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].title, "Researcher");
        assert!(result.json_output.unwrap().contains("\"title\": \"Researcher\""));
    }

    #[tokio::test]
    async fn test_load_into_archive() {
        let mut cfg = config(&["csv", "json", "sql"]);
        cfg.archive = Some("tenures.zip".to_string());
        let pipeline = pipeline(vec![raw("2020-01", &[("Bob", "Advisor")])], cfg);

        let snapshots = pipeline.extract().await.unwrap();
        let result = pipeline.transform(snapshots).await.unwrap();
        let path = pipeline.load(result).await.unwrap();
        assert_eq!(path, "/out/tenures.zip");

        let data = pipeline.storage.get_file("tenures.zip").await.unwrap();
        let archive = zip::ZipArchive::new(std::io::Cursor::new(data)).unwrap();
        let mut names: Vec<_> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["tenures.csv", "tenures.json", "tenures.sql"]);
    }
}
