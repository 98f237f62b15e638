use crate::domain::model::TenureRow;
use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

pub const COLUMNS: [&str; 7] = [
    "person",
    "organization",
    "title",
    "start_date",
    "start_date_precision",
    "end_date",
    "end_date_precision",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
    Sql,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Sql => "sql",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "sql" => Ok(OutputFormat::Sql),
            other => Err(EtlError::InvalidConfigValueError {
                field: "output_formats".to_string(),
                value: other.to_string(),
                reason: "Unsupported format. Valid formats: csv, json, sql".to_string(),
            }),
        }
    }
}

/// Renders rows as CSV display tuples with a header line.
pub fn render_csv(rows: &[TenureRow]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(COLUMNS)?;
    for row in rows {
        writer.write_record([
            row.person.as_str(),
            row.organization.as_str(),
            row.title.as_str(),
            row.start_date.as_str(),
            row.start_date_precision.as_deref().unwrap_or(""),
            row.end_date.as_deref().unwrap_or(""),
            row.end_date_precision.as_deref().unwrap_or(""),
        ])?;
    }
    let data = writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))?;
    String::from_utf8(data).map_err(|e| EtlError::ProcessingError {
        message: format!("CSV output is not UTF-8: {}", e),
    })
}

pub fn render_json(rows: &[TenureRow]) -> Result<String> {
    Ok(serde_json::to_string_pretty(rows)?)
}

/// Renders a full bulk insert statement for `rows`.
pub fn render_sql(table: &str, rows: &[TenureRow]) -> Result<String> {
    let mut writer = SqlInsertWriter::new(Vec::new(), table);
    for row in rows {
        writer.push(row)?;
    }
    let data = writer.finish()?;
    String::from_utf8(data).map_err(|e| EtlError::ProcessingError {
        message: format!("SQL output is not UTF-8: {}", e),
    })
}

/// Quotes a value as a SQL string literal. Empty or absent values become `NULL`.
pub fn sql_quote(value: Option<&str>) -> String {
    match value {
        None | Some("") => "NULL".to_string(),
        Some(v) => {
            let mut out = String::with_capacity(v.len() + 2);
            out.push('\'');
            for c in v.chars() {
                match c {
                    '\\' => out.push_str("\\\\"),
                    '\'' => out.push_str("\\'"),
                    '\n' => out.push_str("\\n"),
                    _ => out.push(c),
                }
            }
            out.push('\'');
            out
        }
    }
}

/// Streams rows into one `INSERT ... VALUES` statement.
///
/// The statement header is written by the first `push`; `finish` closes the
/// statement. Nothing is written when no row was pushed.
pub struct SqlInsertWriter<W: Write> {
    inner: W,
    table: String,
    header_written: bool,
    rows: usize,
}

impl<W: Write> SqlInsertWriter<W> {
    pub fn new(inner: W, table: &str) -> Self {
        Self {
            inner,
            table: table.to_string(),
            header_written: false,
            rows: 0,
        }
    }

    pub fn push(&mut self, row: &TenureRow) -> Result<()> {
        if self.header_written {
            self.inner.write_all(b",\n")?;
        } else {
            writeln!(
                self.inner,
                "INSERT INTO {} ({}) VALUES",
                self.table,
                COLUMNS.join(", ")
            )?;
            self.header_written = true;
        }

        let values = [
            sql_quote(Some(&row.person)),
            sql_quote(Some(&row.organization)),
            sql_quote(Some(&row.title)),
            sql_quote(Some(&row.start_date)),
            sql_quote(row.start_date_precision.as_deref()),
            sql_quote(row.end_date.as_deref()),
            sql_quote(row.end_date_precision.as_deref()),
        ];
        write!(self.inner, "    ({})", values.join(", "))?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }

    pub fn finish(mut self) -> Result<W> {
        if self.header_written {
            self.inner.write_all(b";\n")?;
        }
        self.inner.flush()?;
        Ok(self.inner)
    }
}
