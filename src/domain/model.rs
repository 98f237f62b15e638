use crate::core::normalize::normalize;
use crate::utils::error::{EtlError, Result};
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// 快照日期，只用來排序與比較
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SnapshotDate(NaiveDate);

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d{4})-?(\d{2})(?:-?(\d{2}))?").expect("date pattern is valid")
    })
}

impl SnapshotDate {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| EtlError::SnapshotDateParseError {
                value: format!("{:04}-{:02}-{:02}", year, month, day),
            })
    }

    /// Parses `YYYY-MM`, `YYYY-MM-DD` or a compact `YYYYMM[DD][hhmmss]` stamp.
    /// A month-only key maps to the first day of the month.
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let err = || EtlError::SnapshotDateParseError {
            value: value.to_string(),
        };

        let caps = date_pattern().captures(trimmed).ok_or_else(err)?;
        let whole = caps.get(0).ok_or_else(err)?;
        if whole.start() != 0 || !Self::is_timestamp_tail(&trimmed[whole.end()..]) {
            return Err(err());
        }

        let year: i32 = caps[1].parse().map_err(|_| err())?;
        let month: u32 = caps[2].parse().map_err(|_| err())?;
        let day: u32 = match caps.get(3) {
            Some(d) => d.as_str().parse().map_err(|_| err())?,
            None => 1,
        };

        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(err)
    }

    /// Finds the first date-like stamp inside a larger string, e.g. a file stem
    /// such as `gfi-20200115093000`.
    pub fn find_in(text: &str) -> Option<Self> {
        date_pattern().find_iter(text).find_map(|m| {
            let candidate = m.as_str();
            let tail = &text[m.end()..];
            let digits_tail: String = tail.chars().take_while(|c| c.is_ascii_digit()).collect();
            if !Self::is_timestamp_tail(&digits_tail) {
                return None;
            }
            Self::parse(candidate).ok()
        })
    }

    // 允許 wayback 風格的 hhmmss 尾碼
    fn is_timestamp_tail(tail: &str) -> bool {
        tail.is_empty() || (tail.len() <= 6 && tail.chars().all(|c| c.is_ascii_digit()))
    }

    /// Renders the date at the given precision.
    pub fn format(&self, precision: Option<DatePrecision>) -> String {
        match precision {
            Some(DatePrecision::Month) => format!("{:04}-{:02}", self.0.year(), self.0.month()),
            Some(DatePrecision::Day) | None => self.0.format("%Y-%m-%d").to_string(),
        }
    }
}

impl fmt::Display for SnapshotDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for SnapshotDate {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SnapshotDate {
    type Error = EtlError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<SnapshotDate> for String {
    fn from(value: SnapshotDate) -> Self {
        value.to_string()
    }
}

/// Date precision attached to output rows by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePrecision {
    Day,
    Month,
}

impl DatePrecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatePrecision::Day => "day",
            DatePrecision::Month => "month",
        }
    }
}

impl FromStr for DatePrecision {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(DatePrecision::Day),
            "month" => Ok(DatePrecision::Month),
            other => Err(EtlError::InvalidConfigValueError {
                field: "date_precision".to_string(),
                value: other.to_string(),
                reason: "Valid precisions: day, month".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub person: String,
    pub title: String,
}

impl RosterEntry {
    /// Builds an entry from raw extracted text, normalizing both fields.
    pub fn new(person: &str, title: &str) -> Self {
        Self {
            person: normalize(person),
            title: normalize(title),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub date: SnapshotDate,
    pub roster: Vec<RosterEntry>,
}

impl Snapshot {
    pub fn new(date: SnapshotDate, roster: Vec<RosterEntry>) -> Self {
        Self { date, roster }
    }
}

/// One interval during which a person held a title.
/// `end_date == None` means the tenure was still running at the last snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenureRecord {
    pub person: String,
    pub title: String,
    pub start_date: SnapshotDate,
    pub end_date: Option<SnapshotDate>,
}

impl TenureRecord {
    pub fn open(person: String, title: String, start_date: SnapshotDate) -> Self {
        Self {
            person,
            title,
            start_date,
            end_date: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_date.is_none()
    }

    /// True when the person held this title as of `date`.
    pub fn covers(&self, date: SnapshotDate) -> bool {
        self.start_date <= date && self.end_date.map_or(true, |end| date < end)
    }
}

/// Snapshot as delivered by a source, before roster extraction.
#[derive(Debug, Clone)]
pub struct RawSnapshot {
    pub date: SnapshotDate,
    pub label: String,
    pub body: String,
}

/// 輸出列，欄位對應 bulk insert 的欄位
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenureRow {
    pub person: String,
    pub organization: String,
    pub title: String,
    pub start_date: String,
    pub start_date_precision: Option<String>,
    pub end_date: Option<String>,
    pub end_date_precision: Option<String>,
}

impl TenureRow {
    pub fn from_record(
        record: &TenureRecord,
        organization: &str,
        precision: Option<DatePrecision>,
    ) -> Self {
        let precision_label = precision.map(|p| p.as_str().to_string());
        Self {
            person: record.person.clone(),
            organization: organization.to_string(),
            title: record.title.clone(),
            start_date: record.start_date.format(precision),
            start_date_precision: precision_label.clone(),
            end_date: record.end_date.map(|d| d.format(precision)),
            end_date_precision: record.end_date.and(precision_label),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub records: Vec<TenureRecord>,
    pub rows: Vec<TenureRow>,
    pub csv_output: Option<String>,
    pub json_output: Option<String>,
    pub sql_output: Option<String>,
}
