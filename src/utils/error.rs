use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("HTTP {status} while fetching snapshot {url}")]
    HttpStatusError { url: String, status: u16 },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Cannot parse snapshot date from '{value}'")]
    SnapshotDateParseError { value: String },

    #[error("Malformed roster row {row} in {source_label}: {reason}")]
    MalformedSnapshotRow {
        source_label: String,
        row: usize,
        reason: String,
    },

    #[error("Snapshot {current} is out of order (previous snapshot was {previous})")]
    UnsortedSnapshotSequence { previous: String, current: String },

    #[error("Snapshot date {date} appears more than once")]
    DuplicateSnapshotDate { date: String },

    #[error("Snapshot {date} lists '{person}' more than once")]
    DuplicatePerson { date: String, person: String },

    #[error("Internal state invariant violated at snapshot {date} for '{person}': {detail}")]
    InvariantViolation {
        date: String,
        person: String,
        detail: String,
    },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Io,
    Configuration,
    Input,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::HttpError(_) | EtlError::HttpStatusError { .. } => ErrorCategory::Network,
            EtlError::ZipError(_)
            | EtlError::CsvError(_)
            | EtlError::IoError(_)
            | EtlError::SerializationError(_) => ErrorCategory::Io,
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            EtlError::SnapshotDateParseError { .. }
            | EtlError::MalformedSnapshotRow { .. }
            | EtlError::UnsortedSnapshotSequence { .. }
            | EtlError::DuplicateSnapshotDate { .. }
            | EtlError::DuplicatePerson { .. } => ErrorCategory::Input,
            EtlError::InvariantViolation { .. } | EtlError::ProcessingError { .. } => {
                ErrorCategory::Internal
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 單列錯誤可略過，不影響整體執行
            EtlError::MalformedSnapshotRow { .. } => ErrorSeverity::Low,
            EtlError::HttpError(_) | EtlError::HttpStatusError { .. } => ErrorSeverity::Medium,
            EtlError::InvariantViolation { .. } => ErrorSeverity::Critical,
            EtlError::IoError(_) | EtlError::ZipError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    /// Whether the error only affects one roster row and the run may continue.
    pub fn is_recoverable(&self) -> bool {
        self.severity() == ErrorSeverity::Low
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::HttpError(_) | EtlError::HttpStatusError { .. } => {
                "Check network connectivity and that the snapshot URLs are reachable".to_string()
            }
            EtlError::IoError(_) => {
                "Check that the snapshot directory exists and the output path is writable"
                    .to_string()
            }
            EtlError::ZipError(_) | EtlError::CsvError(_) | EtlError::SerializationError(_) => {
                "Check available disk space and retry".to_string()
            }
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => {
                "Fix the configuration file or command line flags".to_string()
            }
            EtlError::SnapshotDateParseError { .. } => {
                "Name snapshot files with a YYYY-MM, YYYY-MM-DD or YYYYMMDD date".to_string()
            }
            EtlError::MalformedSnapshotRow { .. } => {
                "The row was skipped; adjust the roster selectors if too many rows are lost"
                    .to_string()
            }
            EtlError::UnsortedSnapshotSequence { .. } | EtlError::DuplicateSnapshotDate { .. } => {
                "Provide snapshots sorted by date with exactly one snapshot per date".to_string()
            }
            EtlError::DuplicatePerson { .. } => {
                "Remove the duplicate entry or set duplicate_policy = \"keep_first\"".to_string()
            }
            EtlError::InvariantViolation { .. } | EtlError::ProcessingError { .. } => {
                "This is a bug in tenure-etl; please report it with the input snapshots"
                    .to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("無法取得快照: {}", self),
            ErrorCategory::Io => format!("檔案處理失敗: {}", self),
            ErrorCategory::Configuration => format!("配置錯誤: {}", self),
            ErrorCategory::Input => format!("輸入資料錯誤: {}", self),
            ErrorCategory::Internal => format!("內部錯誤: {}", self),
        }
    }

    /// CLI 結束代碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
