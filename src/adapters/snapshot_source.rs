use crate::domain::model::{RawSnapshot, SnapshotDate};
use crate::domain::ports::{SnapshotSource, Storage};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Sorts snapshots by date and rejects duplicate dates.
pub fn sort_snapshots(mut snapshots: Vec<RawSnapshot>) -> Result<Vec<RawSnapshot>> {
    snapshots.sort_by_key(|s| s.date);
    for pair in snapshots.windows(2) {
        if pair[0].date == pair[1].date {
            return Err(EtlError::DuplicateSnapshotDate {
                date: pair[1].date.to_string(),
            });
        }
    }
    Ok(snapshots)
}

/// Reads every snapshot file in one directory; the snapshot date comes from
/// the file name (`2020-01.html`, `team-20200115093000.html`, ...).
pub struct DirectorySource<S: Storage> {
    storage: S,
    dir: String,
    extension: String,
}

impl<S: Storage> DirectorySource<S> {
    pub fn new(storage: S, dir: &str, extension: &str) -> Self {
        Self {
            storage,
            dir: dir.to_string(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    fn date_for(&self, file_name: &str) -> Option<SnapshotDate> {
        let path = Path::new(file_name);
        let ext = path.extension().and_then(|e| e.to_str())?;
        if !ext.eq_ignore_ascii_case(&self.extension) {
            return None;
        }
        let stem = path.file_stem().and_then(|s| s.to_str())?;
        let date = SnapshotDate::find_in(stem);
        if date.is_none() {
            tracing::warn!("⚠️ No date in snapshot file name '{}', skipping", file_name);
        }
        date
    }
}

#[async_trait]
impl<S: Storage> SnapshotSource for DirectorySource<S> {
    async fn snapshots(&self) -> Result<Vec<RawSnapshot>> {
        let files = self.storage.list_files(&self.dir).await?;
        tracing::debug!("Found {} files in {}", files.len(), self.dir);

        let mut snapshots = Vec::new();
        for file_name in files {
            let Some(date) = self.date_for(&file_name) else {
                continue;
            };
            let path = Path::new(&self.dir).join(&file_name);
            let path = path.to_string_lossy();
            let bytes = self.storage.read_file(&path).await?;
            snapshots.push(RawSnapshot {
                date,
                label: file_name,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        sort_snapshots(snapshots)
    }

    fn describe(&self) -> String {
        format!("directory {} (*.{})", self.dir, self.extension)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotUrl {
    pub date: SnapshotDate,
    pub url: String,
}

/// Fetches each configured snapshot URL.
pub struct HttpSource {
    client: Client,
    snapshots: Vec<SnapshotUrl>,
    timeout: Option<Duration>,
}

impl HttpSource {
    pub fn new(snapshots: Vec<SnapshotUrl>) -> Self {
        Self {
            client: Client::new(),
            snapshots,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl SnapshotSource for HttpSource {
    async fn snapshots(&self) -> Result<Vec<RawSnapshot>> {
        let mut snapshots = Vec::with_capacity(self.snapshots.len());
        for entry in &self.snapshots {
            tracing::debug!("Fetching snapshot {} from {}", entry.date, entry.url);

            let mut request = self.client.get(&entry.url);
            if let Some(timeout) = self.timeout {
                request = request.timeout(timeout);
            }
            let response = request.send().await?;

            if !response.status().is_success() {
                return Err(EtlError::HttpStatusError {
                    url: entry.url.clone(),
                    status: response.status().as_u16(),
                });
            }

            snapshots.push(RawSnapshot {
                date: entry.date,
                label: entry.url.clone(),
                body: response.text().await?,
            });
        }

        sort_snapshots(snapshots)
    }

    fn describe(&self) -> String {
        format!("{} snapshot URLs", self.snapshots.len())
    }
}
