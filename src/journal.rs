//! Interaction log
//!
//! One JSON file per day (`chat_history_YYYY-MM-DD.json`) holding a
//! pretty-printed array of [`LogEntry`] values. Entries are only ever
//! appended.

use crate::error::{Error, Result};
use crate::models::LogEntry;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// Append-only destination for question/answer records
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn append(&self, entry: &LogEntry) -> Result<()>;
}

/// Daily JSON files in a directory
pub struct JsonFileJournal {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileJournal {
    /// Open the journal, creating the directory if needed
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the entries of `date`
    pub fn file_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("chat_history_{}.json", date.format("%Y-%m-%d")))
    }

    /// All entries recorded on `date`
    pub async fn entries_for(&self, date: NaiveDate) -> Result<Vec<LogEntry>> {
        read_entries(&self.file_for(date)).await
    }
}

#[async_trait]
impl LogSink for JsonFileJournal {
    async fn append(&self, entry: &LogEntry) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let path = self.file_for(Utc::now().date_naive());
        let mut entries = read_entries(&path).await?;
        entries.push(entry.clone());

        let body = serde_json::to_string_pretty(&entries)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!("Logged interaction #{} to {:?}", entries.len(), path);
        Ok(())
    }
}

async fn read_entries(path: &Path) -> Result<Vec<LogEntry>> {
    if !tokio::fs::try_exists(path).await? {
        return Ok(Vec::new());
    }
    let content = tokio::fs::read_to_string(path).await?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&content).map_err(|e| {
        Error::Other(format!(
            "Interaction log {} is not a JSON array of entries: {}",
            path.display(),
            e
        ))
    })
}
