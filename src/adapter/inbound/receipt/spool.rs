//! Receipt source that reads JSON receipts dropped into a spool directory.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::domain::Receipt;
use crate::error::{Error, Result};
use crate::port::ReceiptSource;

const PENDING_EXTENSION: &str = "json";
const DONE_EXTENSION: &str = "done";
const FAILED_EXTENSION: &str = "failed";

/// Reads receipts written as `*.json` files into a directory.
///
/// Files are taken in name order. A consumed file is renamed to `.done`; a
/// file that does not parse is renamed to `.failed` and skipped. When
/// `evidence_ref` is absent the file path is used.
pub struct SpoolReceiptSource {
    dir: PathBuf,
    poll_interval: Duration,
    queue: VecDeque<PathBuf>,
}

impl SpoolReceiptSource {
    /// Open `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>, poll_interval: Duration) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        info!(dir = %dir.display(), "Receipt spool opened");
        Ok(Self {
            dir,
            poll_interval: poll_interval.max(Duration::from_millis(10)),
            queue: VecDeque::new(),
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn scan(&mut self) -> Result<()> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == PENDING_EXTENSION) {
                found.push(path);
            }
        }
        found.sort();
        self.queue.extend(found);
        Ok(())
    }

    async fn consume(path: &Path) -> Result<Receipt> {
        let content = tokio::fs::read_to_string(path).await?;
        let receipt = parse_receipt(&content, path);
        let target = if receipt.is_ok() {
            DONE_EXTENSION
        } else {
            FAILED_EXTENSION
        };
        tokio::fs::rename(path, path.with_extension(target)).await?;
        receipt
    }
}

fn parse_receipt(content: &str, path: &Path) -> Result<Receipt> {
    let mut value: serde_json::Value = serde_json::from_str(content)?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| Error::Parse(format!("{} is not a JSON object", path.display())))?;
    object
        .entry("evidence_ref")
        .or_insert_with(|| serde_json::Value::String(path.display().to_string()));
    Ok(serde_json::from_value(value)?)
}

#[async_trait]
impl ReceiptSource for SpoolReceiptSource {
    async fn next_receipt(&mut self) -> Option<Receipt> {
        loop {
            while let Some(path) = self.queue.pop_front() {
                match Self::consume(&path).await {
                    Ok(receipt) => {
                        debug!(file = %path.display(), "Receipt taken from spool");
                        return Some(receipt);
                    }
                    Err(e) => {
                        warn!(file = %path.display(), error = %e, "Skipping unreadable receipt");
                    }
                }
            }
            if let Err(e) = self.scan().await {
                warn!(dir = %self.dir.display(), error = %e, "Receipt spool scan failed");
            }
            if self.queue.is_empty() {
                tokio::time::sleep(self.poll_interval).await;
            }
        }
    }
}
