use std::path::PathBuf;

use async_trait::async_trait;
use tracing::warn;

use crate::error::Result;

/// Persisted release-tag counter.
///
/// `read` returns None when no usable value is stored; the caller supplies
/// the baseline. `write_if_unchanged` only persists when the store still
/// holds `expected`, so a concurrent writer cannot be silently overwritten.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn read(&self) -> Result<Option<u64>>;
    async fn write_if_unchanged(&self, expected: Option<u64>, next: u64) -> Result<bool>;
}

/// Plain text file holding one integer, the last-used version number.
pub struct FileCounterStore {
    path: PathBuf,
}

impl FileCounterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CounterStore for FileCounterStore {
    async fn read(&self) -> Result<Option<u64>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match content.trim().parse::<u64>() {
            Ok(value) => Ok(Some(value)),
            Err(_) => {
                warn!(
                    path = %self.path.display(),
                    "Counter file is unparseable, falling back to baseline"
                );
                Ok(None)
            }
        }
    }

    async fn write_if_unchanged(&self, expected: Option<u64>, next: u64) -> Result<bool> {
        let current = self.read().await?;
        if current != expected {
            warn!(
                path = %self.path.display(),
                ?expected,
                ?current,
                "Counter changed underneath, refusing to persist"
            );
            return Ok(false);
        }

        tokio::fs::write(&self.path, next.to_string()).await?;
        Ok(true)
    }
}
