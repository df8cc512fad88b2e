// File: ./src/source.rs
// Where the calendar document comes from. Loaded fresh on every cycle.
use crate::error::ParseError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

#[async_trait]
pub trait CalendarSource: Send + Sync + std::fmt::Debug {
    async fn load(&self) -> Result<Vec<u8>, ParseError>;
}

#[derive(Debug, Clone)]
pub struct FileCalendarSource {
    path: PathBuf,
}

impl FileCalendarSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CalendarSource for FileCalendarSource {
    async fn load(&self) -> Result<Vec<u8>, ParseError> {
        tokio::fs::read(&self.path).await.map_err(|e| {
            log::error!("Cannot read calendar {}: {}", self.path.display(), e);
            ParseError::Source(e)
        })
    }
}

/// A document held in memory; `replace` swaps it between cycles.
#[derive(Debug, Default)]
pub struct MemoryCalendarSource {
    document: Mutex<Vec<u8>>,
}

impl MemoryCalendarSource {
    pub fn new(document: impl Into<Vec<u8>>) -> Self {
        Self {
            document: Mutex::new(document.into()),
        }
    }

    pub fn replace(&self, document: impl Into<Vec<u8>>) {
        *self.document.lock().unwrap_or_else(PoisonError::into_inner) = document.into();
    }
}

#[async_trait]
impl CalendarSource for MemoryCalendarSource {
    async fn load(&self) -> Result<Vec<u8>, ParseError> {
        Ok(self
            .document
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AppContext, TestContext};

    #[tokio::test]
    async fn test_file_source_reads_every_time() {
        let ctx = TestContext::new();
        let path = ctx.resolve_data_path("termine.ics").unwrap();
        let source = FileCalendarSource::new(&path);

        assert!(matches!(source.load().await, Err(ParseError::Source(_))));

        std::fs::write(&path, "BEGIN:VCALENDAR\nEND:VCALENDAR\n").unwrap();
        assert_eq!(
            source.load().await.unwrap(),
            b"BEGIN:VCALENDAR\nEND:VCALENDAR\n".to_vec()
        );

        std::fs::write(&path, "changed").unwrap();
        assert_eq!(source.load().await.unwrap(), b"changed".to_vec());
    }

    #[tokio::test]
    async fn test_memory_source_replace() {
        let source = MemoryCalendarSource::new("one");
        assert_eq!(source.load().await.unwrap(), b"one".to_vec());
        source.replace("two");
        assert_eq!(source.load().await.unwrap(), b"two".to_vec());
    }
}
