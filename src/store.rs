//! Persistence of crawl output.
//!
//! Storage sits behind [`ArticleStore`]; the crawler never touches it.
//! Deduplication across runs is a store concern.
//!
//! # Output Structure
//!
//! [`JsonFileStore`] writes the whole [`CrawlResult`] per edition:
//! ```text
//! json_output_dir/
//! └── 2026-10-16/
//!     ├── morning.json
//!     ├── afternoon.json
//!     └── evening.json
//! ```
//!
//! A run that already wrote the same edition overwrites it.

use crate::models::{Article, CrawlResult};
use crate::utils::edition_for;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{error, info, instrument};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize crawl result: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Sink for normalized articles.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Persist a batch. Returns how many were newly stored.
    async fn save_many(&self, articles: &[Article]) -> Result<usize, StoreError>;

    /// Persist a full crawl. The default stores only the articles.
    async fn save_crawl(&self, result: &CrawlResult) -> Result<usize, StoreError> {
        self.save_many(&result.articles).await
    }
}

/// Writes JSON files under a date/edition directory layout.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `{root}/{YYYY-MM-DD}/{edition}.json` for the local time `at`.
    pub fn edition_path(&self, at: DateTime<Local>) -> PathBuf {
        self.root
            .join(at.date_naive().to_string())
            .join(format!("{}.json", edition_for(at.time())))
    }

    async fn write_json(&self, path: &Path, json: String) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(dir) = path.parent() {
            info!(dir = %dir.display(), "Ensuring JSON directory exists");
            if let Err(e) = fs::create_dir_all(dir).await {
                error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
                return Err(io_err(e));
            }
        }
        fs::write(path, json).await.map_err(io_err)?;
        info!(path = %path.display(), "Wrote JSON crawl file");
        Ok(())
    }
}

#[async_trait]
impl ArticleStore for JsonFileStore {
    #[instrument(level = "info", skip_all, fields(root = %self.root.display(), count = articles.len()))]
    async fn save_many(&self, articles: &[Article]) -> Result<usize, StoreError> {
        let path = self.edition_path(Local::now());
        let json = serde_json::to_string_pretty(articles)?;
        self.write_json(&path, json).await?;
        Ok(articles.len())
    }

    /// Write the whole `result` to its edition file.
    ///
    /// # Arguments
    ///
    /// * `result` - The crawl to persist, articles and per-source outcomes
    ///
    /// # Returns
    ///
    /// The number of articles written. The file is
    /// `{root}/{date}/{edition}.json`, dated by `result.started_at` in local time.
    ///
    /// # Errors
    ///
    /// [`StoreError::Serialize`] if the result cannot be encoded, or
    /// [`StoreError::Io`] if the directory or file cannot be written.
    #[instrument(level = "info", skip_all, fields(root = %self.root.display(), count = result.articles.len()))]
    async fn save_crawl(&self, result: &CrawlResult) -> Result<usize, StoreError> {
        let path = self.edition_path(result.started_at.with_timezone(&Local));
        let json = serde_json::to_string_pretty(result)?;
        self.write_json(&path, json).await?;
        Ok(result.articles.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Impact, SourceOutcome, SourceStatus};
    use chrono::{TimeZone, Utc};

    fn article() -> Article {
        Article {
            title: "GST council trims rates".to_string(),
            content: "The GST council met on Friday.".to_string(),
            summary: "The GST council met on Friday.".to_string(),
            source: "wire-service".to_string(),
            url: "https://wire.example.com/news/1".to_string(),
            published_at: Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap(),
            category: Category::Tax,
            impact: Impact::Low,
            tags: vec!["gst".to_string()],
        }
    }

    #[test]
    fn test_edition_path_layout() {
        let store = JsonFileStore::new("/tmp/out");
        let at = Local.with_ymd_and_hms(2026, 10, 16, 17, 30, 0).unwrap();
        assert_eq!(
            store.edition_path(at),
            PathBuf::from("/tmp/out/2026-10-16/evening.json")
        );
    }

    #[tokio::test]
    async fn test_save_crawl_writes_whole_result() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(tmp.path());
        let started_at = Utc::now();
        let result = CrawlResult {
            started_at,
            finished_at: started_at,
            articles: vec![article()],
            sources: vec![SourceOutcome {
                name: "wire-service".to_string(),
                status: SourceStatus::Ok,
                error: None,
                article_count: 1,
            }],
        };

        let saved = store.save_crawl(&result).await.unwrap();
        assert_eq!(saved, 1);

        let path = store.edition_path(started_at.with_timezone(&Local));
        let text = tokio::fs::read_to_string(&path).await.unwrap();
        let back: CrawlResult = serde_json::from_str(&text).unwrap();
        assert_eq!(back.articles, result.articles);
        assert_eq!(back.sources, result.sources);
    }

    #[tokio::test]
    async fn test_save_many_writes_articles() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(tmp.path());
        assert_eq!(store.save_many(&[article(), article()]).await.unwrap(), 2);

        let day = std::fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(day, 1);
    }

    #[tokio::test]
    async fn test_unwritable_root_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("not-a-dir");
        std::fs::write(&file, "x").unwrap();
        let store = JsonFileStore::new(&file);
        assert!(matches!(store.save_many(&[article()]).await, Err(StoreError::Io { .. })));
    }
}
