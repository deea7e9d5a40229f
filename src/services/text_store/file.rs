use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use super::TextStore;
use crate::error::StoreError;
use crate::model::entry::TextEntry;
use crate::services::encoding;

/// A JSON export of the microcopy table on disk.
pub struct FileTextStore {
    path: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Export {
    Rows(Vec<TextEntry>),
    Wrapped { entries: Vec<TextEntry> },
}

impl FileTextStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl TextStore for FileTextStore {
    async fn fetch_all(&self) -> Result<Vec<TextEntry>, StoreError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.display().to_string(),
                source,
            })?;

        let decoded = encoding::decode(&bytes);
        if decoded.had_errors {
            warn!(
                path = %self.path.display(),
                encoding = %decoded.encoding,
                "microcopy export decoded with replacement characters"
            );
        }

        let export: Export = serde_json::from_str(&decoded.text)?;
        Ok(match export {
            Export::Rows(rows) => rows,
            Export::Wrapped { entries } => entries,
        })
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}
