//! Where the microcopy rows come from.
//!
//! The cache only ever asks for the complete table; stores do no filtering
//! or pagination.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::Config;
use crate::error::{ConfigError, StoreError};
use crate::model::entry::TextEntry;

pub mod file;
pub mod memory;
pub mod rest;

pub use file::FileTextStore;
pub use memory::MemoryTextStore;
pub use rest::RestTextStore;

#[async_trait]
pub trait TextStore: Send + Sync + 'static {
    async fn fetch_all(&self) -> Result<Vec<TextEntry>, StoreError>;

    fn describe(&self) -> String;
}

pub fn from_config(config: &Config) -> Result<Arc<dyn TextStore>, ConfigError> {
    if let Some(url) = &config.store_url {
        info!("Using hosted text store at {url}");
        let store = RestTextStore::new(
            url,
            &config.table,
            &config.api_key,
            config.request_timeout,
            config.max_retries,
        )?;
        return Ok(Arc::new(store));
    }

    if let Some(path) = &config.seed_file {
        info!("Using text export at {}", path.display());
        return Ok(Arc::new(FileTextStore::new(path)));
    }

    Err(ConfigError::MissingStore)
}
