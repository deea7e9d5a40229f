use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::TextStore;
use crate::error::StoreError;
use crate::model::entry::TextEntry;

/// In-process store. Counts fetches and can be told to fail or lag.
#[derive(Default)]
pub struct MemoryTextStore {
    entries: Mutex<Vec<TextEntry>>,
    fetch_calls: AtomicU64,
    failing: AtomicBool,
    latency: Mutex<Option<Duration>>,
}

impl MemoryTextStore {
    pub fn new(entries: Vec<TextEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
            ..Default::default()
        }
    }

    pub fn set_entries(&self, entries: Vec<TextEntry>) {
        *self.entries.lock().unwrap_or_else(PoisonError::into_inner) = entries;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    pub fn fetch_calls(&self) -> u64 {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextStore for MemoryTextStore {
    async fn fetch_all(&self) -> Result<Vec<TextEntry>, StoreError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let latency = *self.latency.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store set to fail".into()));
        }

        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
