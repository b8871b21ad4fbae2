//! Conversation threads and the stores that keep them
//!
//! A thread is the ordered message log for one `thread_id`. Stores only
//! ever append whole turns, so a reader never sees half of one.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use memagent_provider::Message;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("thread storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("thread file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// One conversation thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
}

impl Thread {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Local::now();
        Self {
            id: id.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn append(&mut self, messages: Vec<Message>) {
        if messages.is_empty() {
            return;
        }
        self.messages.extend(messages);
        self.updated_at = Local::now();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Keyed, append-only message logs
///
/// Unknown thread ids read as empty. `append` adds the batch in one step
/// and returns the thread length afterwards.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn append(&self, thread_id: &str, messages: Vec<Message>) -> Result<usize>;

    async fn read(&self, thread_id: &str) -> Result<Vec<Message>>;

    /// Drop a thread. Returns whether anything was removed.
    async fn clear(&self, thread_id: &str) -> Result<bool>;

    async fn list(&self) -> Result<Vec<String>>;
}
