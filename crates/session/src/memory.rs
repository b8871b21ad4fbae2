//! Process-local store; contents are lost on restart

use crate::{ConversationStore, Result, Thread};
use async_trait::async_trait;
use memagent_provider::Message;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
pub struct MemoryStore {
    threads: RwLock<HashMap<String, Thread>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn append(&self, thread_id: &str, messages: Vec<Message>) -> Result<usize> {
        let mut threads = self.threads.write().await;
        let thread = threads
            .entry(thread_id.to_string())
            .or_insert_with(|| Thread::new(thread_id));
        thread.append(messages);
        debug!("Thread {} now has {} messages", thread_id, thread.len());
        Ok(thread.len())
    }

    async fn read(&self, thread_id: &str) -> Result<Vec<Message>> {
        let threads = self.threads.read().await;
        Ok(threads
            .get(thread_id)
            .map(|t| t.messages.clone())
            .unwrap_or_default())
    }

    async fn clear(&self, thread_id: &str) -> Result<bool> {
        let removed = self.threads.write().await.remove(thread_id).is_some();
        debug!("Cleared thread {} (existed: {})", thread_id, removed);
        Ok(removed)
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.threads.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
