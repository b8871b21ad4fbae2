//! One JSON file per thread under a directory

use crate::{ConversationStore, Result, Thread};
use async_trait::async_trait;
use memagent_config::paths::thread_file_stem;
use memagent_provider::Message;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Durable store. Each thread id has its own percent-encoded file name.
/// Threads are cached after first read; the cache lock is
/// held across disk writes so a file always matches its cached thread.
pub struct FileStore {
    dir: PathBuf,
    cache: Mutex<HashMap<String, Thread>>,
}

impl FileStore {
    /// Open (and create if needed) a thread directory
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        debug!("Thread directory: {:?}", dir);
        Ok(Self {
            dir,
            cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn thread_path(&self, thread_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", thread_file_stem(thread_id)))
    }

    async fn load(&self, thread_id: &str) -> Result<Option<Thread>> {
        let path = self.thread_path(thread_id);
        if !path.exists() {
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(&path).await?;
        let thread: Thread = serde_json::from_str(&content)?;
        debug!("Loaded thread {} from disk", thread_id);
        Ok(Some(thread))
    }

    async fn save(&self, thread: &Thread) -> Result<()> {
        let path = self.thread_path(&thread.id);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(thread)?;
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!("Saved thread {}", thread.id);
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for FileStore {
    async fn append(&self, thread_id: &str, messages: Vec<Message>) -> Result<usize> {
        let mut cache = self.cache.lock().await;
        let mut thread = match cache.get(thread_id) {
            Some(thread) => thread.clone(),
            None => self
                .load(thread_id)
                .await?
                .unwrap_or_else(|| Thread::new(thread_id)),
        };
        thread.append(messages);

        // only cache what made it to disk
        self.save(&thread).await?;
        let len = thread.len();
        cache.insert(thread_id.to_string(), thread);
        Ok(len)
    }

    async fn read(&self, thread_id: &str) -> Result<Vec<Message>> {
        let mut cache = self.cache.lock().await;
        if let Some(thread) = cache.get(thread_id) {
            return Ok(thread.messages.clone());
        }

        match self.load(thread_id).await? {
            Some(thread) => {
                let messages = thread.messages.clone();
                cache.insert(thread_id.to_string(), thread);
                Ok(messages)
            }
            None => Ok(Vec::new()),
        }
    }

    async fn clear(&self, thread_id: &str) -> Result<bool> {
        let mut cache = self.cache.lock().await;
        let cached = cache.remove(thread_id).is_some();

        let path = self.thread_path(thread_id);
        if path.exists() {
            tokio::fs::remove_file(path).await?;
            Ok(true)
        } else {
            Ok(cached)
        }
    }

    async fn list(&self) -> Result<Vec<String>> {
        let _cache = self.cache.lock().await;
        let mut ids = Vec::new();

        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let thread = tokio::fs::read_to_string(&path)
                .await
                .map_err(crate::StoreError::from)
                .and_then(|c| serde_json::from_str::<Thread>(&c).map_err(Into::into));
            match thread {
                Ok(thread) => ids.push(thread.id),
                Err(e) => warn!("Skipping unreadable thread file {:?}: {}", path, e),
            }
        }

        ids.sort();
        Ok(ids)
    }
}
