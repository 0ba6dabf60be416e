mod history;

use anyhow::Result;
use grammers_client::types::Media;
use grammers_client::Client;
use grammers_mtsender::SenderPool;
use grammers_session::defs::PeerRef;
use grammers_session::storages::SqliteSession;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

pub const API_ID: i32 = 32529142;

/// A connected Telegram client with its pool runner handle.
pub struct TgClient {
    pub client: Client,
    pool_handle: tokio::task::JoinHandle<()>,
    /// Chats seen by the last dialog listing, by bare id.
    peers: Mutex<HashMap<i64, PeerRef>>,
    media: MediaCache<Media>,
}

impl TgClient {
    /// Connect to Telegram using a SQLite session file.
    pub fn connect(session_path: &str) -> Result<Self> {
        let session = Arc::new(
            SqliteSession::open(session_path)
                .map_err(|e| anyhow::anyhow!("Failed to open session: {}", e))?,
        );

        let pool = SenderPool::new(Arc::clone(&session) as Arc<SqliteSession>, API_ID);
        let client = Client::new(&pool);

        // Updates are never consumed by an archive run.
        let SenderPool {
            runner, updates: _, ..
        } = pool;

        let pool_handle = tokio::spawn(async move {
            runner.run().await;
        });

        Ok(TgClient {
            client,
            pool_handle,
            peers: Mutex::new(HashMap::new()),
            media: MediaCache::default(),
        })
    }
}

impl Drop for TgClient {
    fn drop(&mut self) {
        self.client.disconnect();
        self.pool_handle.abort();
    }
}

/// Downloadable media of the most recently fetched page, by photo or document id.
pub(crate) struct MediaCache<T> {
    items: Mutex<HashMap<i64, T>>,
}

impl<T> Default for MediaCache<T> {
    fn default() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> MediaCache<T> {
    /// Forget the previous page; its media is never downloaded after this.
    pub fn start_page(&self) {
        self.lock().clear();
    }

    pub fn insert(&self, id: i64, item: T) {
        self.lock().insert(id, item);
    }

    /// Remove and return the item; each one is downloaded at most once per fetch.
    pub fn take(&self, id: i64) -> Option<T> {
        self.lock().remove(&id)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i64, T>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
