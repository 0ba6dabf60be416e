//! Remote history abstraction consumed by the archive synchronizer.
//!
//! [`HistoryClient`] is transport-agnostic; [`crate::tg::TgClient`] implements it
//! over grammers, tests implement it in memory.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::io::AsyncWrite;

/// The account a session is logged in as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    pub name: String,
}

/// A group or channel the account can read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chat {
    pub id: i64,
    pub title: String,
}

/// Reference to a user, group or channel mentioned by a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerRef {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRef {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub id: i64,
    /// Original file name, empty when the document carries none.
    pub file_name: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteMedia {
    Photo(PhotoRef),
    Video(DocumentRef),
}

#[derive(Debug, Clone)]
pub struct RemoteMessage {
    pub id: i32,
    /// Album id; `None` or 0 means the message stands alone.
    pub grouped_id: Option<i64>,
    pub date: DateTime<Utc>,
    pub text: String,
    pub media: Option<RemoteMedia>,
    pub sender: Option<PeerRef>,
    pub peer: PeerRef,
}

impl RemoteMessage {
    /// Explicit sender, or the chat the message was posted to.
    pub fn author(&self) -> PeerRef {
        self.sender.unwrap_or(self.peer)
    }
}

/// One page of history, newest message first.
#[derive(Debug, Clone, Default)]
pub struct HistoryPage {
    pub messages: Vec<RemoteMessage>,
    /// Display names of the peers referenced by this page.
    pub names: HashMap<i64, String>,
    /// Smallest id the server returned, counting service messages that were
    /// left out of `messages`. `None` means the history is exhausted.
    pub oldest_id: Option<i32>,
}

impl HistoryPage {
    pub fn new(messages: Vec<RemoteMessage>, names: HashMap<i64, String>) -> Self {
        let oldest_id = messages.iter().map(|m| m.id).min();
        Self {
            messages,
            names,
            oldest_id,
        }
    }
}

pub type Sink<'a> = dyn AsyncWrite + Unpin + Send + 'a;

#[async_trait]
pub trait HistoryClient: Send + Sync {
    /// Confirm the session is authorized and report who it belongs to.
    async fn login(&self) -> Result<Principal>;

    async fn list_chats(&self) -> Result<Vec<Chat>>;

    /// Fetch up to `limit` messages with ids strictly below `offset`,
    /// or the newest ones when `offset` is `None`.
    async fn fetch_history(
        &self,
        chat: &Chat,
        offset: Option<i32>,
        limit: usize,
    ) -> Result<HistoryPage>;

    /// Display name of `peer` as known by `page`; empty when unknown.
    fn resolve_sender_name(&self, page: &HistoryPage, peer: PeerRef) -> String {
        page.names.get(&peer.id).cloned().unwrap_or_default()
    }

    async fn download_photo(&self, photo: &PhotoRef, sink: &mut Sink<'_>) -> Result<()>;

    async fn download_video(&self, document: &DocumentRef, sink: &mut Sink<'_>) -> Result<()>;
}
