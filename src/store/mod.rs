use crate::error::{ArchiveError, IoContext, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Snapshot file kept next to the downloaded media of a channel.
pub const SNAPSHOT_FILE: &str = "_messages.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageFile {
    /// Remote media id.
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub original_file_name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    pub downloaded: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub downloaded_file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SavedMessage {
    pub id: i32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub from: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub date_time: String,
    #[serde(default)]
    pub files: Vec<MessageFile>,
}

impl SavedMessage {
    /// True when the entry holds exactly `media_count` files and every one is on disk.
    pub fn is_fully_downloaded(&self, media_count: usize) -> bool {
        self.files.len() == media_count && self.files.iter().all(|f| f.downloaded)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    Inserted,
    Updated,
}

/// In-memory archive of one channel, indexed by message id.
///
/// Order is never tracked here: the snapshot is sorted by id, newest first,
/// each time it is written.
pub struct Archive {
    path: PathBuf,
    messages: HashMap<i32, SavedMessage>,
}

impl Archive {
    /// Load the snapshot in `dir`, or start empty when there is none.
    pub async fn open(dir: &Path) -> Result<Self> {
        let path = dir.join(SNAPSHOT_FILE);
        let mut messages = HashMap::new();

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let saved: Vec<SavedMessage> =
                    serde_json::from_slice(&bytes).map_err(|source| ArchiveError::Snapshot {
                        path: path.clone(),
                        source,
                    })?;
                for message in saved {
                    if let Some(previous) = messages.insert(message.id, message) {
                        log::warn!(
                            "Duplicate message {} in {}, keeping the later entry",
                            previous.id,
                            path.display()
                        );
                    }
                }
                log::debug!("Loaded {} messages from {}", messages.len(), path.display());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).context_path(path),
        }

        Ok(Archive { path, messages })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: i32) -> Option<&SavedMessage> {
        self.messages.get(&id)
    }

    /// Oldest archived message id.
    pub fn min_id(&self) -> Option<i32> {
        self.messages.keys().copied().min()
    }

    /// Insert `message`, or refresh text, timestamp and files of the entry
    /// with the same id. The sender of an existing entry is kept.
    pub fn merge(&mut self, message: SavedMessage) -> Merge {
        match self.messages.get_mut(&message.id) {
            Some(existing) => {
                existing.text = message.text;
                existing.date_time = message.date_time;
                existing.files = message.files;
                Merge::Updated
            }
            None => {
                self.messages.insert(message.id, message);
                Merge::Inserted
            }
        }
    }

    /// Messages sorted by id, newest first.
    pub fn sorted(&self) -> Vec<&SavedMessage> {
        let mut sorted: Vec<&SavedMessage> = self.messages.values().collect();
        sorted.sort_by(|a, b| b.id.cmp(&a.id));
        sorted
    }

    /// Rewrite the whole snapshot. The JSON goes to a sibling temp file first
    /// and is renamed over the snapshot, so readers never see a partial file.
    pub async fn save(&self) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.sorted()).map_err(|source| {
            ArchiveError::Snapshot {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await.context_path(&tmp)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .context_path(&self.path)?;
        Ok(())
    }
}
