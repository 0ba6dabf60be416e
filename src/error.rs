//! Archive errors, plus context wrappers for failures coming from the remote client.

use crate::history::Chat;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Channel name or id is not set")]
    Configuration,

    #[error("No channel with name or id '{0}' found. Run `tgarchive chats` to list available chats.")]
    ChannelNotFound(String),

    #[error("Found {} channels with name or id '{query}':\n{}", .matches.len(), describe_matches(.matches))]
    AmbiguousChannel { query: String, matches: Vec<Chat> },

    #[error("{context}")]
    Transport {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to access {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive snapshot {} is not valid", .path.display())]
    Snapshot {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ArchiveError>;

fn describe_matches(matches: &[Chat]) -> String {
    matches
        .iter()
        .map(|c| format!("{} -- {}", c.id, c.title))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extension trait turning client failures into [`ArchiveError::Transport`]
/// with a description of the operation that failed.
pub trait TransportContext<T> {
    fn context_login(self) -> Result<T>;

    fn context_chats(self) -> Result<T>;

    fn context_history(self, chat_id: i64, offset: Option<i32>) -> Result<T>;

    fn context_download(self, chat_id: i64, msg_id: i32, media_id: i64) -> Result<T>;
}

impl<T> TransportContext<T> for anyhow::Result<T> {
    fn context_login(self) -> Result<T> {
        self.map_err(|source| ArchiveError::Transport {
            context: "Failed to confirm the Telegram session".to_string(),
            source,
        })
    }

    fn context_chats(self) -> Result<T> {
        self.map_err(|source| ArchiveError::Transport {
            context: "Failed to fetch chats from Telegram".to_string(),
            source,
        })
    }

    fn context_history(self, chat_id: i64, offset: Option<i32>) -> Result<T> {
        self.map_err(|source| ArchiveError::Transport {
            context: match offset {
                Some(offset) => format!(
                    "Failed to fetch messages older than {} from chat {}",
                    offset, chat_id
                ),
                None => format!("Failed to fetch newest messages from chat {}", chat_id),
            },
            source,
        })
    }

    fn context_download(self, chat_id: i64, msg_id: i32, media_id: i64) -> Result<T> {
        self.map_err(|source| ArchiveError::Transport {
            context: format!(
                "Failed to download media {} from chat {} message {}",
                media_id, chat_id, msg_id
            ),
            source,
        })
    }
}

/// Attach a path to local I/O failures.
pub trait IoContext<T> {
    fn context_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn context_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| ArchiveError::Io {
            path: path.into(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_channel_lists_every_match() {
        let err = ArchiveError::AmbiguousChannel {
            query: "123".to_string(),
            matches: vec![
                Chat {
                    id: 123,
                    title: "qwe".to_string(),
                },
                Chat {
                    id: 234,
                    title: "123".to_string(),
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Found 2 channels with name or id '123'"));
        assert!(msg.contains("123 -- qwe"));
        assert!(msg.contains("234 -- 123"));
    }

    #[test]
    fn test_history_context_names_offset() {
        let res: anyhow::Result<()> = Err(anyhow::anyhow!("connection reset"));
        let err = res.context_history(42, Some(7)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to fetch messages older than 7 from chat 42"
        );
        assert!(matches!(err, ArchiveError::Transport { .. }));
    }
}
