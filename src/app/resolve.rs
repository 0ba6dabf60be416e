use crate::error::{ArchiveError, IoContext, Result};
use crate::history::Chat;
use std::path::{Path, PathBuf};

/// Directory under the root that holds all Telegram channels.
pub const PROVIDER_DIR: &str = "telegram";

/// Find the single chat whose id equals `query` or whose title matches it
/// case-insensitively.
pub fn find_channel(chats: Vec<Chat>, query: &str) -> Result<Chat> {
    let wanted = query.to_lowercase();
    let mut matches: Vec<Chat> = chats
        .into_iter()
        .filter(|c| c.id.to_string() == query || c.title.to_lowercase() == wanted)
        .collect();

    match matches.len() {
        0 => Err(ArchiveError::ChannelNotFound(query.to_string())),
        1 => Ok(matches.remove(0)),
        _ => Err(ArchiveError::AmbiguousChannel {
            query: query.to_string(),
            matches,
        }),
    }
}

/// Replace every character that is not allowed in a file name with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// `<root>/telegram/<id>-<sanitized title>`
pub fn channel_dir(root: &Path, chat: &Chat) -> PathBuf {
    root.join(PROVIDER_DIR)
        .join(format!("{}-{}", chat.id, sanitize_file_name(&chat.title)))
}

pub async fn create_channel_dir(root: &Path, chat: &Chat) -> Result<PathBuf> {
    let dir = channel_dir(root, chat);
    tokio::fs::create_dir_all(&dir).await.context_path(&dir)?;
    Ok(dir)
}
