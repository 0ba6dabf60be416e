//! Incremental channel archiving.
//!
//! Walks the history of a channel backward from a persisted offset, commits one
//! message group at a time into the [`Archive`] and rewrites the snapshot after
//! every group, so an interrupted run resumes where it stopped.

use crate::app::media::{file_stem, MediaResolver};
use crate::app::progress::Progress;
use crate::app::resolve;
use crate::error::{ArchiveError, Result, TransportContext};
use crate::history::{Chat, HistoryClient, HistoryPage, RemoteMedia, RemoteMessage};
use crate::store::{Archive, MessageFile, SavedMessage};
use chrono::{DateTime, FixedOffset, Offset, SecondsFormat, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Offset applied to archived timestamps, in hours east of UTC.
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 4;

/// Telegram never returns more than this many messages per request.
pub const DEFAULT_PAGE_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    pub download_video: bool,
    /// Start from the newest message instead of the oldest archived one.
    pub reload_from_newest: bool,
    pub page_limit: usize,
    /// Hours east of UTC used when rendering archived timestamps.
    pub utc_offset_hours: i32,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            download_video: false,
            reload_from_newest: false,
            page_limit: DEFAULT_PAGE_LIMIT,
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveResult {
    pub chat: Chat,
    pub dir: PathBuf,
    pub groups_saved: u64,
    pub archived: usize,
    pub cancelled: bool,
}

/// Messages sharing an album id, or a single message, in page order.
#[derive(Debug)]
pub struct MessageGroup<'a> {
    messages: Vec<&'a RemoteMessage>,
}

impl<'a> MessageGroup<'a> {
    /// First message carrying text, which supplies the archived text and id.
    pub fn main_message(&self) -> Option<&'a RemoteMessage> {
        self.messages
            .iter()
            .copied()
            .find(|m| !m.text.trim().is_empty())
    }

    fn first(&self) -> &'a RemoteMessage {
        self.messages[0]
    }

    fn earliest(&self) -> DateTime<Utc> {
        self.messages
            .iter()
            .map(|m| m.date)
            .min()
            .unwrap_or_else(|| self.first().date)
    }

    pub fn max_id(&self) -> i32 {
        self.messages.iter().map(|m| m.id).max().unwrap_or(self.first().id)
    }

    /// Media of the group ordered by ascending message id.
    pub fn media(&self) -> Vec<&'a RemoteMedia> {
        let mut by_id = self.messages.clone();
        by_id.sort_by_key(|m| m.id);
        by_id.iter().filter_map(|m| m.media.as_ref()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum GroupKey {
    Album(i64),
    Single(i32),
}

/// Partition a page into groups, newest group first. Groups with equal
/// timestamps keep the order in which the page lists them.
pub fn group_messages(messages: &[RemoteMessage]) -> Vec<MessageGroup<'_>> {
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<MessageGroup<'_>> = Vec::new();

    for msg in messages {
        let key = match msg.grouped_id {
            Some(g) if g != 0 => GroupKey::Album(g),
            _ => GroupKey::Single(msg.id),
        };
        match index.get(&key) {
            Some(&i) => groups[i].messages.push(msg),
            None => {
                index.insert(key, groups.len());
                groups.push(MessageGroup {
                    messages: vec![msg],
                });
            }
        }
    }

    groups.sort_by(|a, b| b.earliest().cmp(&a.earliest()));
    groups
}

/// RFC 3339 rendering of `date` at a fixed offset of `offset_hours` east of UTC.
/// Out-of-range offsets render in UTC.
pub fn format_timestamp(date: DateTime<Utc>, offset_hours: i32) -> String {
    let offset = offset_hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix());
    date.with_timezone(&offset)
        .to_rfc3339_opts(SecondsFormat::Secs, false)
}

pub struct Archiver<'a, C: HistoryClient + ?Sized, P: Progress + ?Sized> {
    client: &'a C,
    options: &'a ArchiveOptions,
    progress: &'a P,
}

impl<'a, C: HistoryClient + ?Sized, P: Progress + ?Sized> Archiver<'a, C, P> {
    pub fn new(client: &'a C, options: &'a ArchiveOptions, progress: &'a P) -> Self {
        Self {
            client,
            options,
            progress,
        }
    }

    /// Resolve `channel` by id or title and archive it under `root`.
    pub async fn execute(
        &self,
        channel: &str,
        root: &Path,
        cancel: &CancellationToken,
    ) -> Result<ArchiveResult> {
        let channel = channel.trim();
        if channel.is_empty() {
            return Err(ArchiveError::Configuration);
        }

        let principal = self.client.login().await.context_login()?;
        self.progress.logged_in(&principal);

        let chats = self.client.list_chats().await.context_chats()?;
        let chat = resolve::find_channel(chats, channel)?;
        let dir = resolve::create_channel_dir(root, &chat).await?;
        self.progress.channel_resolved(&chat, &dir);

        self.synchronize(chat, dir, cancel).await
    }

    /// Bring the archive in `dir` up to date with the remote history of `chat`.
    pub async fn synchronize(
        &self,
        chat: Chat,
        dir: PathBuf,
        cancel: &CancellationToken,
    ) -> Result<ArchiveResult> {
        let mut archive = Archive::open(&dir).await?;

        let mut offset = if self.options.reload_from_newest {
            None
        } else {
            archive.min_id()
        };
        log::debug!(
            "Archiving chat {} into {} starting at offset {:?}",
            chat.id,
            dir.display(),
            offset
        );

        let mut groups_saved = 0u64;
        let mut cancelled = false;

        loop {
            self.progress.fetching(offset);
            let page = self
                .client
                .fetch_history(&chat, offset, self.options.page_limit)
                .await
                .context_history(chat.id, offset)?;
            self.progress.fetched(page.messages.len());

            let Some(oldest) = page.oldest_id else {
                self.progress.complete(archive.len());
                break;
            };

            let mut deferred_offset = None;
            let mut first_in_page = true;
            for group in group_messages(&page.messages) {
                let main = match group.main_message() {
                    Some(main) => main,
                    // Nothing committed yet in this page: commit the group as it is.
                    None if first_in_page => group.first(),
                    // Deferring must move the window strictly below the current offset,
                    // otherwise the same page comes back forever.
                    None if offset.map_or(true, |o| group.max_id() + 1 < o) => {
                        let max_id = group.max_id();
                        log::debug!("Group ending at {} has no text yet, deferring", max_id);
                        self.progress.group_deferred(max_id);
                        deferred_offset = Some(max_id + 1);
                        break;
                    }
                    None => {
                        log::debug!(
                            "Group ending at {} cannot move below offset {:?}, committing as is",
                            group.max_id(),
                            offset
                        );
                        group.first()
                    }
                };
                first_in_page = false;

                let started = Instant::now();
                let saved = self.commit_group(&chat, &dir, &page, &group, main, &archive).await?;
                let files = saved.files.len();
                let merged = archive.merge(saved);
                archive.save().await?;
                log::debug!("{:?} message {} in {}", merged, main.id, archive.path().display());
                groups_saved += 1;
                self.progress
                    .group_saved(main.id, main.date, files, started.elapsed());
            }

            offset = Some(deferred_offset.unwrap_or(oldest));

            if cancel.is_cancelled() {
                log::info!("Cancellation requested, stopping after offset {:?}", offset);
                self.progress.cancelled(archive.len());
                cancelled = true;
                break;
            }
        }

        archive.save().await?;

        Ok(ArchiveResult {
            chat,
            archived: archive.len(),
            dir,
            groups_saved,
            cancelled,
        })
    }

    /// Build the archive record for a group whose main message is `main`.
    async fn commit_group(
        &self,
        chat: &Chat,
        dir: &Path,
        page: &HistoryPage,
        group: &MessageGroup<'_>,
        main: &RemoteMessage,
        archive: &Archive,
    ) -> Result<SavedMessage> {
        let media = group.media();

        let files = match archive.get(main.id) {
            // Already archived with everything on disk: only text and date are refreshed.
            Some(existing) if existing.is_fully_downloaded(media.len()) => existing.files.clone(),
            _ => self.resolve_media(chat, dir, main, &media).await?,
        };

        Ok(SavedMessage {
            id: main.id,
            from: self.client.resolve_sender_name(page, main.author()),
            text: main.text.clone(),
            date_time: format_timestamp(main.date, self.options.utc_offset_hours),
            files,
        })
    }

    async fn resolve_media(
        &self,
        chat: &Chat,
        dir: &Path,
        main: &RemoteMessage,
        media: &[&RemoteMedia],
    ) -> Result<Vec<MessageFile>> {
        let resolver = MediaResolver {
            client: self.client,
            dir,
            chat_id: chat.id,
            download_video: self.options.download_video,
        };

        let mut files = Vec::with_capacity(media.len());
        for (i, item) in media.iter().enumerate() {
            let stem = file_stem(main.date, i + 1);
            files.push(resolver.resolve(main.id, &stem, item).await?);
        }
        Ok(files)
    }
}
