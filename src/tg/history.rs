use super::TgClient;
use crate::history::{
    Chat, DocumentRef, HistoryClient, HistoryPage, PeerRef as RemotePeer, PhotoRef, Principal,
    RemoteMedia, RemoteMessage, Sink,
};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use grammers_client::types::{Media, Peer};
use grammers_session::defs::PeerRef;
use grammers_tl_types as tl;
use std::sync::{Mutex, MutexGuard};
use tokio::io::AsyncWriteExt;

#[async_trait]
impl HistoryClient for TgClient {
    async fn login(&self) -> Result<Principal> {
        if !self.client.is_authorized().await? {
            bail!("Session expired or not authenticated");
        }
        let me = self.client.get_me().await?;
        Ok(Principal {
            id: me.bare_id(),
            name: me.full_name(),
        })
    }

    async fn list_chats(&self) -> Result<Vec<Chat>> {
        let mut chats = Vec::new();
        let mut dialogs = self.client.iter_dialogs();
        while let Some(dialog) = dialogs.next().await? {
            let peer = dialog.peer();
            // Only groups and channels have a history worth archiving.
            if let Peer::User(_) = peer {
                continue;
            }
            let id = peer.id().bare_id();
            lock(&self.peers).insert(id, PeerRef::from(peer));
            chats.push(Chat {
                id,
                title: peer_name(peer),
            });
        }
        Ok(chats)
    }

    async fn fetch_history(
        &self,
        chat: &Chat,
        offset: Option<i32>,
        limit: usize,
    ) -> Result<HistoryPage> {
        let peer = lock(&self.peers)
            .get(&chat.id)
            .cloned()
            .ok_or_else(|| anyhow!("Chat {} is not among the known dialogs", chat.id))?;

        let mut iter = self.client.iter_messages(peer).limit(limit);
        if let Some(offset) = offset {
            iter = iter.offset_id(offset);
        }

        self.media.start_page();
        let mut page = HistoryPage::default();
        while let Some(msg) = iter.next().await? {
            page.oldest_id = Some(page.oldest_id.map_or(msg.id(), |o| o.min(msg.id())));

            // Service entries (pins, joins, title changes) carry no content.
            if msg.action().is_some() {
                continue;
            }

            let sender = msg.sender().map(|s| {
                let id = s.id().bare_id();
                page.names.entry(id).or_insert_with(|| peer_name(&s));
                RemotePeer { id }
            });
            if let Ok(p) = msg.peer() {
                page.names
                    .entry(p.id().bare_id())
                    .or_insert_with(|| peer_name(&p));
            }

            let media = msg.media().and_then(|m| {
                let remote = remote_media(&m)?;
                self.media.insert(media_id(&remote), m);
                Some(remote)
            });

            page.messages.push(RemoteMessage {
                id: msg.id(),
                grouped_id: msg.grouped_id(),
                date: msg.date(),
                text: msg.text().to_string(),
                media,
                sender,
                peer: RemotePeer {
                    id: msg.peer_id().bare_id(),
                },
            });
        }

        log::debug!(
            "Fetched {} messages from chat {} (offset {:?})",
            page.messages.len(),
            chat.id,
            offset
        );
        Ok(page)
    }

    async fn download_photo(&self, photo: &PhotoRef, sink: &mut Sink<'_>) -> Result<()> {
        self.download(photo.id, sink).await
    }

    async fn download_video(&self, document: &DocumentRef, sink: &mut Sink<'_>) -> Result<()> {
        self.download(document.id, sink).await
    }
}

impl TgClient {
    async fn download(&self, id: i64, sink: &mut Sink<'_>) -> Result<()> {
        let media = self
            .media
            .take(id)
            .ok_or_else(|| anyhow!("Media {} was not seen in fetched history", id))?;

        let mut download = self.client.iter_download(&media);
        let mut written = 0usize;
        while let Some(chunk) = download.next().await? {
            sink.write_all(&chunk).await?;
            written += chunk.len();
        }
        log::trace!("Downloaded media {} ({} bytes)", id, written);
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn peer_name(peer: &Peer) -> String {
    match peer {
        Peer::User(user) => user.full_name(),
        Peer::Group(group) => group.title().map(|s| s.to_string()).unwrap_or_default(),
        Peer::Channel(channel) => channel.title().to_string(),
    }
}

fn media_id(media: &RemoteMedia) -> i64 {
    match media {
        RemoteMedia::Photo(p) => p.id,
        RemoteMedia::Video(d) => d.id,
    }
}

/// Photos and documents are archived; every other attachment is ignored.
fn remote_media(media: &Media) -> Option<RemoteMedia> {
    match media {
        Media::Photo(photo) => match photo.raw.photo.as_ref()? {
            tl::enums::Photo::Photo(p) => Some(RemoteMedia::Photo(PhotoRef { id: p.id })),
            tl::enums::Photo::Empty(_) => None,
        },
        Media::Document(doc) => match doc.raw.document.as_ref()? {
            tl::enums::Document::Document(d) => {
                let file_name = d
                    .attributes
                    .iter()
                    .find_map(|attr| {
                        if let tl::enums::DocumentAttribute::Filename(f) = attr {
                            Some(f.file_name.clone())
                        } else {
                            None
                        }
                    })
                    .unwrap_or_default();
                Some(RemoteMedia::Video(DocumentRef {
                    id: d.id,
                    file_name,
                    mime_type: d.mime_type.clone(),
                }))
            }
            tl::enums::Document::Empty(_) => None,
        },
        _ => None,
    }
}
