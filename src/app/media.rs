use crate::error::{IoContext, Result, TransportContext};
use crate::history::{DocumentRef, HistoryClient, PhotoRef, RemoteMedia};
use crate::store::MessageFile;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// `<YYYYMMDD-HHMMSS>-<seq>` for the main message of a group.
pub fn file_stem(date: DateTime<Utc>, seq: usize) -> String {
    format!("{}-{}", date.format("%Y%m%d-%H%M%S"), seq)
}

/// Extension (with the dot) for a video, taken from its original name or its MIME type.
pub fn video_extension(file_name: &str, mime_type: &str) -> String {
    let from_name = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty());
    match from_name {
        Some(ext) => format!(".{}", ext),
        None => match mime_type {
            "video/mp4" => ".mp4".to_string(),
            _ => String::new(),
        },
    }
}

/// Resolves the media of one committed group into [`MessageFile`] records,
/// downloading whatever is not already in the channel directory.
pub struct MediaResolver<'a, C: HistoryClient + ?Sized> {
    pub client: &'a C,
    pub dir: &'a Path,
    pub chat_id: i64,
    pub download_video: bool,
}

impl<C: HistoryClient + ?Sized> MediaResolver<'_, C> {
    pub async fn resolve(&self, msg_id: i32, stem: &str, media: &RemoteMedia) -> Result<MessageFile> {
        match media {
            RemoteMedia::Photo(photo) => self.photo(msg_id, stem, photo).await,
            RemoteMedia::Video(document) => self.video(msg_id, stem, document).await,
        }
    }

    async fn photo(&self, msg_id: i32, stem: &str, photo: &PhotoRef) -> Result<MessageFile> {
        let name = format!("{}.jpg", stem);
        let path = self.dir.join(&name);
        if !exists(&path).await? {
            let part = part_path(&path);
            let mut file = tokio::fs::File::create(&part).await.context_path(&part)?;
            let res = self
                .client
                .download_photo(photo, &mut file)
                .await
                .context_download(self.chat_id, msg_id, photo.id);
            finish(file, res, &part, &path).await?;
        } else {
            log::debug!("{} already present, skipping download", path.display());
        }

        Ok(MessageFile {
            id: photo.id,
            original_file_name: String::new(),
            mime_type: None,
            downloaded: true,
            downloaded_file_name: name,
        })
    }

    async fn video(&self, msg_id: i32, stem: &str, document: &DocumentRef) -> Result<MessageFile> {
        if !self.download_video {
            return Ok(MessageFile {
                id: document.id,
                original_file_name: document.file_name.clone(),
                mime_type: Some(document.mime_type.clone()),
                downloaded: false,
                downloaded_file_name: String::new(),
            });
        }

        let name = format!(
            "{}{}",
            stem,
            video_extension(&document.file_name, &document.mime_type)
        );
        let path = self.dir.join(&name);
        if !exists(&path).await? {
            let part = part_path(&path);
            let mut file = tokio::fs::File::create(&part).await.context_path(&part)?;
            let res = self
                .client
                .download_video(document, &mut file)
                .await
                .context_download(self.chat_id, msg_id, document.id);
            finish(file, res, &part, &path).await?;
        } else {
            log::debug!("{} already present, skipping download", path.display());
        }

        Ok(MessageFile {
            id: document.id,
            original_file_name: document.file_name.clone(),
            mime_type: Some(document.mime_type.clone()),
            downloaded: true,
            downloaded_file_name: name,
        })
    }
}

async fn exists(path: &Path) -> Result<bool> {
    tokio::fs::try_exists(path).await.context_path(path)
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Move a completed download into place, or drop the partial file on failure.
async fn finish(mut file: tokio::fs::File, res: Result<()>, part: &Path, path: &Path) -> Result<()> {
    if let Err(e) = res {
        drop(file);
        let _ = tokio::fs::remove_file(part).await;
        return Err(e);
    }
    file.flush().await.context_path(part)?;
    drop(file);
    tokio::fs::rename(part, path).await.context_path(path)
}
