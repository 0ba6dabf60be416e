use crate::app::archive::{
    ArchiveOptions, ArchiveResult, Archiver, DEFAULT_PAGE_LIMIT, DEFAULT_UTC_OFFSET_HOURS,
};
use crate::app::App;
use crate::out::{self, progress::ConsoleProgress};
use crate::shutdown;
use crate::Cli;
use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Channel title or numeric id (repeatable)
    #[arg(long = "channel", required = true)]
    pub channels: Vec<String>,

    /// Root directory for archives
    #[arg(long)]
    pub dir: PathBuf,

    /// Also download video and other documents
    #[arg(long, default_value_t = false)]
    pub download_video: bool,

    /// Start from the newest message and refresh already archived ones
    #[arg(long, default_value_t = false)]
    pub reload_from_newest: bool,

    /// Messages requested per page
    #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
    pub page_size: usize,

    /// Hours east of UTC for archived timestamps
    #[arg(long, default_value_t = DEFAULT_UTC_OFFSET_HOURS, allow_hyphen_values = true)]
    pub utc_offset: i32,
}

impl DownloadArgs {
    fn options(&self) -> ArchiveOptions {
        ArchiveOptions {
            download_video: self.download_video,
            reload_from_newest: self.reload_from_newest,
            page_limit: self.page_size.max(1),
            utc_offset_hours: self.utc_offset,
        }
    }
}

#[derive(Serialize)]
struct ChannelSummary {
    id: i64,
    title: String,
    dir: String,
    archived: usize,
    groups_saved: u64,
    cancelled: bool,
}

impl From<&ArchiveResult> for ChannelSummary {
    fn from(r: &ArchiveResult) -> Self {
        Self {
            id: r.chat.id,
            title: r.chat.title.clone(),
            dir: r.dir.display().to_string(),
            archived: r.archived,
            groups_saved: r.groups_saved,
            cancelled: r.cancelled,
        }
    }
}

pub async fn run(cli: &Cli, args: &DownloadArgs) -> Result<()> {
    let app = App::new(cli).await?;
    let options = args.options();
    let progress = ConsoleProgress::new(app.output);
    let archiver = Archiver::new(&app.tg, &options, &progress);
    let shutdown = shutdown::global();

    let mut summaries = Vec::with_capacity(args.channels.len());
    for channel in &args.channels {
        if shutdown.is_triggered() {
            log::info!("Shutdown requested, not starting channel {}", channel);
            break;
        }

        let cancel = shutdown.child_token();
        let result = archiver
            .execute(channel, &args.dir, &cancel)
            .await
            .with_context(|| format!("Failed to archive channel '{}'", channel))?;

        if app.output.is_none() {
            continue;
        }
        let summary = ChannelSummary::from(&result);
        if app.output.is_json() {
            summaries.push(summary);
        } else {
            println!(
                "{} ({}): {} messages archived, {} saved this run{}",
                summary.title,
                summary.id,
                summary.archived,
                summary.groups_saved,
                if summary.cancelled { ", stopped early" } else { "" }
            );
        }
    }

    if app.output.is_json() {
        out::write_json(&summaries)?;
    }
    Ok(())
}
