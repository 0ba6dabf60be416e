use crate::app::App;
use crate::error::TransportContext;
use crate::history::{Chat, HistoryClient};
use crate::out;
use crate::Cli;
use anyhow::Result;
use clap::Args;
use serde::Serialize;

#[derive(Args, Debug, Clone)]
pub struct ChatsArgs {
    /// Only show chats whose title contains this text or whose id equals it
    #[arg(long)]
    pub query: Option<String>,
}

#[derive(Serialize)]
struct ChatInfo {
    id: i64,
    title: String,
}

pub async fn run(cli: &Cli, args: &ChatsArgs) -> Result<()> {
    let app = App::new(cli).await?;
    app.tg.login().await.context_login()?;
    let chats = app.tg.list_chats().await.context_chats()?;
    let chats = filter_chats(chats, args.query.as_deref());

    if app.output.is_json() {
        let infos: Vec<ChatInfo> = chats
            .into_iter()
            .map(|c| ChatInfo {
                id: c.id,
                title: c.title,
            })
            .collect();
        out::write_json(&infos)?;
    } else if !app.output.is_none() {
        println!("{:<16} TITLE", "ID");
        for c in &chats {
            println!("{:<16} {}", c.id, out::truncate(&c.title, 60));
        }
    }
    Ok(())
}

fn filter_chats(chats: Vec<Chat>, query: Option<&str>) -> Vec<Chat> {
    let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) else {
        return chats;
    };
    let needle = query.to_lowercase();
    chats
        .into_iter()
        .filter(|c| c.id.to_string() == query || c.title.to_lowercase().contains(&needle))
        .collect()
}
