pub mod archive;
pub mod media;
pub mod progress;
pub mod resolve;

use crate::out::OutputMode;
use crate::tg::TgClient;
use crate::Cli;
use anyhow::{Context, Result};

pub struct App {
    pub tg: TgClient,
    pub output: OutputMode,
}

impl App {
    /// Open the session in the store directory. Authorization is checked by
    /// the first login, not here.
    pub async fn new(cli: &Cli) -> Result<Self> {
        let store_dir = cli.store_dir();
        tokio::fs::create_dir_all(&store_dir)
            .await
            .with_context(|| format!("Failed to create store directory {}", store_dir))?;

        // SqliteSession::open creates the file if it doesn't exist
        let session_path = format!("{}/session.db", store_dir);
        let tg = TgClient::connect(&session_path)?;
        log::debug!("Opened session {}", session_path);

        Ok(App {
            tg,
            output: cli.output,
        })
    }
}
