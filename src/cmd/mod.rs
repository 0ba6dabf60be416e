pub mod chats;
pub mod download;
pub mod version;

use crate::Cli;
use clap::Subcommand;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Archive channel history and media into a directory
    Download(download::DownloadArgs),
    /// List the groups and channels of the account
    Chats(chats::ChatsArgs),
    /// Show version info
    Version,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Download(args) => download::run(&cli, args).await,
        Command::Chats(args) => chats::run(&cli, args).await,
        Command::Version => {
            version::run(&cli);
            Ok(())
        }
    }
}
