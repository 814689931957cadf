use std::path::Path;

use chrono::Utc;

use crate::adapter::outbound::twitch::TmiDirectory;
use crate::cli::output;
use crate::domain::ServerAddr;
use crate::error::Result;
use crate::infrastructure::config::settings::Config;
use crate::port::Directory;

/// Print the chat and whisper server lists the directory hands out.
pub async fn execute_directory(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let directory = TmiDirectory::from_config(&config.directory)?;

    output::section(&format!(
        "Server directory {} ({})",
        config.directory.base_url,
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output::progress(&format!("Chat servers for #{}", config.bot.channel));
    let chat = directory.chat_servers(&config.bot.channel).await;
    report(chat)?;

    output::progress("Whisper servers");
    let whisper = directory.whisper_servers().await;
    report(whisper)?;

    Ok(())
}

fn report(result: Result<Vec<ServerAddr>>) -> Result<()> {
    match result {
        Ok(servers) => {
            output::progress_done(true);
            output::servers(&servers);
            Ok(())
        }
        Err(e) => {
            output::progress_done(false);
            output::error(&e.to_string());
            Err(e)
        }
    }
}
