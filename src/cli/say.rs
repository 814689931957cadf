//! Handler for the `say` command.

use crate::app::ChatClient;
use crate::cli::{output, SayArgs};
use crate::error::Result;
use crate::infrastructure::config::settings::Config;

/// Start a client, send one message and shut down.
pub async fn execute(args: &SayArgs) -> Result<()> {
    let mut config = Config::load(&args.config)?;
    config.pool.backup_count = 0;
    config.whisper.enabled = false;
    config.init_logging();

    let message = args.message.join(" ");
    output::progress(&format!("Connecting to #{}", config.bot.channel));
    let client = match ChatClient::connect(&config).await {
        Ok(client) => {
            output::progress_done(true);
            client
        }
        Err(e) => {
            output::progress_done(false);
            return Err(e);
        }
    };

    let result = if args.me {
        client.me(&message).await
    } else {
        client.say(&message).await
    };
    client.shutdown();
    result?;

    output::ok(&format!("Sent to #{}", client.channel()));
    Ok(())
}
