//! Handler for the `run` command.

use tokio::signal;
use tracing::{error, info};

use crate::app::App;
use crate::cli::RunArgs;
use crate::domain::ChannelName;
use crate::error::Result;
use crate::infrastructure::config::settings::Config;

/// Load config, apply CLI overrides, then run until Ctrl-C.
pub async fn execute(args: &RunArgs) -> Result<()> {
    let mut config = Config::load(&args.config)?;
    if let Some(level) = &args.log_level {
        config.logging.level.clone_from(level);
    }
    if args.json_logs {
        config.logging.format = "json".to_string();
    }
    if let Some(channel) = &args.channel {
        config.bot.channel = ChannelName::new(channel.as_str());
    }
    config.init_logging();

    tokio::select! {
        result = App::run(config) => {
            if let Err(e) = &result {
                error!(error = %e, "Fatal error");
            }
            result?;
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    info!("tyggbot stopped");
    Ok(())
}
