use std::path::Path;

use secrecy::ExposeSecret;

use crate::cli::output;
use crate::error::{Error, Result};
use crate::infrastructure::config::settings::{Config, OAUTH_ENV_VAR};

/// Validate configuration file without connecting.
pub fn execute_config(config_path: &Path) -> Result<()> {
    output::section(&format!("Checking configuration: {}", config_path.display()));

    if !config_path.exists() {
        output::error(&format!("Configuration file not found: {}", config_path.display()));
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            config_path.display().to_string(),
        )));
    }

    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            output::error(&format!("Configuration error: {e}"));
            return Err(e);
        }
    };
    output::ok("Configuration file is valid");

    output::section("Summary");
    output::key_value("Nickname", &config.bot.nickname);
    output::key_value("Channel", format!("#{}", config.bot.channel));
    output::key_value("Backup count", config.pool.backup_count);
    output::key_value(
        "Chat rate",
        format!("{} / {}s", config.pool.rate_limit, config.pool.rate_window_secs),
    );
    output::key_value("Directory", &config.directory.base_url);

    let from_env = std::env::var(OAUTH_ENV_VAR).is_ok_and(|t| !t.trim().is_empty());
    let token_len = config
        .bot
        .oauth
        .as_ref()
        .map_or(0, |t| t.expose_secret().len());
    if from_env {
        output::ok(&format!("OAuth token found (from {OAUTH_ENV_VAR}, {token_len} chars)"));
    } else {
        output::ok(&format!("OAuth token found (config file, {token_len} chars)"));
    }

    if config.whisper.enabled {
        let roster = config.whisper.roster();
        output::key_value("Whispers", format!("{} account(s)", roster.len()));
        if roster.len() < config.whisper.accounts.len() {
            output::warn(&format!(
                "{} account(s) beyond max_accounts = {} will be ignored",
                config.whisper.accounts.len() - roster.len(),
                config.whisper.max_accounts
            ));
        }
    } else {
        output::key_value("Whispers", "disabled");
    }

    println!();
    output::ok("Configuration is ready to use.");
    Ok(())
}
