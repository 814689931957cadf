use tyggbot::infrastructure::config::settings::Config;

pub const BASE: &str = r#"
[bot]
nickname = "tyggbot"
oauth = "oauth:abc123"
channel = "pajlada"
"#;

pub const WITH_WHISPERS: &str = r#"
[bot]
nickname = "tyggbot"
oauth = "oauth:abc123"
channel = "pajlada"

[pool]
backup_count = 1
rate_limit = 2

[whisper]
enabled = true
rate_limit = 1

[[whisper.accounts]]
nickname = "whisperer0"
oauth = "oauth:w0"

[[whisper.accounts]]
nickname = "whisperer1"
oauth = "oauth:w1"
"#;

/// Parse without consulting the process environment.
pub fn parse(toml: &str) -> Config {
    Config::parse_toml_with_env(toml, |_| None).expect("valid test config")
}
