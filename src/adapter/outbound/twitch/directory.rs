//! TMI server directory client.
//!
//! `GET {base}/servers?channel=<name>` lists chat servers for a channel and
//! `GET {base}/servers?cluster=group` lists the whisper (group chat)
//! cluster. Both answer `{"cluster": "...", "servers": ["host:port", ...]}`.

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::domain::{ChannelName, ServerAddr};
use crate::error::Result;
use crate::infrastructure::config::bot::DirectoryConfig;
use crate::port::Directory;

#[derive(Debug, Deserialize)]
struct ServersResponse {
    #[serde(default)]
    cluster: Option<String>,
    #[serde(default)]
    servers: Vec<String>,
}

/// HTTP client for the TMI server directory.
pub struct TmiDirectory {
    http: HttpClient,
    base_url: Url,
}

impl TmiDirectory {
    /// # Errors
    ///
    /// Returns an error if `config.base_url` is not a valid URL or the HTTP
    /// client cannot be built.
    pub fn from_config(config: &DirectoryConfig) -> Result<Self> {
        let http = HttpClient::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            http,
            base_url: Url::parse(&config.base_url)?,
        })
    }

    async fn fetch(&self, key: &str, value: &str) -> Result<Vec<ServerAddr>> {
        let mut url = self.base_url.join("servers")?;
        url.query_pairs_mut().append_pair(key, value);

        debug!(url = %url, "Querying server directory");
        let body: ServersResponse = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let servers: Vec<ServerAddr> = body
            .servers
            .iter()
            .filter_map(|raw| match raw.parse() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    warn!(server = %raw, error = %e, "Skipping malformed server address");
                    None
                }
            })
            .collect();

        debug!(
            cluster = body.cluster.as_deref().unwrap_or("unknown"),
            servers = servers.len(),
            "Directory answered"
        );
        Ok(servers)
    }
}

#[async_trait]
impl Directory for TmiDirectory {
    async fn chat_servers(&self, channel: &ChannelName) -> Result<Vec<ServerAddr>> {
        self.fetch("channel", channel.as_str()).await
    }

    async fn whisper_servers(&self) -> Result<Vec<ServerAddr>> {
        self.fetch("cluster", "group").await
    }
}
