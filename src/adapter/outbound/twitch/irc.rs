//! IRC transport over TCP.
//!
//! # Connection Lifecycle
//!
//! 1. **Connect**: TCP connect to the address handed out by the directory
//! 2. **Login**: `PASS oauth:<token>` and `NICK`, then wait for `001`
//! 3. **Reader task**: answers `PING`, watches for `RECONNECT` and EOF
//! 4. **Termination**: any read error, EOF or `RECONNECT` marks the
//!    transport dead; the pool notices on its next maintenance pass
//!
//! The whole of steps 1 and 2 runs under the connector's timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::line::{single_line, Line};
use crate::domain::{ChannelName, Identity, ServerAddr};
use crate::error::{Error, Result};
use crate::infrastructure::config::bot::BotConfig;
use crate::port::{ChatTransport, Connector};

type Writer = Arc<Mutex<OwnedWriteHalf>>;
type Reader = Lines<BufReader<OwnedReadHalf>>;

/// Server notices that mean the credential was refused.
const AUTH_FAILURES: [&str; 2] = ["Login authentication failed", "Improperly formatted auth"];

/// Opens [`IrcTransport`]s.
#[derive(Debug, Clone)]
pub struct IrcConnector {
    connect_timeout: Duration,
}

impl IrcConnector {
    #[must_use]
    pub const fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    #[must_use]
    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(config.connect_timeout())
    }
}

#[async_trait]
impl Connector for IrcConnector {
    async fn connect(&self, addr: &ServerAddr, identity: &Identity) -> Result<Box<dyn ChatTransport>> {
        let transport = tokio::time::timeout(self.connect_timeout, IrcTransport::open(addr, identity))
            .await
            .map_err(|_| {
                Error::Connection(format!(
                    "login to {addr} timed out after {}s",
                    self.connect_timeout.as_secs()
                ))
            })??;
        Ok(Box::new(transport))
    }
}

/// One logged-in IRC connection.
pub struct IrcTransport {
    server: ServerAddr,
    writer: Writer,
    alive: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

impl IrcTransport {
    /// Connect and log in as `identity`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP connect fails, the server refuses the
    /// credential, or the stream ends before the welcome.
    pub async fn open(addr: &ServerAddr, identity: &Identity) -> Result<Self> {
        debug!(server = %addr, nickname = %identity.nickname, "Connecting to chat server");
        let stream = TcpStream::connect((addr.host(), addr.port())).await?;
        stream.set_nodelay(true)?;
        let (read_half, write_half) = stream.into_split();
        let writer: Writer = Arc::new(Mutex::new(write_half));
        let mut lines = BufReader::new(read_half).lines();

        write_raw(&writer, &format!("PASS {}", identity.pass_token())).await?;
        write_line(&writer, &format!("NICK {}", identity.nickname)).await?;
        await_welcome(&mut lines, &writer, addr).await?;

        info!(server = %addr, nickname = %identity.nickname, "Logged in to chat server");

        let alive = Arc::new(AtomicBool::new(true));
        let reader = tokio::spawn(read_loop(
            lines,
            Arc::clone(&writer),
            Arc::clone(&alive),
            addr.clone(),
        ));

        Ok(Self {
            server: addr.clone(),
            writer,
            alive,
            reader,
        })
    }

    #[must_use]
    pub fn server(&self) -> &ServerAddr {
        &self.server
    }

    async fn write(&self, line: &str) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::Connection(format!("connection to {} is closed", self.server)));
        }
        if let Err(e) = write_line(&self.writer, line).await {
            self.alive.store(false, Ordering::Release);
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for IrcTransport {
    fn is_connected(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    async fn request_capabilities(&self, capabilities: &[&str]) -> Result<()> {
        self.write(&format!("CAP REQ :{}", capabilities.join(" "))).await
    }

    async fn join(&self, channel: &ChannelName) -> Result<()> {
        self.write(&format!("JOIN {}", channel.irc_target())).await
    }

    async fn send(&self, target: &str, text: &str) -> Result<()> {
        self.write(&format!("PRIVMSG {target} :{}", single_line(text))).await
    }

    fn close(&self) {
        self.alive.store(false, Ordering::Release);
        self.reader.abort();
        let writer = Arc::clone(&self.writer);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let mut w = writer.lock().await;
                let _ = w.write_all(b"QUIT\r\n").await;
                let _ = w.shutdown().await;
            });
        }
    }
}

impl Drop for IrcTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Read until `001`. Answers `PING` meanwhile.
async fn await_welcome(lines: &mut Reader, writer: &Writer, addr: &ServerAddr) -> Result<()> {
    while let Some(raw) = lines.next_line().await? {
        trace!(server = %addr, line = %raw, "<");
        let Some(line) = Line::parse(&raw) else {
            continue;
        };
        match line.command {
            "001" => return Ok(()),
            "PING" => write_line(writer, &pong(&line)).await?,
            "NOTICE" => {
                let text = line.trailing.unwrap_or_default();
                if AUTH_FAILURES.iter().any(|f| text.contains(f)) {
                    return Err(Error::Connection(format!("{addr} refused login: {text}")));
                }
            }
            _ => {}
        }
    }
    Err(Error::Connection(format!("{addr} closed the connection during login")))
}

async fn read_loop(mut lines: Reader, writer: Writer, alive: Arc<AtomicBool>, addr: ServerAddr) {
    loop {
        match lines.next_line().await {
            Ok(Some(raw)) => {
                trace!(server = %addr, line = %raw, "<");
                let Some(line) = Line::parse(&raw) else {
                    continue;
                };
                match line.command {
                    "PING" => {
                        if let Err(e) = write_line(&writer, &pong(&line)).await {
                            warn!(server = %addr, error = %e, "Failed to answer PING");
                            break;
                        }
                    }
                    "RECONNECT" => {
                        info!(server = %addr, "Server requested reconnect");
                        break;
                    }
                    _ => {}
                }
            }
            Ok(None) => {
                debug!(server = %addr, "Chat server closed the connection");
                break;
            }
            Err(e) => {
                warn!(server = %addr, error = %e, "Chat connection read failed");
                break;
            }
        }
    }
    alive.store(false, Ordering::Release);
}

fn pong(ping: &Line<'_>) -> String {
    match ping.trailing {
        Some(token) => format!("PONG :{token}"),
        None => "PONG".to_string(),
    }
}

async fn write_line(writer: &Writer, line: &str) -> Result<()> {
    trace!(line = %line, ">");
    write_raw(writer, line).await
}

/// Write without logging; used for the credential.
async fn write_raw(writer: &Writer, line: &str) -> Result<()> {
    let mut w = writer.lock().await;
    w.write_all(line.as_bytes()).await?;
    w.write_all(b"\r\n").await?;
    w.flush().await?;
    Ok(())
}
