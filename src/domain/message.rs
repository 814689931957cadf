//! Outbound chat payloads.

use std::fmt;

/// A pending private message to one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Whisper {
    pub target: String,
    pub body: String,
}

impl Whisper {
    pub fn new(target: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            body: body.into(),
        }
    }

    /// The legacy `/w` chat command carrying this whisper.
    #[must_use]
    pub fn as_command(&self) -> String {
        format!("/w {} {}", self.target, self.body)
    }
}

/// Chat commands the bot can issue in its channel.
///
/// Rendered to the slash-command text Twitch chat accepts inside a `PRIVMSG`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Plain channel message.
    Say(String),
    /// `/me` action message.
    Me(String),
    Timeout {
        user: String,
        seconds: u32,
        reason: Option<String>,
    },
    Ban {
        user: String,
        reason: Option<String>,
    },
    Unban {
        user: String,
    },
    /// Delete a single message by its `id` tag.
    Delete {
        message_id: String,
    },
}

impl fmt::Display for ChatCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Say(text) => write!(f, "{text}"),
            Self::Me(text) => write!(f, "/me {text}"),
            Self::Timeout {
                user,
                seconds,
                reason,
            } => {
                write!(f, "/timeout {user} {seconds}")?;
                if let Some(reason) = reason {
                    write!(f, " {reason}")?;
                }
                Ok(())
            }
            Self::Ban { user, reason } => {
                write!(f, "/ban {user}")?;
                if let Some(reason) = reason {
                    write!(f, " {reason}")?;
                }
                Ok(())
            }
            Self::Unban { user } => write!(f, "/unban {user}"),
            Self::Delete { message_id } => write!(f, "/delete {message_id}"),
        }
    }
}
