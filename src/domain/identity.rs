//! Chat account identities.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// A Twitch account the bot can authenticate as.
///
/// The credential is an OAuth token, with or without the `oauth:` prefix.
/// Nicknames are stored lower-case, however they were written.
#[derive(Clone, Deserialize)]
#[serde(from = "IdentityRecord")]
pub struct Identity {
    pub nickname: String,
    credential: SecretString,
}

/// On-disk form of an [`Identity`].
#[derive(Deserialize)]
struct IdentityRecord {
    nickname: String,
    #[serde(alias = "oauth")]
    credential: SecretString,
}

impl From<IdentityRecord> for Identity {
    fn from(record: IdentityRecord) -> Self {
        Self {
            nickname: record.nickname.to_lowercase(),
            credential: record.credential,
        }
    }
}

impl Identity {
    pub fn new(nickname: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into().to_lowercase(),
            credential: SecretString::from(credential.into()),
        }
    }

    /// The `PASS` argument, always carrying the `oauth:` prefix.
    #[must_use]
    pub fn pass_token(&self) -> String {
        let raw = self.credential.expose_secret();
        if raw.starts_with("oauth:") {
            raw.to_string()
        } else {
            format!("oauth:{raw}")
        }
    }

    /// True when the credential is blank.
    #[must_use]
    pub fn has_empty_credential(&self) -> bool {
        self.credential
            .expose_secret()
            .trim_start_matches("oauth:")
            .trim()
            .is_empty()
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("nickname", &self.nickname)
            .field("credential", &"[REDACTED]")
            .finish()
    }
}
