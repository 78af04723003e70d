//! Session authentication
//!
//! Turns a logged-in but locked vault into a session token:
//! login check, master password, unlock.

use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::client::{ClientError, VaultClient};
use crate::error::{Error, Result};
use crate::prompt::CredentialSource;

pub const PASSWORD_PROMPT: &str = "Enter your password: ";

static SESSION_EXPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"BW_SESSION="([^"]+)""#).expect("valid session regex"));

/// Short-lived token proving the vault has been unlocked
pub struct Session(Zeroizing<String>);

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Zeroizing::new(token.into()))
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Session(<redacted>)")
    }
}

/// Obtains a session token from the vault
pub struct Authenticator<'a, C> {
    client: &'a C,
    credentials: &'a dyn CredentialSource,
}

impl<'a, C: VaultClient> Authenticator<'a, C> {
    pub fn new(client: &'a C, credentials: &'a dyn CredentialSource) -> Self {
        Self {
            client,
            credentials,
        }
    }

    /// Check that the vault CLI exists and has a logged-in account
    pub async fn check_availability(&self) -> Result<()> {
        match self.client.invoke(&["login", "--check", "--quiet"]).await {
            Ok(_) => Ok(()),
            Err(ClientError::NotInstalled(_)) => Err(Error::VaultNotInstalled),
            Err(e) => {
                debug!(error = %e, "login check failed");
                Err(Error::NotLoggedIn)
            }
        }
    }

    /// Ask the credential source for the master password
    pub fn prompt_password(&self) -> Result<Zeroizing<String>> {
        self.credentials.obtain(PASSWORD_PROMPT)
    }

    /// Unlock the vault. Every failure reads as a wrong password.
    pub async fn unlock(&self, password: &str) -> Result<Session> {
        let stdout = self
            .client
            .invoke(&["unlock", password, "--response"])
            .await
            .map(Zeroizing::new)
            .map_err(|e| {
                debug!(error = %e, "unlock failed");
                Error::WrongPassword
            })?;

        parse_unlock_output(&stdout).ok_or(Error::WrongPassword)
    }

    pub async fn authenticate(&self) -> Result<Session> {
        self.check_availability().await?;
        let password = self.prompt_password()?;
        let session = self.unlock(&password).await?;
        info!("vault unlocked");
        Ok(session)
    }
}

#[derive(Deserialize)]
struct UnlockResponse {
    data: UnlockData,
}

#[derive(Deserialize)]
struct UnlockData {
    raw: Option<String>,
}

/// Pull the session token out of `bw unlock` output.
///
/// The JSON `--response` form is preferred; the human-readable
/// `export BW_SESSION="..."` text is accepted as a fallback.
fn parse_unlock_output(stdout: &str) -> Option<Session> {
    if let Ok(response) = serde_json::from_str::<UnlockResponse>(stdout.trim()) {
        return response
            .data
            .raw
            .filter(|raw| !raw.is_empty())
            .map(Session::new);
    }

    SESSION_EXPORT_RE
        .captures(stdout)
        .and_then(|caps| caps.get(1))
        .map(|token| Session::new(token.as_str()))
}
