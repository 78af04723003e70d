//! Secret store client
//!
//! Runs the vault CLI once per request and hands back its stdout. No
//! parsing and no retries happen here; callers decide what a failure means.

use std::io;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;
use zeroize::Zeroizing;

use crate::session::Session;

/// Failures of a single vault invocation
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("vault executable not found: {0}")]
    NotInstalled(String),

    #[error("vault command exited with code {exit_code}: {stderr}")]
    Command {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("failed to run vault command: {0}")]
    Io(#[from] io::Error),
}

/// Request/response access to the vault
#[allow(async_fn_in_trait)]
pub trait VaultClient {
    /// Run the vault command with `args` and return its stdout
    async fn invoke(&self, args: &[&str]) -> Result<String, ClientError>;

    /// A client whose invocations are authorized by `session`
    fn with_session(&self, session: &Session) -> Self
    where
        Self: Sized;
}

/// The Bitwarden CLI
#[derive(Clone)]
pub struct BwCli {
    program: String,
    session: Option<Zeroizing<String>>,
}

impl BwCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            session: None,
        }
    }
}

impl VaultClient for BwCli {
    async fn invoke(&self, args: &[&str]) -> Result<String, ClientError> {
        // Only the subcommand is logged: `unlock` carries the password.
        debug!(
            program = %self.program,
            command = args.first().copied().unwrap_or_default(),
            "invoking vault"
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(token) = &self.session {
            cmd.env("BW_SESSION", token.as_str());
        }

        let output = match cmd.output().await {
            Ok(output) => output,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ClientError::NotInstalled(self.program.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            Ok(stdout)
        } else {
            Err(ClientError::Command {
                exit_code: output.status.code().unwrap_or(-1),
                stdout,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }

    fn with_session(&self, session: &Session) -> Self {
        Self {
            program: self.program.clone(),
            session: Some(Zeroizing::new(session.token().to_string())),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_executable() {
        let client = BwCli::new("bw-ssh-test-no-such-binary");
        let err = client.invoke(&["status"]).await.unwrap_err();
        assert!(matches!(err, ClientError::NotInstalled(_)));
    }

    #[tokio::test]
    async fn test_captures_stdout() {
        let client = BwCli::new("echo");
        let out = client.invoke(&["list", "folders"]).await.unwrap();
        assert_eq!(out, "list folders\n");
    }

    #[tokio::test]
    async fn test_nonzero_exit_keeps_output() {
        let client = BwCli::new("sh");
        let err = client
            .invoke(&["-c", "echo out; echo err >&2; exit 3"])
            .await
            .unwrap_err();
        match err {
            ClientError::Command {
                exit_code,
                stdout,
                stderr,
            } => {
                assert_eq!(exit_code, 3);
                assert_eq!(stdout, "out\n");
                assert_eq!(stderr, "err\n");
            }
            other => panic!("Expected Command error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_session_reaches_child_only() {
        let client = BwCli::new("sh").with_session(&Session::new("tok-123"));
        let out = client.invoke(&["-c", "printf %s \"$BW_SESSION\""]).await.unwrap();
        assert_eq!(out, "tok-123");
        assert_ne!(std::env::var("BW_SESSION").ok().as_deref(), Some("tok-123"));
    }
}
