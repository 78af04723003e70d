//! Scripted stand-ins for the vault CLI and the SSH agent

use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::client::{ClientError, VaultClient};
use crate::provision::{AgentError, KeyAgent};
use crate::session::Session;

#[derive(Clone)]
enum Reply {
    Stdout(String),
    Exit(i32),
}

/// Vault client answering from a table keyed by the joined argument list
#[derive(Clone, Default)]
pub struct ScriptedVault {
    replies: HashMap<String, Reply>,
    not_installed: bool,
    session: Option<String>,
    calls: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl ScriptedVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, args: &str, stdout: &str) -> Self {
        self.replies.insert(args.to_string(), Reply::Stdout(stdout.to_string()));
        self
    }

    pub fn fail(mut self, args: &str, exit_code: i32) -> Self {
        self.replies.insert(args.to_string(), Reply::Exit(exit_code));
        self
    }

    pub fn not_installed(mut self) -> Self {
        self.not_installed = true;
        self
    }

    /// Argument lists invoked so far
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(args, _)| args.clone()).collect()
    }

    /// Session token each invocation carried
    pub fn sessions(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl VaultClient for ScriptedVault {
    async fn invoke(&self, args: &[&str]) -> Result<String, ClientError> {
        let key = args.join(" ");
        self.calls.lock().unwrap().push((key.clone(), self.session.clone()));

        if self.not_installed {
            return Err(ClientError::NotInstalled("bw".to_string()));
        }

        match self.replies.get(&key) {
            Some(Reply::Stdout(stdout)) => Ok(stdout.clone()),
            Some(Reply::Exit(exit_code)) => Err(ClientError::Command {
                exit_code: *exit_code,
                stdout: String::new(),
                stderr: format!("scripted failure: {key}"),
            }),
            None => Err(ClientError::Command {
                exit_code: 1,
                stdout: String::new(),
                stderr: format!("unscripted call: {key}"),
            }),
        }
    }

    fn with_session(&self, session: &Session) -> Self {
        Self {
            session: Some(session.token().to_string()),
            ..self.clone()
        }
    }
}

/// What the agent saw when asked to add a key
#[derive(Debug, Clone)]
pub struct AgentCall {
    pub path: PathBuf,
    pub passphrase: String,
    /// File content at call time, `None` if the file was missing
    pub content: Option<String>,
    pub mode: Option<u32>,
}

/// Agent recording each registration, failing for chosen file names
#[derive(Default)]
pub struct RecordingAgent {
    failing: Vec<String>,
    calls: Mutex<Vec<AgentCall>>,
}

impl RecordingAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, file_name: &str) -> Self {
        self.failing.push(file_name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<AgentCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl KeyAgent for RecordingAgent {
    async fn add_key(&self, path: &Path, passphrase: &str) -> Result<(), AgentError> {
        self.calls.lock().unwrap().push(AgentCall {
            path: path.to_path_buf(),
            passphrase: passphrase.to_string(),
            content: fs::read_to_string(path).ok(),
            mode: fs::metadata(path).ok().map(|m| m.permissions().mode() & 0o777),
        });

        let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        if name.is_some_and(|n| self.failing.contains(&n)) {
            return Err(AgentError::Exit(1));
        }
        Ok(())
    }
}
