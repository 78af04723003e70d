//! Key provisioning
//!
//! Every catalog item is written under the SSH root. Items holding a
//! private key are then handed to the agent and their private file is
//! removed again; everything else stays on disk as plain configuration.

use bw_ssh_core::Paths;
use std::fs::{self, OpenOptions, Permissions};
use std::io::{self, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::catalog::{Catalog, Item};
use crate::error::{Error, Result};
use crate::resolver;

/// Line prefix that marks PEM / OpenSSH private key material
pub const KEY_HEADER: &str = "-----BEGIN";

const FILE_MODE: u32 = 0o600;

/// Failures registering a key with the agent
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("failed to run agent command: {0}")]
    Io(#[from] io::Error),

    #[error("agent command exited with code {0}")]
    Exit(i32),
}

/// Registration target for private keys
#[allow(async_fn_in_trait)]
pub trait KeyAgent {
    /// Register the key at `path`, answering passphrase prompts with `passphrase`
    async fn add_key(&self, path: &Path, passphrase: &str) -> std::result::Result<(), AgentError>;
}

/// `ssh-add`, with its passphrase prompt routed back into this executable
pub struct SshAdd {
    program: String,
    askpass: PathBuf,
}

impl SshAdd {
    pub fn new(program: impl Into<String>, askpass: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            askpass: askpass.into(),
        }
    }
}

impl KeyAgent for SshAdd {
    async fn add_key(&self, path: &Path, passphrase: &str) -> std::result::Result<(), AgentError> {
        let display = std::env::var_os("DISPLAY")
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "dummy".into());

        // The askpass helper inherits ssh-add's stdin, so the passphrase
        // written here is what it forwards back.
        let mut child = Command::new(&self.program)
            .arg(path)
            .env("DISPLAY", display)
            .env("SSH_ASKPASS", &self.askpass)
            .env("SSH_ASKPASS_REQUIRE", "force")
            .stdin(Stdio::piped())
            .stdout(Stdio::from(io::stderr()))
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            let line = Zeroizing::new(format!("{passphrase}\n"));
            match stdin.write_all(line.as_bytes()).await {
                // ssh-add may exit without ever reading (unencrypted key)
                Err(e) if e.kind() != io::ErrorKind::BrokenPipe => return Err(e.into()),
                _ => {}
            }
        }

        let status = child.wait().await?;
        if status.success() {
            Ok(())
        } else {
            Err(AgentError::Exit(status.code().unwrap_or(-1)))
        }
    }
}

/// What happened to a single item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provisioned {
    /// Written and left in place
    Config(PathBuf),
    /// Registered with the agent; the private file is gone
    Key {
        path: PathBuf,
        public: Option<PathBuf>,
    },
}

/// Outcome of a full run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub keys: Vec<PathBuf>,
    pub public_keys: Vec<PathBuf>,
    pub configs: Vec<PathBuf>,
}

impl Report {
    fn record(&mut self, provisioned: Provisioned) {
        match provisioned {
            Provisioned::Config(path) => self.configs.push(path),
            Provisioned::Key { path, public } => {
                self.keys.push(path);
                self.public_keys.extend(public);
            }
        }
    }
}

/// Whether some line of `content` starts with the private key header
pub fn is_private_key(content: &str) -> bool {
    content.lines().any(|line| line.starts_with(KEY_HEADER))
}

/// Write `content` to `path` readable and writable by the owner only
pub fn write_private_file(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(FILE_MODE)
        .open(path)?;
    // `mode` only applies on creation
    file.set_permissions(Permissions::from_mode(FILE_MODE))?;
    file.write_all(content.as_bytes())?;
    file.sync_all()
}

/// Removes its file when dropped unless removed explicitly first
struct EphemeralFile<'a> {
    path: &'a Path,
    armed: bool,
}

impl<'a> EphemeralFile<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, armed: true }
    }

    fn remove(mut self) -> io::Result<()> {
        self.armed = false;
        fs::remove_file(self.path)
    }
}

impl Drop for EphemeralFile<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = fs::remove_file(self.path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(path = %self.path.display(), error = %e, "failed to remove private key");
                }
            }
        }
    }
}

/// Writes catalog items and registers keys with an agent
pub struct Provisioner<'a, A> {
    agent: &'a A,
    paths: &'a Paths,
}

impl<'a, A: KeyAgent> Provisioner<'a, A> {
    pub fn new(agent: &'a A, paths: &'a Paths) -> Self {
        Self { agent, paths }
    }

    /// Provision every item in catalog order. The first failure aborts
    /// the run; items after it are left untouched.
    pub async fn provision_all(&self, catalog: &Catalog) -> Result<Report> {
        let mut report = Report::default();
        for item in catalog.iter() {
            report.record(self.provision_item(item, catalog).await?);
        }
        Ok(report)
    }

    pub async fn provision_item(&self, item: &Item, catalog: &Catalog) -> Result<Provisioned> {
        let target = self.paths.target(&item.name);
        let content = Zeroizing::new(resolver::resolve(&item.notes, catalog, self.paths));

        if !is_private_key(&content) {
            write_private_file(&target, &content).map_err(|e| Error::provisioning(&target, e))?;
            debug!(path = %target.display(), "wrote configuration");
            return Ok(Provisioned::Config(target));
        }

        if !self.paths.is_inside_ssh_root(&target) {
            return Err(Error::provisioning(
                &target,
                format!(
                    "private keys must live inside {}",
                    self.paths.ssh_root.display()
                ),
            ));
        }

        // Armed before the first byte is written so no exit path leaves
        // key material behind.
        let private = EphemeralFile::new(&target);
        write_private_file(&target, &content).map_err(|e| Error::provisioning(&target, e))?;

        let public = match item.field("public") {
            Some(key) => {
                let path = public_path(&target);
                write_private_file(&path, key).map_err(|e| Error::provisioning(&path, e))?;
                Some(path)
            }
            None => None,
        };

        let passphrase = item.field("password").unwrap_or_default();
        let added = self.agent.add_key(&target, passphrase).await;
        let removed = private.remove();

        added.map_err(|e| Error::provisioning(&target, e))?;
        removed.map_err(|e| Error::provisioning(&target, e))?;

        info!(path = %target.display(), "key added to agent");
        Ok(Provisioned::Key {
            path: target,
            public,
        })
    }
}

fn public_path(private: &Path) -> PathBuf {
    let mut name = private.as_os_str().to_owned();
    name.push(".pub");
    PathBuf::from(name)
}
