//! bw-ssh - Load SSH keys from Bitwarden into ssh-agent
//!
//! Normal mode:
//! - Unlock the vault (master password, masked)
//! - Write every item of the `ssh` folder under ~/.ssh
//! - ssh-add each private key, then delete it
//!
//! Askpass mode: invoked by ssh-add with its passphrase prompt as the only
//! argument; forwards the passphrase piped on stdin.

use anyhow::{Context, Result};
use bw_ssh::askpass;
use bw_ssh::prompt::{CredentialSource, Preseeded, TerminalPrompt};
use bw_ssh::{BwCli, Pipeline, SshAdd};
use bw_ssh_core::{process, Config, Paths};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bw-ssh")]
#[command(about = "Load SSH keys stored in Bitwarden into ssh-agent without leaving them on disk")]
#[command(version)]
#[command(after_help = r#"VAULT LAYOUT:
    Items live in the Bitwarden folder "ssh" (configurable).
    - Item name        file name under ~/.ssh (names starting with ~ are
                       relative to your home directory)
    - Notes            file content
    - Field "public"   written next to the key as <name>.pub
    - Field "password" passphrase handed to ssh-add

    Include / IdentityFile lines naming another item are rewritten to
    that item's path.

SECURITY:
    - Private keys are written 0600, added to the agent, then deleted
    - The session token never leaves this process and its children
    - Set BW_PASSWORD to unlock without the interactive prompt

CONFIG:
    ~/.config/bw-ssh/config.json
    {"folder": "ssh", "vault_program": "bw", "agent_program": "ssh-add",
     "ssh_root": "~/.ssh"}"#)]
struct Cli {
    /// Passphrase prompt, when run by ssh-add as its askpass helper
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    args: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    let config = Config::load(&Paths::new().config_file());
    let paths = match &config {
        Ok(config) => config.apply(Paths::new()),
        Err(_) => Paths::new(),
    };

    // Stdout belongs to ssh-add in this mode: nothing else may be printed.
    if askpass::is_passphrase_prompt(&cli.args, &paths) {
        if askpass::run().is_err() {
            std::process::exit(1);
        }
        return;
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = config.and_then(|config| run(&config, &paths)) {
        println!("{e}");
        std::process::exit(1);
    }
}

fn run(config: &Config, paths: &Paths) -> Result<()> {
    let askpass = std::env::current_exe().context("Failed to locate the bw-ssh executable")?;
    let client = BwCli::new(&config.vault_program);
    let agent = SshAdd::new(&config.agent_program, askpass);

    let credentials: Box<dyn CredentialSource> = match Preseeded::from_env("BW_PASSWORD") {
        Some(password) => Box::new(password),
        None => Box::new(TerminalPrompt),
    };

    if !process::agent_reachable() {
        warn!("no SSH agent found (SSH_AUTH_SOCK unset, no ssh-agent running)");
    }

    let pipeline = Pipeline {
        client: &client,
        credentials: credentials.as_ref(),
        agent: &agent,
        paths,
        folder: &config.folder,
    };

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(pipeline.run())?;

    for key in &report.keys {
        println!("Added {}", key.display());
    }
    println!(
        "{} key(s) loaded, {} public key(s) and {} config file(s) written",
        report.keys.len(),
        report.public_keys.len(),
        report.configs.len()
    );

    Ok(())
}
