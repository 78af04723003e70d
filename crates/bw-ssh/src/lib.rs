//! bw-ssh - SSH keys from Bitwarden, straight into the agent
//!
//! "A private key on disk is a private key someone else can copy."
//!
//! Keys live in a Bitwarden folder. Each run unlocks the vault, writes
//! every item of that folder under `~/.ssh`, hands the private keys to
//! `ssh-add` and deletes them again. Configuration items may refer to other
//! items by name; those references become real paths.

pub mod askpass;
pub mod catalog;
pub mod client;
pub mod error;
pub mod pipeline;
pub mod prompt;
pub mod provision;
pub mod resolver;
pub mod session;

#[cfg(test)]
mod testing;

pub use catalog::{Catalog, CatalogLoader, Item};
pub use client::{BwCli, VaultClient};
pub use error::Error;
pub use pipeline::Pipeline;
pub use provision::{KeyAgent, Provisioner, Report, SshAdd};
pub use session::{Authenticator, Session};
