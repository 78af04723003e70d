//! Errors surfaced by the bw-ssh pipeline
//!
//! Every variant aborts the run; the binary prints the message and exits 1.

use std::path::PathBuf;
use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("Bitwarden is not installed, please install first")]
    VaultNotInstalled,

    #[error("Bitwarden not logged in, please login first with `bw login`")]
    NotLoggedIn,

    #[error("Wrong password")]
    WrongPassword,

    #[error("Ctrl+C pressed, abort")]
    UserAborted,

    #[error("Bitwarden has no `{0}` folder present, exiting")]
    FolderNotFound(String),

    #[error("Can't fetch folders")]
    FolderListError,

    #[error("Can't fetch items")]
    ItemListError,

    #[error("Failed to provision {}: {reason}", path.display())]
    Provisioning { path: PathBuf, reason: String },

    #[error("Terminal error: {0}")]
    Terminal(#[source] std::io::Error),
}

impl Error {
    pub(crate) fn provisioning(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Provisioning {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
