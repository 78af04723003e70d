//! bw-ssh core - Shared functionality for the bw-ssh tools
//!
//! Where things live on disk, how the tool is configured, and what is
//! running on the machine.

pub mod config;
pub mod paths;
pub mod process;

pub use config::Config;
pub use paths::Paths;
