//! Process inspection utilities

use std::ffi::OsStr;
use sysinfo::{ProcessesToUpdate, System};

/// Whether a process named exactly `name` is running
pub fn is_running(name: &str) -> bool {
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::All, true);
    sys.processes().values().any(|p| has_name(p.name(), name))
}

/// Exact match; `ssh-agent-helper` or an editor open on `ssh-agent.conf`
/// do not count
fn has_name(process: &OsStr, name: &str) -> bool {
    process == name
}

/// Whether an SSH agent looks reachable: either the agent socket is
/// advertised in the environment or an `ssh-agent` process is running.
pub fn agent_reachable() -> bool {
    let socket = std::env::var_os("SSH_AUTH_SOCK").filter(|s| !s.is_empty());
    socket.is_some() || is_running("ssh-agent")
}
