//! Standard paths used by bw-ssh

use std::path::{Component, Path, PathBuf};

/// Standard bw-ssh paths
#[derive(Debug, Clone)]
pub struct Paths {
    /// Home directory ($HOME)
    pub home: PathBuf,
    /// SSH configuration root (~/.ssh)
    pub ssh_root: PathBuf,
    /// Config directory (~/.config/bw-ssh)
    pub config: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));

        let config = dirs::config_dir()
            .unwrap_or_else(|| home.join(".config"))
            .join("bw-ssh");

        Self {
            ssh_root: home.join(".ssh"),
            home,
            config,
        }
    }

    /// Paths rooted at an explicit home directory
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            ssh_root: home.join(".ssh"),
            config: home.join(".config").join("bw-ssh"),
            home,
        }
    }

    /// Replace the SSH configuration root (`~` is expanded)
    pub fn with_ssh_root(mut self, root: &str) -> Self {
        self.ssh_root = self.expand_home(root);
        self
    }

    /// Expand a leading `~` to the home directory
    pub fn expand_home(&self, path: &str) -> PathBuf {
        match path.strip_prefix('~') {
            Some(rest) => self.home.join(rest.trim_start_matches('/')),
            None => PathBuf::from(path),
        }
    }

    /// Where the file for a vault item of the given name lives.
    ///
    /// Names starting with `~` are relative to the home directory, every
    /// other name is relative to the SSH configuration root, absolute ones
    /// included (`/etc/x` lands in `<root>/etc/x`).
    pub fn target(&self, name: &str) -> PathBuf {
        if name.starts_with('~') {
            self.expand_home(name)
        } else {
            self.ssh_root.join(relative(Path::new(name)))
        }
    }

    /// Whether `path` lies inside the SSH configuration root, compared
    /// lexically (`..` and `.` are folded, symlinks are not followed).
    pub fn is_inside_ssh_root(&self, path: &Path) -> bool {
        let root = normalize(&self.ssh_root);
        let path = normalize(path);
        path != root && path.starts_with(&root)
    }

    /// Configuration file path
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.json")
    }

    /// Prompt prefix ssh-add shows when it wants a passphrase for a key
    /// under the SSH root.
    pub fn passphrase_prompt(&self) -> String {
        format!("Enter passphrase for {}", self.ssh_root.display())
    }
}

/// `path` without its root or prefix components
fn relative(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
        .collect()
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
