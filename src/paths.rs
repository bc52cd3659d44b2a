//! XDG directory helpers for config/data locations.

use std::cell::RefCell;
use std::path::PathBuf;

const APP_DIR: &str = "cadence-rs";

/// Base directory for persistent data (workspaces, logs).
///
/// Uses `CADENCE_DATA_DIR` if set, otherwise `$XDG_DATA_HOME/cadence-rs` or
/// `~/.local/share/cadence-rs`.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = thread_local_data_dir_override() {
        return dir;
    }

    if let Ok(dir) = std::env::var("CADENCE_DATA_DIR")
        && !dir.trim().is_empty()
    {
        return PathBuf::from(dir);
    }

    std::env::var("XDG_DATA_HOME")
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join(".local")
                .join("share")
        })
        .join(APP_DIR)
}

#[doc(hidden)]
pub struct DataDirOverride {
    prev: Option<PathBuf>,
}

impl Drop for DataDirOverride {
    fn drop(&mut self) {
        let prev = self.prev.take();
        DATA_DIR_OVERRIDE.with(|cell| {
            cell.replace(prev);
        });
    }
}

/// Point `data_dir` at `path` on this thread until the guard drops.
#[doc(hidden)]
pub fn override_data_dir_for_tests(path: Option<PathBuf>) -> DataDirOverride {
    let prev = DATA_DIR_OVERRIDE.with(|cell| cell.replace(path));
    DataDirOverride { prev }
}

fn thread_local_data_dir_override() -> Option<PathBuf> {
    DATA_DIR_OVERRIDE.with(|cell| cell.borrow().clone())
}

thread_local! {
    static DATA_DIR_OVERRIDE: RefCell<Option<PathBuf>> = const { RefCell::new(None) };
}

/// Base directory for configuration files.
///
/// Uses `CADENCE_CONFIG_DIR` if set, otherwise `$XDG_CONFIG_HOME/cadence-rs` or
/// `~/.config/cadence-rs`.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CADENCE_CONFIG_DIR")
        && !dir.trim().is_empty()
    {
        return PathBuf::from(dir);
    }

    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join(".config")
        })
        .join(APP_DIR)
}

/// Default directory for rolling log files.
pub fn log_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Working repositories, one per remote.
pub fn workspaces_dir() -> PathBuf {
    data_dir().join("workspaces")
}

pub fn workspace_dir(slug: &str) -> PathBuf {
    workspaces_dir().join(slug)
}

/// Directory name for a remote: the URL basename without `.git`, reduced to
/// `[a-z0-9._-]`. Falls back to `default` with no usable remote.
pub fn workspace_slug(remote_url: Option<&str>) -> String {
    let base = remote_url
        .map(|url| url.trim().trim_end_matches('/'))
        .and_then(|url| url.rsplit(['/', ':']).next())
        .map(|name| name.strip_suffix(".git").unwrap_or(name))
        .unwrap_or_default();

    let mut slug = String::with_capacity(base.len());
    for ch in base.chars() {
        let ch = ch.to_ascii_lowercase();
        if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
            slug.push(ch);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches(['-', '.']);
    if slug.is_empty() {
        "default".to_string()
    } else {
        slug.to_string()
    }
}
