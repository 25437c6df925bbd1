//! Per-session Chrome profile directories
//!
//! Every session gets its own UUID-named user-data directory so concurrent
//! Chrome processes never contend for a `SingletonLock`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

const PROFILE_PREFIX: &str = "marketscrape_chrome";

/// RAII wrapper for a Chrome profile directory
///
/// Removes the directory on drop unless `into_path()` handed it to another
/// owner.
#[derive(Debug)]
pub struct BrowserProfile {
    path: PathBuf,
    cleanup_on_drop: bool,
}

impl BrowserProfile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Give up auto-cleanup and return the path
    pub fn into_path(mut self) -> PathBuf {
        self.cleanup_on_drop = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for BrowserProfile {
    fn drop(&mut self) {
        if self.cleanup_on_drop && self.path.exists() {
            debug!(target: "marketscrape::session", "Removing profile {}", self.path.display());
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                warn!(
                    target: "marketscrape::session",
                    "Failed to cleanup profile directory {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}

/// Create a fresh profile directory under the system temp dir
///
/// Uses `create_dir`, not `create_dir_all`, so a name collision fails loudly.
pub fn create_unique_profile() -> Result<BrowserProfile> {
    create_profile_in(&std::env::temp_dir())
}

pub(crate) fn create_profile_in(parent: &Path) -> Result<BrowserProfile> {
    let path = parent.join(format!("{PROFILE_PREFIX}_{}", Uuid::new_v4()));
    std::fs::create_dir(&path)
        .with_context(|| format!("Failed to create profile directory: {}", path.display()))?;
    debug!(target: "marketscrape::session", "Created profile {}", path.display());
    Ok(BrowserProfile {
        path,
        cleanup_on_drop: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_is_removed_on_drop() {
        let parent = tempfile::tempdir().unwrap();
        let profile = create_profile_in(parent.path()).unwrap();
        let path = profile.path().to_path_buf();
        assert!(path.is_dir());
        assert!(path.file_name().unwrap().to_string_lossy().starts_with(PROFILE_PREFIX));
        drop(profile);
        assert!(!path.exists());
    }

    #[test]
    fn into_path_disables_cleanup() {
        let parent = tempfile::tempdir().unwrap();
        let path = create_profile_in(parent.path()).unwrap().into_path();
        assert!(path.is_dir());
    }

    #[test]
    fn profiles_do_not_collide() {
        let parent = tempfile::tempdir().unwrap();
        let a = create_profile_in(parent.path()).unwrap();
        let b = create_profile_in(parent.path()).unwrap();
        assert_ne!(a.path(), b.path());
    }
}
