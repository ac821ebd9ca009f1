//! Multi-call installation: one symlink per tool pointing at this executable.

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// `~/.local/bin`
pub fn default_bin_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("could not determine the home directory")?;
    Ok(home.join(".local").join("bin"))
}

/// Links `exe` as `bin_dir/<name>` for every name. A failing link is logged
/// and skipped. Returns the links that were created.
pub fn bootstrap(exe: &Path, bin_dir: &Path, names: &[&str]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(bin_dir)
        .with_context(|| format!("failed to create {}", bin_dir.display()))?;
    let mut created = Vec::new();
    for name in names {
        let link = bin_dir.join(name);
        match symlink(exe, &link) {
            Ok(()) => {
                info!(link = %link.display(), "linked");
                created.push(link);
            }
            Err(e) => warn!(link = %link.display(), error = %e, "failed to create link"),
        }
    }
    Ok(created)
}

/// Removes `bin_dir/<name>` for every name, but only where it is a symlink.
/// Returns the links that were removed.
pub fn clean(bin_dir: &Path, names: &[&str]) -> Vec<PathBuf> {
    let mut removed = Vec::new();
    for name in names {
        let link = bin_dir.join(name);
        match fs::symlink_metadata(&link) {
            Ok(meta) if meta.file_type().is_symlink() => match fs::remove_file(&link) {
                Ok(()) => {
                    info!(link = %link.display(), "removed");
                    removed.push(link);
                }
                Err(e) => warn!(link = %link.display(), error = %e, "failed to remove link"),
            },
            Ok(_) => warn!(path = %link.display(), "not a symlink, leaving it in place"),
            Err(e) => warn!(link = %link.display(), error = %e, "failed to remove link"),
        }
    }
    removed
}

#[cfg(unix)]
fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(windows)]
fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(src, dst)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_then_clean() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("ox9");
        fs::write(&exe, b"").unwrap();
        let bin = dir.path().join("bin");

        let created = bootstrap(&exe, &bin, &["scan", "dns"]).unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(fs::read_link(bin.join("scan")).unwrap(), exe);

        // Second run: links exist, nothing new.
        assert!(bootstrap(&exe, &bin, &["scan"]).unwrap().is_empty());

        let removed = clean(&bin, &["scan", "dns", "headers"]);
        assert_eq!(removed.len(), 2);
        assert!(!bin.join("scan").exists());
    }

    #[test]
    fn clean_keeps_regular_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("scan");
        fs::write(&file, b"user file").unwrap();
        assert!(clean(dir.path(), &["scan"]).is_empty());
        assert!(file.exists());
    }
}
