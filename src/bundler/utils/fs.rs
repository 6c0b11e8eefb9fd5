//! File system utilities for staging.
//!
//! Provides the recursive application copy, relative symlink creation and
//! permission helpers used while laying out the AppImage tree.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Mode applied to staged directories and executables.
pub const EXEC_MODE: u32 = 0o755;

/// Removes the file if it exists.
pub async fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).fs_context("removing file", path),
    }
}

/// Sets the Unix permission bits of `path`.
#[cfg(unix)]
pub async fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .fs_context("setting permissions", path)
}

/// Sets the Unix permission bits of `path`.
#[cfg(not(unix))]
pub async fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Makes a symbolic link at `link` whose content is `target`, verbatim.
#[cfg(unix)]
pub async fn symlink(target: &Path, link: &Path) -> Result<()> {
    fs::symlink(target, link)
        .await
        .fs_context("creating symlink", link)
}

/// Makes a symbolic link at `link` whose content is `target`, verbatim.
#[cfg(not(unix))]
pub async fn symlink(_target: &Path, link: &Path) -> Result<()> {
    Err(Error::GenericError(format!(
        "cannot create symlink {}: symlinks require a Unix host",
        link.display()
    )))
}

/// Computes `to` relative to the directory `from`.
///
/// Both paths must be of the same kind (both absolute or both relative) and
/// free of `..` components.
pub fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from: Vec<Component<'_>> = from.components().collect();
    let to: Vec<Component<'_>> = to.components().collect();
    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..from.len() {
        rel.push("..");
    }
    for part in &to[common..] {
        rel.push(part.as_os_str());
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    rel
}

/// Creates a symlink at `link` pointing at `target`, both given relative to
/// `root`, with the link content expressed relative to the link's directory.
pub async fn symlink_relative(root: &Path, target: &Path, link: &Path) -> Result<()> {
    let link_dir = link.parent().unwrap_or_else(|| Path::new(""));
    let content = relative_path(link_dir, target);
    symlink(&content, &root.join(link)).await
}

/// Recursively copies a directory from one path to another, creating any
/// parent directories of the destination path as necessary.
///
/// Symlinks are recreated with their original content. Fails if the source
/// is not a directory, or if any destination entry already exists.
pub async fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    let meta = fs::metadata(from).await.fs_context("reading directory", from)?;
    if !meta.is_dir() {
        return Err(Error::GenericError(format!(
            "{} is not a directory",
            from.display()
        )));
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .await
            .fs_context("creating directory", parent)?;
    }

    for entry in walkdir::WalkDir::new(from).follow_links(false) {
        let entry = entry?;
        debug_assert!(entry.path().starts_with(from));
        let rel_path = entry.path().strip_prefix(from)?;
        let dest_path = to.join(rel_path);

        if fs::symlink_metadata(&dest_path).await.is_ok() {
            return Err(Error::Fs {
                context: "copying application into existing entry",
                path: dest_path,
                error: std::io::Error::from(std::io::ErrorKind::AlreadyExists),
            });
        }

        if entry.file_type().is_symlink() {
            let target = fs::read_link(entry.path())
                .await
                .fs_context("reading symlink", entry.path())?;
            symlink(&target, &dest_path).await?;
        } else if entry.file_type().is_dir() {
            fs::create_dir(&dest_path)
                .await
                .fs_context("creating directory", &dest_path)?;
            set_mode(&dest_path, EXEC_MODE).await?;
        } else {
            fs::copy(entry.path(), &dest_path)
                .await
                .fs_context("copying file", entry.path())?;
        }
    }

    Ok(())
}
