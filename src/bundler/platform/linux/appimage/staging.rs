//! AppDir staging tree.
//!
//! The tree handed to `mksquashfs` looks like:
//!
//! ```text
//! AppRun -> usr/bin/<bin>
//! <ProductName>.desktop
//! .DirIcon -> usr/share/icons/hicolor/<default>/apps/<name>.<ext>
//! <name>.<ext> -> usr/share/icons/hicolor/<default>/apps/<name>.<ext>
//! usr/bin/<bin>                     launcher (symlink or flags script)
//! usr/lib/<name>/...                copied application directory
//! usr/share/icons/hicolor/<key>/apps/<name>.<ext>
//! ```

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    platform::linux::freedesktop,
    resources::icons::IconSet,
    settings::Settings,
    utils::fs::{self as fs_utils, EXEC_MODE},
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::launcher;

/// Uniquely named staging directory in the system temp dir.
///
/// Removed when [`close`](Self::close) is called or when the guard is
/// dropped, whichever comes first. Dropping covers error returns and
/// cancellation of the owning future.
#[derive(Debug)]
pub struct StagingDir {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl StagingDir {
    /// Create `.<product>-<version>-<arch>-XXXXXX` under the temp dir.
    pub fn create(settings: &Settings) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&settings.staging_prefix())
            .tempdir()
            .fs_context("creating staging directory", std::env::temp_dir())?;
        let path = dir.path().to_path_buf();
        log::debug!("Staging in {}", path.display());
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    /// Staging root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory now, reporting failures.
    pub fn close(mut self) -> Result<()> {
        match self.dir.take() {
            Some(dir) => {
                log::debug!("Removing staging directory {}", self.path.display());
                dir.close().fs_context("removing staging directory", &self.path)
            }
            None => Ok(()),
        }
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            log::debug!("Discarding staging directory {}", self.path.display());
            if let Err(e) = dir.close() {
                log::warn!("Failed to remove {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Fail with [`Error::ExecutableNotFound`] unless `<dir>/<bin>` is a file.
pub async fn ensure_executable(settings: &Settings) -> Result<PathBuf> {
    let path = settings.app_dir().join(settings.bin());
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Ok(path),
        _ => Err(Error::ExecutableNotFound {
            bin: settings.bin().to_string(),
            dir: settings.app_dir().to_path_buf(),
        }),
    }
}

/// Name of the desktop entry at the staging root.
pub fn desktop_file_name(settings: &Settings) -> String {
    format!("{}.desktop", settings.product_name())
}

/// Populate `root` with the AppDir layout.
///
/// Independent jobs run concurrently; each dependent step is chained after
/// the job it needs. The root is set to 0755 once everything has landed.
pub async fn stage(settings: &Settings, root: &Path, desktop: &str, icons: &IconSet) -> Result<()> {
    let app_tree = async {
        let dest = root.join("usr/lib").join(settings.name());
        fs_utils::copy_dir(settings.app_dir(), &dest).await?;
        log::debug!("Copied {} into {}", settings.app_dir().display(), dest.display());
        Ok::<_, Error>(())
    };

    let entry_point = async {
        let bin_dir = root.join("usr/bin");
        tokio::fs::create_dir_all(&bin_dir)
            .await
            .fs_context("creating directory", &bin_dir)?;
        launcher::install_launcher(settings, root).await?;
        Ok::<_, Error>(())
    };

    let desktop_file = async {
        let dest = root.join(desktop_file_name(settings));
        tokio::fs::write(&dest, desktop)
            .await
            .fs_context("writing desktop file", &dest)?;
        fs_utils::set_mode(&dest, EXEC_MODE).await
    };

    let launcher_path = launcher::launcher_path(settings.bin());
    let app_run = fs_utils::symlink_relative(root, &launcher_path, Path::new("AppRun"));

    let icon_files = async {
        freedesktop::install_icons(icons, root, settings.name()).await?;
        link_default_icon(settings, root, icons).await
    };

    tokio::try_join!(app_tree, entry_point, desktop_file, app_run, icon_files)?;

    fs_utils::set_mode(root, EXEC_MODE).await
}

/// Root-level `.DirIcon` and `<name>.<ext>` links to the default icon.
async fn link_default_icon(settings: &Settings, root: &Path, icons: &IconSet) -> Result<()> {
    let Some(entry) = icons.default_entry() else {
        return Ok(());
    };
    let target = freedesktop::icon_theme_path(&entry.key, settings.name(), &entry.extension);
    let named = PathBuf::from(format!("{}.{}", settings.name(), entry.extension));

    tokio::try_join!(
        fs_utils::symlink_relative(root, &target, Path::new(".DirIcon")),
        fs_utils::symlink_relative(root, &target, &named),
    )?;
    log::debug!("Default icon {} linked at root", target.display());
    Ok(())
}
