//! AppImage bundler for Linux.
//!
//! Builds a portable `.AppImage` from a prepared application directory:
//! an ELF runtime stub followed directly by a SquashFS image of an AppDir.
//!
//! # Pipeline
//!
//! 1. **Init**: the executable must exist in the application directory.
//! 2. **Prepare**: fetch the runtime, produce the desktop entry, normalize
//!    icons and detect the `mksquashfs` version, all concurrently.
//! 3. **Stage**: populate a temporary AppDir (see [`staging`]).
//! 4. **Compress**: run `mksquashfs` over the AppDir.
//! 5. **Assemble**: write runtime + image to the output path, mode 0755.
//! 6. **Cleanup**: the staging directory is removed on every exit path.
//!
//! # Requirements
//!
//! - `mksquashfs` on `PATH`
//! - Network access for the runtime, unless `runtime` names a local file or
//!   a cached download exists

pub mod launcher;
pub mod runtime;
pub mod squashfs;
pub mod staging;

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    platform::linux::freedesktop,
    resources::icons,
    settings::Settings,
    utils::fs::{self as fs_utils, EXEC_MODE},
};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;

pub use squashfs::{RelayMessage, PROGRESS_PROTOCOL_TAG};

/// File name of the intermediate image inside its scratch directory.
const IMAGE_NAME: &str = "image.squashfs";

/// Build the AppImage described by `settings`.
///
/// Progress percentages are forwarded to `relay` when one is given. Returns
/// the path of the produced artifact.
pub async fn bundle_project(
    settings: &Settings,
    relay: Option<&UnboundedSender<RelayMessage>>,
) -> Result<Vec<PathBuf>> {
    log::info!(
        "Bundling AppImage {} {} ({})",
        settings.product_name(),
        settings.version(),
        settings.appimage_arch()
    );

    staging::ensure_executable(settings).await?;

    let has_icon = settings.options().icon.is_some();
    let (runtime, desktop, icon_set, version) = tokio::try_join!(
        runtime::fetch_runtime(settings),
        freedesktop::desktop_entry(settings, has_icon),
        icons::normalize_icons(settings.options().icon.as_ref()),
        squashfs::detect_version(settings.env()),
    )?;
    log::debug!(
        "Prepared runtime ({} bytes), {} icon(s) with default {:?}, mksquashfs {}",
        runtime.len(),
        icon_set.entries().len(),
        icon_set.default_key(),
        version
    );

    let staging = staging::StagingDir::create(settings)?;
    staging::stage(settings, staging.path(), &desktop, &icon_set).await?;
    log::info!("Staged AppDir at {}", staging.path().display());

    let out_file = settings.out_file();
    let out_dir = out_file
        .parent()
        .ok_or_else(|| Error::GenericError(format!("invalid output path {}", out_file.display())))?;
    tokio::fs::create_dir_all(out_dir)
        .await
        .fs_context("creating output directory", out_dir)?;

    let scratch = tempfile::Builder::new()
        .prefix(".squashfs-")
        .tempdir_in(out_dir)
        .fs_context("creating image scratch directory", out_dir)?;
    let image = scratch.path().join(IMAGE_NAME);

    let args = squashfs::build_args(
        staging.path(),
        &image,
        &version,
        settings.compressor(),
        settings.env().source_date_epoch.is_some(),
    );
    log::info!("Compressing AppDir with {}", squashfs::MKSQUASHFS);
    squashfs::spawn(args, settings.env())?
        .wait(|percent| {
            log::debug!("mksquashfs: {}%", percent);
            if let Some(relay) = relay {
                let _ = relay.send(RelayMessage::new(percent));
            }
        })
        .await?;

    assemble(&runtime, &image, out_file).await?;
    scratch
        .close()
        .fs_context("removing image scratch directory", out_dir)?;
    staging.close()?;

    log::info!("✓ Created AppImage: {}", out_file.display());
    Ok(vec![out_file.to_path_buf()])
}

/// Write `runtime` followed by the image at `image` to `out_file`.
///
/// The artifact is written to a temporary file next to `out_file` and
/// renamed into place, so a failed or cancelled build never leaves a partial
/// AppImage. The temporary file is deleted when the future is dropped.
async fn assemble(runtime: &[u8], image: &Path, out_file: &Path) -> Result<()> {
    use tokio::io::AsyncWriteExt;

    fs_utils::remove_file_if_exists(out_file).await?;

    let dir = out_file.parent().unwrap_or_else(|| Path::new("."));
    let tmp = tempfile::Builder::new()
        .prefix(".appimage-")
        .tempfile_in(dir)
        .fs_context("creating artifact", dir)?;
    let handle = tmp
        .as_file()
        .try_clone()
        .fs_context("opening artifact", tmp.path())?;
    let mut artifact = tokio::fs::File::from_std(handle);

    artifact
        .write_all(runtime)
        .await
        .fs_context("writing runtime", tmp.path())?;
    let mut squashfs = tokio::fs::File::open(image)
        .await
        .fs_context("opening SquashFS image", image)?;
    tokio::io::copy(&mut squashfs, &mut artifact)
        .await
        .fs_context("appending SquashFS image", image)?;
    artifact
        .flush()
        .await
        .fs_context("flushing artifact", tmp.path())?;
    artifact
        .sync_all()
        .await
        .fs_context("syncing artifact", tmp.path())?;
    drop(artifact);
    fs_utils::set_mode(tmp.path(), EXEC_MODE).await?;

    tmp.persist(out_file)
        .map_err(|e| e.error)
        .fs_context("moving artifact into place", out_file)?;
    log::debug!("Assembled {}", out_file.display());
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_assemble_concatenates_runtime_and_image() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        let image = tmp.path().join("image.squashfs");
        std::fs::write(&image, b"hsqs-image").unwrap();
        let out = tmp.path().join("App-1.0.0-x64.AppImage");
        std::fs::write(&out, b"stale").unwrap();

        assemble(b"\x7fELF-runtime", &image, &out).await.unwrap();

        assert_eq!(std::fs::read(&out).unwrap(), b"\x7fELF-runtimehsqs-image");
        let mode = std::fs::metadata(&out).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[tokio::test]
    async fn test_failed_assembly_leaves_no_partial_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let out = tmp.path().join("App-1.0.0-x64.AppImage");
        let missing = tmp.path().join("missing.squashfs");

        assert!(assemble(b"\x7fELF-runtime", &missing, &out).await.is_err());

        let leftovers: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert!(leftovers.is_empty(), "{leftovers:?}");
    }
}
