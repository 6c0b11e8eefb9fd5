//! Bundle orchestration and the host-facing maker.
//!
//! [`Bundler`] drives one AppImage build for resolved [`Settings`] and
//! returns [`BundledArtifact`] metadata. [`MakerAppImage`] is the surface a
//! packaging host talks to: it declares its platform and tool requirements
//! and turns a [`MakerMeta`] plus user options into artifact paths.
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_appimage::bundler::{
//!     AppImageOptions, MakerAppImage, MakerMeta, PackageManifest,
//! };
//!
//! # async fn example() -> kodegen_bundler_appimage::bundler::Result<()> {
//! let maker = MakerAppImage::new(AppImageOptions::default());
//! let meta = MakerMeta {
//!     app_name: "My App".into(),
//!     dir: "out/my-app-linux-x64".into(),
//!     make_dir: "out/make".into(),
//!     package: PackageManifest::from_file("package.json".as_ref()).await?,
//!     target_arch: "x64".into(),
//! };
//!
//! for path in maker.make(&meta).await? {
//!     println!("Created: {}", path.display());
//! }
//! # Ok(())
//! # }
//! ```

use crate::bail;
use crate::bundler::{
    error::{Error, ErrorExt},
    platform::{linux::appimage, PackageType},
    settings::{AppImageOptions, Environment, MakerMeta},
    BundledArtifact, RelayMessage, Result, Settings,
};
use std::{path::PathBuf, sync::LazyLock};
use tokio::sync::mpsc::UnboundedSender;

/// Check if mksquashfs is available for AppImage creation.
///
/// Cached result to avoid repeated lookups when several builds run.
static HAS_MKSQUASHFS: LazyLock<bool> = LazyLock::new(|| match which::which(appimage::squashfs::MKSQUASHFS) {
    Ok(path) => {
        log::debug!("Found mksquashfs at: {}", path.display());
        true
    }
    Err(e) => {
        log::debug!("mksquashfs not found in PATH: {}", e);
        false
    }
});

/// Main bundler orchestrator.
///
/// Runs the AppImage pipeline for one set of [`Settings`]. A terminal
/// interrupt (Ctrl+C) during the build aborts it with
/// [`Error::Interrupted`] after the staging directory and any running
/// `mksquashfs` process have been torn down.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_appimage::bundler::{Bundler, Settings};
///
/// # async fn example(settings: Settings) -> kodegen_bundler_appimage::bundler::Result<()> {
/// let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
/// let bundler = Bundler::new(settings).with_progress_relay(tx);
///
/// tokio::spawn(async move {
///     while let Some(msg) = rx.recv().await {
///         println!("{}: {}%", msg.tag, msg.percent);
///     }
/// });
///
/// let artifact = bundler.bundle().await?;
/// println!("SHA256: {}", artifact.checksum);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Bundler {
    settings: Settings,
    relay: Option<UnboundedSender<RelayMessage>>,
}

impl Bundler {
    /// Creates a new bundler with the given settings.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            relay: None,
        }
    }

    /// Forward `mksquashfs` progress to `relay`.
    pub fn with_progress_relay(mut self, relay: UnboundedSender<RelayMessage>) -> Self {
        self.relay = Some(relay);
        self
    }

    /// Build the AppImage and collect artifact metadata.
    pub async fn bundle(&self) -> Result<BundledArtifact> {
        let paths = tokio::select! {
            result = appimage::bundle_project(&self.settings, self.relay.as_ref()) => result?,
            Ok(()) = tokio::signal::ctrl_c() => {
                log::warn!("Interrupted; build aborted");
                return Err(Error::Interrupted);
            }
        };

        let mut size = 0u64;
        for p in &paths {
            let metadata = tokio::fs::metadata(p)
                .await
                .fs_context("reading artifact metadata", p)?;
            size += metadata.len();
        }

        let checksum = if let Some(first_path) = paths.first() {
            calculate_sha256(first_path).await?
        } else {
            bail!("AppImage bundler returned no paths - this indicates a bundler bug");
        };

        Ok(BundledArtifact {
            package_type: PackageType::AppImage,
            paths,
            size,
            checksum,
        })
    }

    /// Returns a reference to the bundler settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

/// AppImage maker as seen by a packaging host.
#[derive(Debug, Clone, Default)]
pub struct MakerAppImage {
    options: AppImageOptions,
    relay: Option<UnboundedSender<RelayMessage>>,
}

impl MakerAppImage {
    /// Maker using `options` for every build.
    pub fn new(options: AppImageOptions) -> Self {
        Self {
            options,
            relay: None,
        }
    }

    /// Forward `mksquashfs` progress of every build to `relay`.
    pub fn with_progress_relay(mut self, relay: UnboundedSender<RelayMessage>) -> Self {
        self.relay = Some(relay);
        self
    }

    /// Maker name.
    pub fn name(&self) -> &'static str {
        "AppImage"
    }

    /// Platforms this maker targets by default.
    pub fn default_platforms(&self) -> &'static [&'static str] {
        PackageType::AppImage.platforms()
    }

    /// Executables that must be on `PATH`.
    pub fn required_external_binaries(&self) -> &'static [&'static str] {
        &[appimage::squashfs::MKSQUASHFS]
    }

    /// Whether the host can run this maker.
    pub fn is_supported_on_current_platform(&self) -> bool {
        PackageType::all_for_current_platform().contains(&PackageType::AppImage)
    }

    /// Whether every required executable was found.
    pub fn external_binaries_exist(&self) -> bool {
        *HAS_MKSQUASHFS
    }

    /// Resolve settings for `meta` against this maker's options.
    pub fn settings_for(&self, meta: &MakerMeta) -> Result<Settings> {
        Settings::resolve(meta, self.options.clone(), Environment::from_process())
    }

    /// Build an AppImage and return the artifact paths.
    pub async fn make(&self, meta: &MakerMeta) -> Result<Vec<PathBuf>> {
        let settings = self.settings_for(meta)?;
        let mut bundler = Bundler::new(settings);
        if let Some(relay) = &self.relay {
            bundler = bundler.with_progress_relay(relay.clone());
        }
        Ok(bundler.bundle().await?.paths)
    }
}

/// Calculates the SHA-256 checksum of a file.
///
/// Reads in 8KB chunks and returns the hex-encoded digest.
async fn calculate_sha256(path: &std::path::Path) -> Result<String> {
    use sha2::{Digest, Sha256};
    use tokio::io::AsyncReadExt;

    let mut file = tokio::fs::File::open(path)
        .await
        .fs_context("opening file for hashing", path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .fs_context("reading file for hash calculation", path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maker_declarations() {
        let maker = MakerAppImage::default();
        assert_eq!(maker.name(), "AppImage");
        assert_eq!(maker.default_platforms(), ["linux"]);
        assert_eq!(maker.required_external_binaries(), ["mksquashfs"]);
        assert_eq!(
            maker.is_supported_on_current_platform(),
            cfg!(target_os = "linux")
        );
    }

    #[tokio::test]
    async fn test_calculate_sha256() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("artifact");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(
            calculate_sha256(&path).await.unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
