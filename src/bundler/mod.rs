//! AppImage maker for prepared Electron application directories.
//!
//! Turns a packaged application directory into a single portable
//! `.AppImage`: the AppImage runtime stub followed by a SquashFS image of an
//! AppDir holding the application, its desktop entry, launcher and icons.
//!
//! # Configuration
//!
//! Options are the camelCase keys of [`AppImageOptions`], usually loaded
//! from a JSON or TOML file:
//!
//! ```toml
//! productName = "My App"
//! categories = ["Development"]
//! compressor = "xz"
//!
//! [icon]
//! "256x256" = "assets/icon.png"
//! scalable = "assets/icon.svg"
//! ```
//!
//! # Integration
//!
//! ```no_run
//! use kodegen_bundler_appimage::bundler::{AppImageOptions, MakerAppImage, MakerMeta};
//!
//! # async fn example(meta: MakerMeta) -> kodegen_bundler_appimage::bundler::Result<()> {
//! let options = AppImageOptions::from_file("appimage.toml".as_ref()).await?;
//! let maker = MakerAppImage::new(options);
//! if maker.is_supported_on_current_platform() && maker.external_binaries_exist() {
//!     let artifacts = maker.make(&meta).await?;
//!     println!("{}", artifacts[0].display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Environment
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `APPIMAGE_RUNTIME_MIRROR` | Host the runtime is downloaded from |
//! | `APPIMAGE_RUNTIME_MIRROR_PATH` | Path template with `{tag}` and `{arch}` |
//! | `SOURCE_DATE_EPOCH` | Forwarded to `mksquashfs`; disables timestamp zeroing |

#![warn(missing_docs)]

mod builder;
pub mod error;
pub(crate) mod platform;
mod resources;
mod settings;
mod utils;

// Public re-exports
pub use builder::{Bundler, MakerAppImage};
pub use error::{Error, Result};
pub use platform::linux::appimage::{RelayMessage, PROGRESS_PROTOCOL_TAG};
pub use platform::PackageType;
pub use settings::{
    map_arch,
    sanitize_name,
    AppImageOptions,
    // Architecture detection
    Arch,
    Compressor,
    DesktopAction,
    Environment,
    IconSetConfig,
    IconSpec,
    // Host contract
    MakerMeta,
    OrderedMap,
    PackageManifest,
    ReleaseTag,
    RuntimeSource,
    // Main configuration type
    Settings,
};

/// A bundled artifact result containing metadata about the created AppImage.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_appimage::bundler::{Bundler, Settings};
///
/// # async fn example(settings: Settings) -> kodegen_bundler_appimage::bundler::Result<()> {
/// let artifact = Bundler::new(settings).bundle().await?;
/// println!("Created {}: {} bytes", artifact.package_type, artifact.size);
/// println!("SHA256: {}", artifact.checksum);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BundledArtifact {
    /// The package type that was created.
    pub package_type: PackageType,

    /// Paths to all files created as part of this bundle.
    pub paths: Vec<std::path::PathBuf>,

    /// Total size of the artifacts in bytes.
    pub size: u64,

    /// SHA-256 checksum of the main artifact for integrity verification.
    ///
    /// This can be published alongside the artifact for users to verify downloads.
    pub checksum: String,
}
