//! # Kodegen AppImage Bundler
//!
//! Packages a prepared (Electron) application directory into a Linux
//! AppImage: the AppImage runtime stub followed by a SquashFS image of an
//! AppDir containing the application, a desktop entry, a launcher and icons.
//!
//! ## Features
//!
//! - **Host contract**: [`MakerAppImage`] declares its platform and the
//!   `mksquashfs` requirement, and builds from [`bundler::MakerMeta`]
//! - **Icons**: PNG, SVG and XPM sniffing with multi-resolution icon sets
//! - **Runtime**: continuous or pinned releases, MD5 verification, mirrors
//!   and a download cache
//! - **Cleanup**: the staging tree is removed on success, failure and Ctrl+C
//!
//! ## Usage
//!
//! ```bash
//! kodegen_bundler_appimage --dir out/my-app-linux-x64 --package-json package.json
//! kodegen_bundler_appimage --dir out/my-app-linux-x64 --arch arm64 --config appimage.toml
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Core modules
pub mod bundler;
pub mod cli;
pub mod error;

// Re-export main types for public API
pub use bundler::{BundledArtifact, Bundler, MakerAppImage, PackageType};
pub use cli::Args;
pub use error::{BundlerError, CliError, Result};
