//! Linux bundling support.
//!
//! # Build Requirements
//!
//! | Format | Required Tools |
//! |--------|----------------|
//! | AppImage | `mksquashfs` (squashfs-tools) |
//!
//! # Output Location
//!
//! Bundles are created under the host's make directory:
//! - `<makeDir>/AppImage/<arch>/<ProductName>-<version>-<arch>.AppImage`
//!
//! # Desktop Integration
//!
//! The [`freedesktop`] module provides FreeDesktop.org specification support
//! for `.desktop` files and hicolor icon theme placement.

pub mod appimage;
pub mod freedesktop;
