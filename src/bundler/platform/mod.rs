//! Platform-specific bundling implementations.
//!
//! Only the Linux AppImage format is produced. The [`linux`] module is
//! compiled on every host so configuration and staging can be exercised
//! anywhere; [`PackageType::all_for_current_platform()`] reports what can
//! actually be built here.

pub mod linux;

use std::fmt;

/// Package formats the bundler can create.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum PackageType {
    /// Linux AppImage (.AppImage).
    ///
    /// A runtime stub followed by a SquashFS image; runs without installation.
    AppImage,
}

impl PackageType {
    /// Returns the short name for this package type.
    ///
    /// This is the lowercase identifier used in CLI output and file paths.
    pub fn short_name(&self) -> &'static str {
        match self {
            PackageType::AppImage => "appimage",
        }
    }

    /// Host platforms this package type is built on.
    pub fn platforms(&self) -> &'static [&'static str] {
        match self {
            PackageType::AppImage => &["linux"],
        }
    }

    /// Returns all package types available on the current platform.
    ///
    /// - **Linux**: `[AppImage]`
    /// - **Other**: `[]` (empty)
    pub fn all_for_current_platform() -> Vec<PackageType> {
        if cfg!(target_os = "linux") {
            vec![PackageType::AppImage]
        } else {
            vec![]
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name_and_platforms() {
        assert_eq!(PackageType::AppImage.to_string(), "appimage");
        assert_eq!(PackageType::AppImage.platforms(), ["linux"]);
        assert_eq!(
            PackageType::all_for_current_platform().is_empty(),
            !cfg!(target_os = "linux")
        );
    }
}
