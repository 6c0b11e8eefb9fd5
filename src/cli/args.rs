//! Command line argument parsing and validation.
//!
//! The binary stands in for a packaging host: it collects the same metadata
//! a host would pass to the maker and runs one build.

use clap::Parser;
use std::path::PathBuf;

/// Build a Linux AppImage from a packaged application directory
#[derive(Parser, Debug)]
#[command(
    name = "kodegen_bundler_appimage",
    version,
    about = "Build a Linux AppImage from a packaged application directory",
    long_about = "Package a prepared application directory into a single self-mounting \
AppImage executable.

Usage:
  kodegen_bundler_appimage --dir out/my-app-linux-x64 --package-json package.json
  kodegen_bundler_appimage --dir out/app --package-json package.json --arch arm64 --config appimage.toml"
)]
pub struct Args {
    /// Packaged application directory containing the executable
    #[arg(long, value_name = "DIR")]
    pub dir: PathBuf,

    /// Output base directory; the AppImage lands in <MAKE_DIR>/AppImage/<arch>/
    #[arg(long, value_name = "MAKE_DIR", default_value = "out/make")]
    pub make_dir: PathBuf,

    /// package.json supplying the package name and version
    #[arg(long, value_name = "FILE", default_value = "package.json")]
    pub package_json: PathBuf,

    /// Target architecture (x64, ia32, arm64, armv7l); defaults to the host
    #[arg(long, value_name = "ARCH")]
    pub arch: Option<String>,

    /// Application display name; defaults to the manifest's productName or name
    #[arg(long, value_name = "NAME")]
    pub app_name: Option<String>,

    /// Maker options file (.json or .toml)
    #[arg(long, short = 'c', value_name = "FILE", env = "APPIMAGE_MAKER_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.dir.as_os_str().is_empty() {
            return Err("Application directory is required".to_string());
        }
        if matches!(&self.arch, Some(arch) if arch.trim().is_empty()) {
            return Err("Architecture must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["kodegen_bundler_appimage", "--dir", "app"]).unwrap();
        assert_eq!(args.dir, PathBuf::from("app"));
        assert_eq!(args.make_dir, PathBuf::from("out/make"));
        assert_eq!(args.package_json, PathBuf::from("package.json"));
        assert!(args.arch.is_none());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_dir_is_required() {
        assert!(Args::try_parse_from(["kodegen_bundler_appimage"]).is_err());
    }

    #[test]
    fn test_blank_arch_rejected() {
        let args =
            Args::try_parse_from(["kodegen_bundler_appimage", "--dir", "app", "--arch", " "]).unwrap();
        assert!(args.validate().is_err());
    }
}
