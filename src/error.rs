//! Error types for the `kodegen_bundler_appimage` binary.
//!
//! Wraps library errors and adds actionable recovery suggestions.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for binary-level operations
pub type Result<T> = std::result::Result<T, BundlerError>;

/// Main error type for the command-line front end
#[derive(Error, Debug)]
pub enum BundlerError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bundler errors
    #[error("{0}")]
    Bundler(#[from] crate::bundler::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Input path does not exist
    #[error("{what} not found at {path}")]
    MissingInput {
        /// Kind of input
        what: &'static str,
        /// Path that was given
        path: PathBuf,
    },

    /// Host cannot build AppImages
    #[error("AppImage bundling is not supported on {platform}")]
    UnsupportedPlatform {
        /// Current platform
        platform: &'static str,
    },

    /// Required executable missing from PATH
    #[error("Required tool '{tool}' was not found in PATH")]
    MissingTool {
        /// Executable name
        tool: &'static str,
    },
}

impl BundlerError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        use crate::bundler::Error as B;

        match self {
            BundlerError::Cli(CliError::MissingTool { tool }) => vec![
                format!("Install squashfs-tools to provide '{}'", tool),
                "Debian/Ubuntu: sudo apt install squashfs-tools".to_string(),
                "Fedora: sudo dnf install squashfs-tools".to_string(),
            ],
            BundlerError::Cli(CliError::MissingInput { .. }) => vec![
                "Check the path passed on the command line".to_string(),
            ],
            BundlerError::Bundler(B::ExecutableNotFound { bin, .. }) => vec![
                format!("Verify the packaged application contains '{}'", bin),
                "Set 'bin' in the options file to the executable's file name".to_string(),
            ],
            BundlerError::Bundler(B::UnsupportedArchitecture(_)) => vec![
                "Use one of: x64, ia32, arm64, armv7l".to_string(),
            ],
            BundlerError::Bundler(B::UnsanitizableName(_)) => vec![
                "Set 'name' in the options file to a name containing letters or digits".to_string(),
            ],
            BundlerError::Bundler(B::RuntimeFetchError { .. } | B::HttpError(_)) => vec![
                "Check network access to the runtime mirror".to_string(),
                "Set APPIMAGE_RUNTIME_MIRROR to a reachable mirror".to_string(),
                "Or point 'runtime' at a local runtime file".to_string(),
            ],
            BundlerError::Bundler(B::IntegrityError { .. }) => vec![
                "Check that 'runtimeMd5' matches the digest published for the pinned release".to_string(),
                "Or switch 'AppImageKitRelease' back to \"continuous\"".to_string(),
            ],
            BundlerError::Bundler(B::CompressorError { .. } | B::CompressorSpawn(_)) => vec![
                "Verify mksquashfs runs: mksquashfs -version".to_string(),
                "Check free space in the output and temp directories".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            BundlerError::Bundler(e) if e.is_interrupt() => 130,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_exit_code() {
        let err = BundlerError::from(crate::bundler::Error::Interrupted);
        assert_eq!(err.exit_code(), 130);
        assert_eq!(err.to_string(), "User interrupted the process.");

        let err = BundlerError::from(CliError::MissingTool { tool: "mksquashfs" });
        assert_eq!(err.exit_code(), 1);
        assert!(err.recovery_suggestions()[0].contains("squashfs-tools"));
    }

    #[test]
    fn test_integrity_error_suggests_digest_override() {
        let err = BundlerError::from(crate::bundler::Error::IntegrityError {
            origin: "https://example.invalid/runtime-x86_64".into(),
            expected: "00000000000000000000000000000000".into(),
            actual: "ffffffffffffffffffffffffffffffff".into(),
        });
        assert_eq!(err.exit_code(), 1);
        assert!(err.recovery_suggestions()[0].contains("runtimeMd5"));
    }
}
