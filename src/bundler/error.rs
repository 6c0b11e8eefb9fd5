//! Error types for AppImage bundling.
//!
//! Provides contextual error chaining, filesystem errors that carry the
//! failing path, and one variant per failure class of the maker pipeline.
//!
//! # Features
//!
//! - **Context trait**: Add context to errors similar to anyhow
//! - **ErrorExt trait**: Filesystem operations with automatic path context
//! - **bail! macro**: Early return with formatted error messages
//!
//! # Example
//!
//! ```no_run
//! # use std::path::{Path, PathBuf};
//! # type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
//! #
//! # trait ErrorExt<T> {
//! #     fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
//! # }
//! # impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
//! #     fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
//! #         self.map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
//! #     }
//! # }
//! #
//! fn read_icon(path: &Path) -> Result<Vec<u8>> {
//!     let bytes = std::fs::read(path).fs_context("reading icon", path)?;
//!     Ok(bytes)
//! }
//! ```

use std::{
    fmt::Display,
    io,
    path::{self, PathBuf},
};
use thiserror::Error as DeriveError;

/// Errors returned by the bundler.
///
/// Configuration errors are raised before any staging I/O happens; every
/// other class aborts the build after the staging tree has been released.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// Error with context. Created by the [`Context`] trait.
    #[error("{0}: {1}")]
    Context(String, Box<Self>),

    /// File system error with path context.
    ///
    /// Created by the [`ErrorExt`] trait's `fs_context` method.
    #[error("{context} {path}: {error}")]
    Fs {
        /// Context describing the operation (e.g., "copying icon")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// Target architecture has no AppImage counterpart.
    #[error("Unsupported architecture: '{0}'.")]
    UnsupportedArchitecture(String),

    /// Configured executable is missing from the application directory.
    #[error(
        "Could not find executable '{bin}' in '{dir}'. Make sure the application was \
         packaged, or set the 'bin' (or 'name') option to the executable's file name."
    )]
    ExecutableNotFound {
        /// Executable name that was looked up
        bin: String,
        /// Application directory that was searched
        dir: PathBuf,
    },

    /// Package name has no alphanumeric character to anchor on.
    #[error("unable to sanitize name '{0}': it contains no letter or digit")]
    UnsanitizableName(String),

    /// Icon specification is unusable.
    #[error("invalid icon specification: {0}")]
    InvalidIcon(String),

    /// Downloaded runtime does not match the expected digest.
    #[error("runtime integrity check failed for {origin}: expected MD5 {expected}, got {actual}")]
    IntegrityError {
        /// URL or path the runtime came from
        origin: String,
        /// Expected digest
        expected: String,
        /// Actual digest
        actual: String,
    },

    /// Strict icon set entry disagrees with the file on disk.
    #[error("icon validation failed: '{key}' points at {path} which is {actual}")]
    ValidationError {
        /// Resolution key declared in the icon set
        key: String,
        /// Icon file path
        path: PathBuf,
        /// Dimensions found in the file
        actual: String,
    },

    /// Runtime download answered with a non-success status.
    #[error("failed to fetch AppImage runtime from {url}: {status} {reason}")]
    RuntimeFetchError {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
        /// HTTP reason phrase
        reason: String,
    },

    /// `mksquashfs` exited unsuccessfully.
    #[error("mksquashfs failed ({}){}", exit_description(.code, .signal), diagnostic_suffix(.stderr))]
    CompressorError {
        /// Exit code, when the process exited normally
        code: Option<i32>,
        /// Terminating signal, when the process was killed
        signal: Option<i32>,
        /// Collected standard error text
        stderr: Option<String>,
    },

    /// `mksquashfs` could not be started or queried.
    #[error("failed to run mksquashfs: {0}")]
    CompressorSpawn(String),

    /// Icon bytes are not PNG, SVG or XPM.
    #[error(
        "Unsupported image format (FreeDesktop spec expects images only of following MIME \
         type: PNG, SVG and XPM)."
    )]
    UnsupportedFormat,

    /// Sniffer produced a record violating its own invariants.
    #[error("malformed image metadata: {0}")]
    MalformedMetadata(String),

    /// The user interrupted the build.
    #[error("User interrupted the process.")]
    Interrupted,

    /// Generic I/O error.
    #[error("{0}")]
    IoError(#[from] io::Error),

    /// Error walking directory (application tree copy).
    #[error("{0}")]
    WalkdirError(#[from] walkdir::Error),

    /// Path prefix stripping error.
    #[error("{0}")]
    StripError(#[from] path::StripPrefixError),

    /// Handlebars template rendering error.
    #[error("{0}")]
    HandleBarsError(#[from] handlebars::RenderError),

    /// Handlebars template parsing error.
    #[error("{0}")]
    Template(#[from] handlebars::TemplateError),

    /// JSON serialization/deserialization error.
    #[error("{0}")]
    JsonError(#[from] serde_json::error::Error),

    /// TOML options parsing error.
    #[error("{0}")]
    TomlError(#[from] toml::de::Error),

    /// HTTP client error (downloading the runtime).
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("{0}")]
    UrlParse(#[from] url::ParseError),

    /// Binary parsing error (runtime ELF validation).
    #[error("binary parse error: {0}")]
    BinaryParseError(#[from] goblin::error::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    GenericError(String),
}

fn exit_description(code: &Option<i32>, signal: &Option<i32>) -> String {
    match (*code, *signal) {
        (Some(code), _) => format!("exit code {code}"),
        (None, Some(signal)) => format!("killed by signal {signal}"),
        (None, None) => "unknown exit status".to_string(),
    }
}

fn diagnostic_suffix(stderr: &Option<String>) -> String {
    match stderr.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => format!(": {text}"),
        _ => String::new(),
    }
}

impl Error {
    /// Whether this error was raised while resolving configuration, before
    /// any staging I/O.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedArchitecture(_)
                | Error::ExecutableNotFound { .. }
                | Error::UnsanitizableName(_)
                | Error::InvalidIcon(_)
        )
    }

    /// Whether the build was aborted by a user interrupt.
    pub fn is_interrupt(&self) -> bool {
        match self {
            Error::Interrupted => true,
            Error::Context(_, inner) => inner.is_interrupt(),
            _ => false,
        }
    }
}

/// Convenient type alias for Result.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for adding context to errors.
///
/// Similar to `anyhow::Context` but integrated with bundler's Error type.
/// Works with both `Result<T, E>` and `Option<T>`.
pub trait Context<T> {
    /// Add context to an error.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation).
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::Context(context.to_string(), Box::new(e)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::Context(f().to_string(), Box::new(e)))
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

/// Extension trait for filesystem operations with automatic path context.
pub trait ErrorExt<T> {
    /// Add filesystem context to an I/O error.
    ///
    /// The `context` should be a present-tense verb phrase describing the operation,
    /// e.g., "reading file", "creating directory", "copying icon".
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.into(),
            error,
        })
    }
}

/// Macro for early return with error.
///
/// Converts the message into a [`Error::GenericError`] and returns immediately.
///
/// ```ignore
/// bail!("operation failed");
/// bail!("invalid value: {}", value);
/// ```
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::bundler::error::Error::GenericError($msg.into()))
    };
    ($err:expr $(,)?) => {
        return Err($crate::bundler::error::Error::GenericError($err.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::bundler::error::Error::GenericError(format!($fmt, $($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executable_not_found_message_prefix() {
        let err = Error::ExecutableNotFound {
            bin: "invalid".into(),
            dir: PathBuf::from("/tmp/app"),
        };
        assert!(err.to_string().starts_with("Could not find executable"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_unsupported_arch_message() {
        let err = Error::UnsupportedArchitecture("wrong-arch".into());
        assert_eq!(err.to_string(), "Unsupported architecture: 'wrong-arch'.");
    }

    #[test]
    fn test_compressor_error_includes_stderr() {
        let err = Error::CompressorError {
            code: Some(1),
            signal: None,
            stderr: Some("FATAL ERROR: no space left\n".into()),
        };
        assert_eq!(
            err.to_string(),
            "mksquashfs failed (exit code 1): FATAL ERROR: no space left"
        );

        let err = Error::CompressorError {
            code: None,
            signal: Some(9),
            stderr: None,
        };
        assert_eq!(err.to_string(), "mksquashfs failed (killed by signal 9)");
    }

    #[test]
    fn test_interrupt_seen_through_context() {
        let err: Result<()> = Err(Error::Interrupted);
        let err = err.context("staging application").unwrap_err();
        assert!(err.is_interrupt());
    }
}
