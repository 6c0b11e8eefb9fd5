//! `mksquashfs` invocation.
//!
//! The compressor runs as an opaque child process with a minimal environment
//! (`PATH` and, when set, `SOURCE_DATE_EPOCH`). Its flags depend on the
//! version it reports, its standard output is scanned for progress, and its
//! lifecycle is surfaced as a stream of [`CompressorEvent`]s.

use crate::bundler::{
    error::{Error, Result},
    settings::{Compressor, Environment},
};
use regex::Regex;
use semver::Version;
use std::{
    ffi::OsString,
    path::Path,
    process::Stdio,
    sync::LazyLock,
    time::Duration,
};
use tokio::{
    io::AsyncReadExt,
    process::Command,
    sync::mpsc,
    task::JoinHandle,
};

/// Compressor executable name, resolved through `PATH`.
pub const MKSQUASHFS: &str = "mksquashfs";

/// Tag identifying progress messages relayed to an external listener.
pub const PROGRESS_PROTOCOL_TAG: &str = "kodegen-appimage:mksquashfs-progress:1";

const VERSION_TIMEOUT: Duration = Duration::from_secs(3);

static PROGRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\]\s+\d+/\d+\s+(\d+)%").expect("static progress pattern is valid")
});
static VERSION_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"version ([0-9.]+)").expect("static version pattern is valid")
});
static COERCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?").expect("static coerce pattern is valid")
});

/// Progress message for an external listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayMessage {
    /// Always [`PROGRESS_PROTOCOL_TAG`].
    pub tag: &'static str,
    /// Completion percentage, 0 to 100.
    pub percent: u8,
}

impl RelayMessage {
    /// Message for `percent`.
    pub fn new(percent: u8) -> Self {
        Self {
            tag: PROGRESS_PROTOCOL_TAG,
            percent,
        }
    }
}

/// Flags enabled from a minimum `mksquashfs` version on.
struct GatedFlags {
    min: (u64, u64),
    flags: &'static [&'static str],
    /// Left out when `SOURCE_DATE_EPOCH` already pins timestamps.
    yields_to_epoch: bool,
}

const GATED_FLAGS: &[GatedFlags] = &[
    GatedFlags {
        min: (1, 2),
        flags: &["-noappend"],
        yields_to_epoch: false,
    },
    GatedFlags {
        min: (2, 0),
        flags: &["-all-root"],
        yields_to_epoch: false,
    },
    GatedFlags {
        min: (4, 4),
        flags: &["-all-time", "0", "-mkfs-time", "0"],
        yields_to_epoch: true,
    },
];

/// Tuning applied with `xz`, matching `appimagetool`.
const XZ_TUNING: &[&str] = &["-Xdict-size", "100%", "-b", "16384"];

/// Loosely coerce a version string: the first `major[.minor[.patch]]` found,
/// missing parts are zero.
pub fn coerce_version(text: &str) -> Option<Version> {
    let caps = COERCE.captures(text)?;
    let part = |i: usize| -> Option<u64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    Some(Version::new(part(1)?, part(2)?, part(3)?))
}

/// Parse `mksquashfs -version` output.
pub fn parse_version_output(output: &str) -> Result<Version> {
    let first = output
        .lines()
        .next()
        .ok_or_else(|| Error::CompressorSpawn("empty '-version' output".into()))?;
    let number = VERSION_NUMBER
        .captures(first)
        .and_then(|c| c.get(1))
        .ok_or_else(|| Error::CompressorSpawn(format!("no version number in '{first}'")))?;
    coerce_version(number.as_str()).ok_or_else(|| {
        Error::CompressorSpawn(format!("cannot coerce '{}' to a version", number.as_str()))
    })
}

/// Query the installed `mksquashfs` for its version.
pub async fn detect_version(env: &Environment) -> Result<Version> {
    let mut cmd = Command::new(MKSQUASHFS);
    cmd.arg("-version")
        .env_clear()
        .stdin(Stdio::null())
        .kill_on_drop(true);
    if let Some(path) = &env.path {
        cmd.env("PATH", path);
    }

    let output = tokio::time::timeout(VERSION_TIMEOUT, cmd.output())
        .await
        .map_err(|_| Error::CompressorSpawn("'-version' query timed out".into()))?
        .map_err(|e| Error::CompressorSpawn(e.to_string()))?;

    let version = parse_version_output(&String::from_utf8_lossy(&output.stdout))?;
    log::debug!("Detected mksquashfs {}", version);
    Ok(version)
}

/// Flags supported by `version`, in table order.
pub fn version_flags(version: &Version, source_date_epoch: bool) -> Vec<&'static str> {
    GATED_FLAGS
        .iter()
        .filter(|g| (version.major, version.minor) >= g.min)
        .filter(|g| !(g.yields_to_epoch && source_date_epoch))
        .flat_map(|g| g.flags.iter().copied())
        .collect()
}

/// Full argument list: source, destination, gated flags, then compressor.
pub fn build_args(
    source: &Path,
    dest: &Path,
    version: &Version,
    compressor: Option<Compressor>,
    source_date_epoch: bool,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![source.into(), dest.into()];
    args.extend(version_flags(version, source_date_epoch).into_iter().map(OsString::from));
    if let Some(compressor) = compressor {
        args.push("-comp".into());
        args.push(compressor.as_str().into());
        if compressor == Compressor::Xz {
            args.extend(XZ_TUNING.iter().map(OsString::from));
        }
    }
    args
}

/// Percentage reported on one progress line, if any.
pub fn parse_progress(line: &str) -> Option<u8> {
    let caps = PROGRESS.captures(line)?;
    let value: u32 = caps.get(1)?.as_str().parse().ok()?;
    u8::try_from(value.min(100)).ok()
}

/// Suppresses repeated and regressing percentages.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    last: u8,
}

impl ProgressTracker {
    /// Feed one line; returns the percentage to emit, if it advanced.
    pub fn observe(&mut self, line: &str) -> Option<u8> {
        let percent = parse_progress(line)?;
        if percent > self.last {
            self.last = percent;
            Some(percent)
        } else {
            None
        }
    }
}

/// Events produced by a running compressor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressorEvent {
    /// Completion percentage advanced.
    Progress(u8),
    /// The process exited.
    Close {
        /// Exit code, if it exited normally.
        code: Option<i32>,
        /// Terminating signal, if killed.
        signal: Option<i32>,
        /// Collected standard error, if any.
        stderr: Option<String>,
    },
    /// Waiting on the process failed.
    Error(String),
}

/// Handle on a running `mksquashfs`.
///
/// Dropping the handle kills the process.
#[derive(Debug)]
pub struct CompressorJob {
    events: mpsc::Receiver<CompressorEvent>,
    driver: JoinHandle<()>,
}

impl Drop for CompressorJob {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

/// Splits a byte stream on `\r` and `\n`; the progress bar redraws with `\r`.
#[derive(Debug, Default)]
struct SegmentBuffer {
    pending: String,
}

impl SegmentBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.push_str(&String::from_utf8_lossy(chunk));
        let mut segments = Vec::new();
        while let Some(pos) = self.pending.find(['\r', '\n']) {
            let rest = self.pending.split_off(pos + 1);
            let mut segment = std::mem::replace(&mut self.pending, rest);
            segment.pop();
            if !segment.is_empty() {
                segments.push(segment);
            }
        }
        segments
    }

    fn finish(self) -> Option<String> {
        (!self.pending.is_empty()).then_some(self.pending)
    }
}

/// Spawn `mksquashfs` with `args` and a minimal environment.
pub fn spawn(args: Vec<OsString>, env: &Environment) -> Result<CompressorJob> {
    let mut cmd = Command::new(MKSQUASHFS);
    cmd.args(&args)
        .env_clear()
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(path) = &env.path {
        cmd.env("PATH", path);
    }
    if let Some(epoch) = &env.source_date_epoch {
        cmd.env("SOURCE_DATE_EPOCH", epoch);
    }

    log::debug!("Running {} {:?}", MKSQUASHFS, args);
    let mut child = cmd
        .spawn()
        .map_err(|e| Error::CompressorSpawn(e.to_string()))?;

    let stdout = child.stdout.take();
    let stderr_handle = child.stderr.take().map(|mut stderr| {
        tokio::spawn(async move {
            let mut collected = String::new();
            let mut buf = Vec::new();
            if stderr.read_to_end(&mut buf).await.is_ok() {
                collected = String::from_utf8_lossy(&buf).into_owned();
            }
            collected
        })
    });

    let (tx, events) = mpsc::channel(64);
    let driver = tokio::spawn(async move {
        let mut tracker = ProgressTracker::default();
        if let Some(mut stdout) = stdout {
            let mut segments = SegmentBuffer::default();
            let mut buf = [0u8; 4096];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        for segment in segments.push(&buf[..n]) {
                            if let Some(percent) = tracker.observe(&segment) {
                                let _ = tx.send(CompressorEvent::Progress(percent)).await;
                            }
                        }
                    }
                }
            }
            if let Some(percent) = segments.finish().and_then(|s| tracker.observe(&s)) {
                let _ = tx.send(CompressorEvent::Progress(percent)).await;
            }
        }

        let event = match child.wait().await {
            Ok(status) => {
                let stderr = match stderr_handle {
                    Some(handle) => handle.await.unwrap_or_default(),
                    None => String::new(),
                };
                CompressorEvent::Close {
                    code: status.code(),
                    signal: exit_signal(&status),
                    stderr: (!stderr.trim().is_empty()).then_some(stderr),
                }
            }
            Err(e) => CompressorEvent::Error(e.to_string()),
        };
        let _ = tx.send(event).await;
    });

    Ok(CompressorJob { events, driver })
}

impl CompressorJob {
    /// Next event; `None` once the stream is exhausted.
    pub async fn next_event(&mut self) -> Option<CompressorEvent> {
        self.events.recv().await
    }

    /// Drive the job to completion, calling `on_progress` for every advance.
    ///
    /// Exit code zero resolves; anything else fails with
    /// [`Error::CompressorError`].
    pub async fn wait<F: FnMut(u8)>(mut self, mut on_progress: F) -> Result<()> {
        while let Some(event) = self.next_event().await {
            match event {
                CompressorEvent::Progress(percent) => on_progress(percent),
                CompressorEvent::Close {
                    code: Some(0), ..
                } => return Ok(()),
                CompressorEvent::Close {
                    code,
                    signal,
                    stderr,
                } => {
                    return Err(Error::CompressorError {
                        code,
                        signal,
                        stderr,
                    });
                }
                CompressorEvent::Error(message) => return Err(Error::CompressorSpawn(message)),
            }
        }
        Err(Error::CompressorSpawn(
            "mksquashfs event stream ended without an exit status".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_output() {
        let out = "mksquashfs version 4.5.1 (2022/03/17)\ncopyright (C) 2022 Phillip Lougher\n";
        assert_eq!(parse_version_output(out).unwrap(), Version::new(4, 5, 1));
        assert_eq!(
            parse_version_output("mksquashfs version 4.4-git (2019/08/29)").unwrap(),
            Version::new(4, 4, 0)
        );
        assert!(parse_version_output("").is_err());
        assert!(parse_version_output("squashfs-tools\n").is_err());
    }

    #[test]
    fn test_version_gated_flags() {
        assert!(version_flags(&Version::new(1, 1, 0), false).is_empty());
        assert_eq!(version_flags(&Version::new(1, 2, 0), false), ["-noappend"]);
        assert_eq!(
            version_flags(&Version::new(4, 3, 0), false),
            ["-noappend", "-all-root"]
        );
        assert_eq!(
            version_flags(&Version::new(4, 6, 1), false),
            ["-noappend", "-all-root", "-all-time", "0", "-mkfs-time", "0"]
        );
        assert_eq!(
            version_flags(&Version::new(4, 6, 1), true),
            ["-noappend", "-all-root"]
        );
    }

    #[test]
    fn test_build_args_with_xz() {
        let args = build_args(
            Path::new("/stage"),
            Path::new("/out/image.squashfs"),
            &Version::new(4, 5, 0),
            Some(Compressor::Xz),
            true,
        );
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            [
                "/stage",
                "/out/image.squashfs",
                "-noappend",
                "-all-root",
                "-comp",
                "xz",
                "-Xdict-size",
                "100%",
                "-b",
                "16384"
            ]
        );
    }

    #[test]
    fn test_progress_dedup_and_clamp() {
        let mut tracker = ProgressTracker::default();
        assert_eq!(tracker.observe("[====|     ] 10/40  25%"), Some(25));
        assert_eq!(tracker.observe("[====|     ] 10/40  25%"), None);
        assert_eq!(tracker.observe("Parallel mksquashfs: Using 8 processors"), None);
        assert_eq!(tracker.observe("[=====/    ] 20/40  50%"), Some(50));
        assert_eq!(tracker.observe("[==|       ] 5/40  12%"), None);
        assert_eq!(tracker.observe("[==========] 40/40 250%"), Some(100));

        // The done counter is padded to the width of the total.
        assert_eq!(parse_progress("[=|          ]   12/5678   0%"), Some(0));
        let mut tracker = ProgressTracker::default();
        assert_eq!(tracker.observe("[=|          ]   12/5678   0%"), None);
        assert_eq!(tracker.observe("[==|         ]  512/5678   9%"), Some(9));
        assert_eq!(tracker.observe("[=====|      ] 2048/5678  36%"), Some(36));
    }

    #[test]
    fn test_segment_buffer_splits_carriage_returns() {
        let mut buf = SegmentBuffer::default();
        assert_eq!(buf.push(b"[=] 1/4  25%\r[=="), ["[=] 1/4  25%"]);
        assert_eq!(buf.push(b"] 2/4  50%\n"), ["[==] 2/4  50%"]);
        assert!(buf.push(b"tail").is_empty());
        assert_eq!(buf.finish().as_deref(), Some("tail"));
    }

    #[test]
    fn test_relay_message_tag() {
        let msg = RelayMessage::new(42);
        assert_eq!(msg.tag, PROGRESS_PROTOCOL_TAG);
        assert_eq!(msg.percent, 42);
    }
}
