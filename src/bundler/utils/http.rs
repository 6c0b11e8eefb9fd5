//! HTTP utilities for downloading the AppImage runtime.
//!
//! Provides plain downloads with status checking, MD5 verification and a
//! small on-disk download cache keyed by URL directory.

use crate::bundler::error::{Error, ErrorExt, Result};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Downloads a file from a URL.
///
/// Returns the body as a byte vector. Non-success statuses fail with
/// [`Error::RuntimeFetchError`]; there is no retry.
pub async fn download(url: &str) -> Result<Vec<u8>> {
    log::info!("Downloading {}", url);

    let response = reqwest::get(url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::RuntimeFetchError {
            url: url.to_string(),
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        });
    }

    let bytes = response.bytes().await?;
    log::debug!("Downloaded {} bytes from {}", bytes.len(), url);
    Ok(bytes.to_vec())
}

/// Hex-encoded MD5 digest.
pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Verifies that data matches the expected MD5 digest.
///
/// Compares case-insensitively. Hashing runs on the blocking pool.
pub async fn verify_md5(data: &[u8], expected: &str, origin: &str) -> Result<()> {
    let data = data.to_vec();
    let expected = expected.trim().to_string();
    let origin = origin.to_string();

    tokio::task::spawn_blocking(move || {
        let actual = md5_hex(&data);
        if actual.eq_ignore_ascii_case(&expected) {
            Ok(())
        } else {
            Err(Error::IntegrityError {
                origin,
                expected,
                actual,
            })
        }
    })
    .await
    .map_err(|e| Error::GenericError(format!("hash verification task failed: {e}")))?
}

/// Download cache rooted in the user cache directory.
///
/// Files are stored as `<root>/<sha256 of URL directory>/<file name>`, so all
/// assets of one release share a directory.
#[derive(Debug, Clone)]
pub struct DownloadCache {
    root: PathBuf,
}

impl DownloadCache {
    /// Cache rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache directory name for a URL: SHA-256 of the URL without query,
    /// fragment and last path segment.
    pub fn directory_key(url: &str) -> Result<String> {
        let mut parsed = url::Url::parse(url)?;
        parsed.set_query(None);
        parsed.set_fragment(None);
        let dir = match parsed.path().rsplit_once('/') {
            Some((dir, _)) if !dir.is_empty() => dir.to_string(),
            _ => "/".to_string(),
        };
        parsed.set_path(&dir);
        Ok(hex::encode(Sha256::digest(parsed.as_str().as_bytes())))
    }

    /// Location of `file_name` downloaded from `url`.
    pub fn path_for(&self, url: &str, file_name: &str) -> Result<PathBuf> {
        Ok(self.root.join(Self::directory_key(url)?).join(file_name))
    }

    /// Cached bytes, if present.
    pub async fn get(&self, url: &str, file_name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(url, file_name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                log::debug!("Using cached {}", path.display());
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).fs_context("reading cached download", &path),
        }
    }

    /// Store bytes, replacing any previous entry. Returns the cache path.
    pub async fn put(&self, url: &str, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(url, file_name)?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .fs_context("creating cache directory", dir)?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .fs_context("writing cached download", &path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_hex() {
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[tokio::test]
    async fn test_verify_md5() {
        verify_md5(b"", "D41D8CD98F00B204E9800998ECF8427E", "mem").await.unwrap();
        let err = verify_md5(b"x", "d41d8cd98f00b204e9800998ecf8427e", "mem")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IntegrityError { .. }));
    }

    #[test]
    fn test_directory_key_ignores_file_and_query() {
        let a = DownloadCache::directory_key(
            "https://github.com/AppImage/AppImageKit/releases/download/13/runtime-x86_64",
        )
        .unwrap();
        let b = DownloadCache::directory_key(
            "https://github.com/AppImage/AppImageKit/releases/download/13/AppRun-x86_64?x=1#f",
        )
        .unwrap();
        let c = DownloadCache::directory_key(
            "https://github.com/AppImage/AppImageKit/releases/download/12/runtime-x86_64",
        )
        .unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_cache_round_trip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cache = DownloadCache::new(tmp.path());
        let url = "https://example.com/r/13/runtime-x86_64";
        assert_eq!(cache.get(url, "runtime-x86_64").await.unwrap(), None);
        let path = cache.put(url, "runtime-x86_64", b"\x7fELF").await.unwrap();
        assert!(path.starts_with(tmp.path()));
        assert_eq!(
            cache.get(url, "runtime-x86_64").await.unwrap().as_deref(),
            Some(&b"\x7fELF"[..])
        );
    }
}
