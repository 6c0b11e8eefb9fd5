//! AppImage runtime acquisition.
//!
//! The runtime is the ELF stub placed in front of the SquashFS image. It is
//! read from a local file, served from the download cache, or fetched over
//! HTTP. Downloads are MD5-verified whenever a digest is known, either from
//! `runtimeMd5` or the built-in table for the supported AppImageKit release.
//! The rolling continuous runtime is never verified.

use crate::bundler::{
    error::{Context, ErrorExt, Result},
    settings::{ReleaseTag, RuntimeSource, Settings},
    utils::http::{self, DownloadCache},
};

/// Obtain the runtime bytes for this build.
pub async fn fetch_runtime(settings: &Settings) -> Result<Vec<u8>> {
    let bytes = match settings.runtime() {
        RuntimeSource::Local(path) => {
            log::info!("Using local runtime {}", path.display());
            tokio::fs::read(path).await.fs_context("reading runtime", path)?
        }
        RuntimeSource::Remote {
            url,
            md5,
            cacheable,
            release,
        } => {
            if md5.is_none() {
                if let Some(ReleaseTag::Pinned(tag)) = release {
                    log::warn!("No digest known for AppImageKit release {tag}; runtime will not be verified");
                }
            }
            let cache = cacheable
                .then(|| settings.cache_root())
                .flatten()
                .map(DownloadCache::new);
            fetch_remote(url, md5.as_deref(), cache.as_ref()).await?
        }
    };

    validate_elf(&bytes).with_context(|| "AppImage runtime is not an ELF executable")?;
    Ok(bytes)
}

fn file_name(url: &str) -> Result<String> {
    let parsed = url::Url::parse(url)?;
    parsed
        .path_segments()
        .and_then(|mut s| s.next_back())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .context(format!("runtime URL '{url}' has no file name"))
}

async fn fetch_remote(url: &str, md5: Option<&str>, cache: Option<&DownloadCache>) -> Result<Vec<u8>> {
    let name = file_name(url)?;

    if let Some(cache) = cache {
        if let Some(bytes) = cache.get(url, &name).await? {
            match md5 {
                Some(expected) if http::verify_md5(&bytes, expected, url).await.is_err() => {
                    log::warn!("Cached runtime for {} failed verification; downloading again", url);
                }
                _ => return Ok(bytes),
            }
        }
    }

    let bytes = http::download(url).await?;
    if let Some(expected) = md5 {
        http::verify_md5(&bytes, expected, url).await?;
        log::debug!("Runtime digest verified");
    }

    if let Some(cache) = cache {
        match cache.put(url, &name, &bytes).await {
            Ok(path) => log::debug!("Cached runtime at {}", path.display()),
            Err(e) => log::warn!("Could not cache runtime: {}", e),
        }
    }

    Ok(bytes)
}

/// Check that `bytes` parse as an ELF image.
pub fn validate_elf(bytes: &[u8]) -> Result<()> {
    let elf = goblin::elf::Elf::parse(bytes)?;
    log::debug!(
        "Runtime: {}-bit ELF, machine {}",
        if elf.is_64 { 64 } else { 32 },
        elf.header.e_machine
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::{AppImageOptions, Environment, MakerMeta, PackageManifest};
    use std::path::PathBuf;

    /// Smallest 64-bit little-endian ELF header goblin accepts.
    fn tiny_elf() -> Vec<u8> {
        let mut elf = vec![0u8; 64];
        elf[..8].copy_from_slice(&[0x7f, b'E', b'L', b'F', 2, 1, 1, 0]);
        elf[16] = 2; // ET_EXEC
        elf[18] = 0x3e; // x86-64
        elf[20] = 1; // EV_CURRENT
        elf[52] = 64; // e_ehsize
        elf[54] = 56; // e_phentsize
        elf[58] = 64; // e_shentsize
        elf
    }

    fn settings_with_runtime(runtime: &str) -> Settings {
        let meta = MakerMeta {
            app_name: "Demo".into(),
            dir: PathBuf::from("/src"),
            make_dir: PathBuf::from("/out"),
            package: PackageManifest {
                name: "demo".into(),
                product_name: None,
                version: "1.0.0".into(),
            },
            target_arch: "x64".into(),
        };
        let options = AppImageOptions {
            runtime: Some(runtime.into()),
            ..Default::default()
        };
        Settings::resolve(&meta, options, Environment::default()).unwrap()
    }

    #[test]
    fn test_validate_elf() {
        validate_elf(&tiny_elf()).unwrap();
        assert!(validate_elf(b"#!/bin/sh\necho not elf\n").is_err());
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name("https://github.com/AppImage/type2-runtime/releases/download/continuous/runtime-x86_64")
                .unwrap(),
            "runtime-x86_64"
        );
        assert!(file_name("https://example.com/").is_err());
    }

    #[tokio::test]
    async fn test_local_runtime_is_read_and_checked() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("runtime");
        std::fs::write(&path, tiny_elf()).unwrap();
        let bytes = fetch_runtime(&settings_with_runtime(path.to_str().unwrap()))
            .await
            .unwrap();
        assert_eq!(bytes, tiny_elf());

        let bogus = tmp.path().join("bogus");
        std::fs::write(&bogus, b"not an elf").unwrap();
        assert!(
            fetch_runtime(&settings_with_runtime(bogus.to_str().unwrap()))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_pinned_runtime_without_digest_is_accepted() {
        let tmp = tempfile::TempDir::new().unwrap();
        let meta = MakerMeta {
            app_name: "Demo".into(),
            dir: PathBuf::from("/src"),
            make_dir: PathBuf::from("/out"),
            package: PackageManifest {
                name: "demo".into(),
                product_name: None,
                version: "1.0.0".into(),
            },
            target_arch: "x64".into(),
        };
        let env = Environment {
            runtime_mirror: Some("https://invalid.example".into()),
            cache_dir: Some(tmp.path().to_path_buf()),
            ..Default::default()
        };
        let options = AppImageOptions {
            app_image_kit_release: Some(ReleaseTag::Pinned(12)),
            ..Default::default()
        };
        let settings = Settings::resolve(&meta, options, env).unwrap();
        let RuntimeSource::Remote { url, md5, .. } = settings.runtime() else {
            panic!("pinned release must resolve to a remote runtime");
        };
        assert_eq!(md5, &None);

        let cache = DownloadCache::new(settings.cache_root().unwrap());
        cache.put(url, "runtime-x86_64", &tiny_elf()).await.unwrap();
        assert_eq!(fetch_runtime(&settings).await.unwrap(), tiny_elf());
    }

    #[tokio::test]
    async fn test_cached_runtime_served_without_network() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cache = DownloadCache::new(tmp.path());
        let url = "https://invalid.example/AppImage/AppImageKit/releases/download/13/runtime-x86_64";
        cache.put(url, "runtime-x86_64", &tiny_elf()).await.unwrap();

        let md5 = http::md5_hex(&tiny_elf());
        let bytes = fetch_remote(url, Some(&md5), Some(&cache)).await.unwrap();
        assert_eq!(bytes, tiny_elf());
    }
}
