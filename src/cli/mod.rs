//! Command line interface for kodegen_bundler_appimage.
//!
//! Gathers the metadata a packaging host would supply, runs the AppImage
//! maker once and reports the artifact path.

mod args;
mod output;

pub use args::Args;
pub use output::OutputManager;

use crate::bundler::{self, AppImageOptions, Arch, MakerAppImage, MakerMeta, PackageManifest};
use crate::error::{CliError, Result};
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute(&args, &OutputManager::new(false)).await
}

/// Run one build for already-parsed arguments
pub async fn execute(args: &Args, output: &OutputManager) -> Result<i32> {
    args.validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;

    let dir = existing("Application directory", &args.dir)?;
    let package_json = existing("package.json", &args.package_json)?;
    let make_dir = args.make_dir.absolutize()?.into_owned();

    let options = match &args.config {
        Some(path) => AppImageOptions::from_file(&existing("Options file", path)?).await?,
        None => AppImageOptions::default(),
    };
    let package = PackageManifest::from_file(&package_json).await?;

    let target_arch = match &args.arch {
        Some(arch) => arch.trim().to_string(),
        None => Arch::current()
            .map(|arch| arch.host_id().to_string())
            .ok_or_else(|| CliError::InvalidArguments {
                reason: "Could not detect the host architecture; pass --arch".to_string(),
            })?,
    };
    let app_name = args
        .app_name
        .clone()
        .or_else(|| package.product_name.clone())
        .unwrap_or_else(|| package.name.clone());

    let meta = MakerMeta {
        app_name,
        dir,
        make_dir,
        package,
        target_arch,
    };

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let maker = MakerAppImage::new(options).with_progress_relay(tx);

    // Resolve first so configuration errors win over host checks.
    let settings = maker.settings_for(&meta)?;
    if !maker.is_supported_on_current_platform() {
        return Err(CliError::UnsupportedPlatform {
            platform: std::env::consts::OS,
        }
        .into());
    }
    if !maker.external_binaries_exist() {
        return Err(CliError::MissingTool {
            tool: maker.required_external_binaries()[0],
        }
        .into());
    }
    log::debug!("Building {} into {}", settings.product_name(), settings.out_file().display());

    let progress = output.clone();
    let reporter = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if message.tag == bundler::PROGRESS_PROTOCOL_TAG {
                let _ = progress.progress(message.percent);
            }
        }
    });

    let result = maker.make(&meta).await;
    drop(maker);
    let _ = reporter.await;

    for path in result? {
        let _ = output.success(&format!("Created {}", path.display()));
    }
    Ok(0)
}

fn existing(what: &'static str, path: &Path) -> Result<PathBuf> {
    let path = path.absolutize()?.into_owned();
    if !path.exists() {
        return Err(CliError::MissingInput { what, path }.into());
    }
    Ok(path)
}
