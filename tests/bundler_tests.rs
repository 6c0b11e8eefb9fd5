//! Maker-level tests. The full build runs only when `mksquashfs` is on PATH
//! and `APPIMAGE_TEST_RUNTIME` names a local AppImage runtime file.

use kodegen_bundler_appimage::bundler::{
    AppImageOptions, Error, IconSpec, MakerAppImage, MakerMeta, PackageManifest,
};
use std::path::{Path, PathBuf};

fn mock_app(root: &Path) -> PathBuf {
    let dir = root.join("mock-app-linux-x64");
    std::fs::create_dir_all(dir.join("resources")).unwrap();
    let bin = dir.join("mock-app");
    std::fs::write(&bin, "#!/bin/sh\necho 'Hello world!'\n").unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
    std::fs::write(dir.join("resources/app.asar"), b"asar").unwrap();
    dir
}

fn meta(root: &Path, product: &str, arch: &str) -> MakerMeta {
    MakerMeta {
        app_name: product.to_string(),
        dir: mock_app(root),
        make_dir: root.join("make"),
        package: PackageManifest {
            name: "mock-app".into(),
            product_name: Some(product.to_string()),
            version: "0.0.0-mock".into(),
        },
        target_arch: arch.to_string(),
    }
}

fn host_arch() -> Option<&'static str> {
    kodegen_bundler_appimage::bundler::Arch::current().map(|a| a.host_id())
}

/// Staging directories left in the temp dir for `product`.
fn leftover_staging(product: &str) -> Vec<PathBuf> {
    let prefix = format!(".{product}-");
    std::fs::read_dir(std::env::temp_dir())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(&prefix))
        .map(|e| e.path())
        .collect()
}

#[tokio::test]
async fn test_unsupported_architecture_touches_nothing() {
    let tmp = tempfile::TempDir::new().unwrap();
    let meta = meta(tmp.path(), "Wrong Arch Test", "wrong-arch");

    let err = MakerAppImage::default().make(&meta).await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedArchitecture(ref a) if a == "wrong-arch"));
    assert_eq!(err.to_string(), "Unsupported architecture: 'wrong-arch'.");
    assert!(!meta.make_dir.exists());
}

#[tokio::test]
async fn test_missing_executable_fails_before_staging() {
    let Some(arch) = host_arch() else {
        return;
    };
    let tmp = tempfile::TempDir::new().unwrap();
    let product = format!("Missing Exec Test {}", std::process::id());
    let meta = meta(tmp.path(), &product, arch);
    let maker = MakerAppImage::new(AppImageOptions {
        bin: Some("does-not-exist".into()),
        ..Default::default()
    });

    let err = maker.make(&meta).await.unwrap_err();
    assert!(err.to_string().starts_with("Could not find executable"));
    assert!(err.is_configuration());
    assert!(leftover_staging(&product).is_empty());
    assert!(!meta.make_dir.exists());
}

#[tokio::test]
async fn test_invalid_icon_rejected() {
    let Some(arch) = host_arch() else {
        return;
    };
    let tmp = tempfile::TempDir::new().unwrap();
    let product = format!("Bad Icon Test {}", std::process::id());
    let meta = meta(tmp.path(), &product, arch);
    let icon = tmp.path().join("icon.bmp");
    std::fs::write(&icon, b"BM not a freedesktop image").unwrap();
    let maker = MakerAppImage::new(AppImageOptions {
        icon: Some(IconSpec::Path(icon)),
        runtime: Some(tmp.path().join("no-runtime").display().to_string()),
        ..Default::default()
    });

    assert!(maker.make(&meta).await.is_err());
    assert!(leftover_staging(&product).is_empty());
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_end_to_end_build() {
    let maker_probe = MakerAppImage::default();
    let Ok(runtime) = std::env::var("APPIMAGE_TEST_RUNTIME") else {
        eprintln!("skipping: APPIMAGE_TEST_RUNTIME not set");
        return;
    };
    if !maker_probe.external_binaries_exist() {
        eprintln!("skipping: mksquashfs not found");
        return;
    }
    let Some(arch) = host_arch() else {
        return;
    };

    let tmp = tempfile::TempDir::new().unwrap();
    let product = format!("E2E Test {}", std::process::id());
    let meta = meta(tmp.path(), &product, arch);
    let svg = tmp.path().join("icon.svg");
    std::fs::write(&svg, r#"<svg xmlns="http://www.w3.org/2000/svg" width="48" height="48"/>"#)
        .unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let maker = MakerAppImage::new(AppImageOptions {
        runtime: Some(runtime),
        icon: Some(IconSpec::Path(svg)),
        ..Default::default()
    })
    .with_progress_relay(tx);

    let paths = maker.make(&meta).await.unwrap();
    drop(maker);

    let expected = meta
        .make_dir
        .join("AppImage")
        .join(arch)
        .join(format!("{product}-0.0.0-mock-{arch}.AppImage"));
    assert_eq!(paths, [expected.clone()]);

    let bytes = std::fs::read(&expected).unwrap();
    assert_eq!(&bytes[..8], &[0x7f, 0x45, 0x4c, 0x46, 0x02, 0x01, 0x01, 0x00]);
    assert!(leftover_staging(&product).is_empty());

    let mut last = 0;
    while let Some(message) = rx.recv().await {
        assert!(message.percent > last || last == 0);
        last = message.percent;
    }

    let output = std::process::Command::new(&expected)
        .env("APPIMAGE_EXTRACT_AND_RUN", "1")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "Hello world!\n");
}
