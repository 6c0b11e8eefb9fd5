//! Configuration structures for AppImage bundling.
//!
//! Three inputs feed a build:
//!
//! - [`MakerMeta`]: what the host hands over (application directory, output
//!   base directory, package manifest, target architecture)
//! - [`AppImageOptions`]: the user's optional configuration bag
//! - [`Environment`]: a snapshot of the process environment
//!
//! [`Settings::resolve`] combines them once, up front, into every effective
//! value the pipeline needs. Nothing downstream re-reads options or the
//! environment.

use crate::bundler::error::{Context, Error, ErrorExt, Result};
use serde::{
    Deserialize, Deserializer,
    de::{self, MapAccess, Visitor},
};
use std::{
    fmt,
    marker::PhantomData,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Default host serving AppImage runtimes.
pub const DEFAULT_RUNTIME_MIRROR: &str = "https://github.com";

/// Subdirectory of the user cache directory holding downloaded runtimes.
pub const CACHE_DIR_NAME: &str = "kodegen-appimage";

/// AppImageKit release whose runtime digests are known.
pub const SUPPORTED_APPIMAGEKIT_RELEASE: u32 = 13;

/// MD5 of each `runtime-<arch>` of [`SUPPORTED_APPIMAGEKIT_RELEASE`].
// TODO: record the release-13 digests for x86_64, i686, aarch64 and armhf.
const PINNED_RUNTIME_MD5: &[(&str, &str)] = &[];

/// CPU architecture identifiers accepted from the host.
///
/// These follow the host framework's naming (`x64`, `ia32`, `arm64`, ...),
/// which is also used in output paths. Only some of them have an AppImage
/// runtime; see [`Arch::appimage_id`].
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_appimage::bundler::Arch;
///
/// let arch: Arch = "arm64".parse()?;
/// assert_eq!(arch.appimage_id(), Some("aarch64"));
/// # Ok::<(), kodegen_bundler_appimage::bundler::Error>(())
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Arch {
    /// x86_64 / AMD64 (64-bit)
    X86_64,
    /// x86 / i686 (32-bit)
    X86,
    /// AArch64 / ARM64 (64-bit)
    AArch64,
    /// ARMv7 with hard-float (32-bit)
    Armhf,
    /// MIPS64 little-endian; no AppImage runtime exists
    Mips64el,
    /// macOS universal binary; meaningless on Linux
    Universal,
}

impl Arch {
    /// Host identifier, as used in output paths.
    pub fn host_id(&self) -> &'static str {
        match self {
            Arch::X86_64 => "x64",
            Arch::X86 => "ia32",
            Arch::AArch64 => "arm64",
            Arch::Armhf => "armv7l",
            Arch::Mips64el => "mips64el",
            Arch::Universal => "universal",
        }
    }

    /// AppImage identifier used in runtime file names, when one exists.
    pub fn appimage_id(&self) -> Option<&'static str> {
        match self {
            Arch::X86_64 => Some("x86_64"),
            Arch::X86 => Some("i686"),
            Arch::AArch64 => Some("aarch64"),
            Arch::Armhf => Some("armhf"),
            Arch::Mips64el | Arch::Universal => None,
        }
    }

    /// Architecture of the running process.
    pub fn current() -> Option<Arch> {
        match std::env::consts::ARCH {
            "x86_64" => Some(Arch::X86_64),
            "x86" => Some(Arch::X86),
            "aarch64" => Some(Arch::AArch64),
            "arm" => Some(Arch::Armhf),
            "mips64" => Some(Arch::Mips64el),
            _ => None,
        }
    }
}

impl FromStr for Arch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "x64" => Ok(Arch::X86_64),
            "ia32" => Ok(Arch::X86),
            "arm64" => Ok(Arch::AArch64),
            "armv7l" => Ok(Arch::Armhf),
            "mips64el" => Ok(Arch::Mips64el),
            "universal" => Ok(Arch::Universal),
            other => Err(Error::UnsupportedArchitecture(other.to_string())),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.host_id())
    }
}

/// Map a host architecture identifier to the AppImage one.
///
/// Fails with [`Error::UnsupportedArchitecture`] for unknown identifiers and
/// for known ones without an AppImage runtime.
pub fn map_arch(target: &str) -> Result<&'static str> {
    target
        .parse::<Arch>()?
        .appimage_id()
        .ok_or_else(|| Error::UnsupportedArchitecture(target.to_string()))
}

/// Normalize a free-form package name into a FreeDesktop-friendly identifier.
///
/// Lower-cases the input, drops everything before the first ASCII letter or
/// digit, then replaces every character outside `[a-z0-9-]` with `-`.
///
/// ```
/// use kodegen_bundler_appimage::bundler::sanitize_name;
///
/// assert_eq!(sanitize_name("My App!").unwrap(), "my-app-");
/// assert!(sanitize_name("!!!").is_err());
/// ```
pub fn sanitize_name(name: &str) -> Result<String> {
    let lower = name.to_lowercase();
    let start = lower
        .find(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit())
        .ok_or_else(|| Error::UnsanitizableName(name.to_string()))?;
    Ok(lower[start..]
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect())
}

/// Insertion-ordered string-keyed map.
///
/// Icon set resolution ties and desktop action order both depend on the order
/// keys appear in the configuration file, which `HashMap` would lose.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrderedMap<V>(pub Vec<(String, V)>);

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> OrderedMap<V> {
    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V> FromIterator<(String, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OrderedVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, V>()? {
                    entries.push((key, value));
                }
                Ok(OrderedMap(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }
}

/// Multi-resolution icon configuration as written by the user.
///
/// Keys are `"{width}x{height}"` or `"scalable"`, mapped to file paths. The
/// reserved keys `default` (naming the canonical entry) and `strict`
/// (request dimension cross-checking) are pulled out into fields.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IconSetConfig {
    /// Resolution key to file path, in configuration order.
    pub entries: OrderedMap<PathBuf>,
    /// Explicit default resolution key.
    pub default: Option<String>,
    /// Re-sniff every fixed-resolution entry and reject mismatches.
    pub strict: bool,
}

impl<'de> Deserialize<'de> for IconSetConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct IconSetVisitor;

        impl<'de> Visitor<'de> for IconSetVisitor {
            type Value = IconSetConfig;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an icon set table of resolution keys to paths")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
                let mut set = IconSetConfig::default();
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "strict" => set.strict = map.next_value()?,
                        "default" => set.default = Some(map.next_value()?),
                        _ => {
                            let path: PathBuf = map.next_value()?;
                            if set.entries.get(&key).is_some() {
                                return Err(de::Error::custom(format!("duplicate icon key '{key}'")));
                            }
                            set.entries.0.push((key, path));
                        }
                    }
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(IconSetVisitor)
    }
}

/// Icon option: a single file or a multi-resolution set.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
pub enum IconSpec {
    /// Single icon file; its resolution is sniffed.
    Path(PathBuf),
    /// Explicit resolution table.
    Set(IconSetConfig),
}

/// A `[Desktop Action <id>]` stanza.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct DesktopAction {
    /// User-facing action name.
    pub name: String,
    /// Action icon.
    #[serde(default)]
    pub icon: Option<String>,
    /// Command to run.
    #[serde(default)]
    pub exec: Option<String>,
}

/// SquashFS compression algorithm passed to `mksquashfs -comp`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Compressor {
    /// xz (tuned like `appimagetool`)
    Xz,
    /// gzip
    Gzip,
    /// lz4
    Lz4,
    /// lzo
    Lzo,
    /// zstd
    Zstd,
    /// legacy lzma
    Lzma,
}

impl Compressor {
    /// Name understood by `mksquashfs -comp`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Compressor::Xz => "xz",
            Compressor::Gzip => "gzip",
            Compressor::Lz4 => "lz4",
            Compressor::Lzo => "lzo",
            Compressor::Zstd => "zstd",
            Compressor::Lzma => "lzma",
        }
    }
}

/// Which upstream runtime release to download.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ReleaseTag {
    /// Rolling static type-2 runtime. Never checksummed or cached.
    #[default]
    Continuous,
    /// Numbered AppImageKit release.
    Pinned(u32),
}

impl fmt::Display for ReleaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseTag::Continuous => f.write_str("continuous"),
            ReleaseTag::Pinned(n) => write!(f, "{n}"),
        }
    }
}

impl<'de> Deserialize<'de> for ReleaseTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(ReleaseTag::Pinned(n)),
            Raw::Text(s) if s == "continuous" => Ok(ReleaseTag::Continuous),
            Raw::Text(s) => s
                .parse::<u32>()
                .map(ReleaseTag::Pinned)
                .map_err(|_| de::Error::custom(format!("invalid AppImageKit release '{s}'"))),
        }
    }
}

/// User configuration for the AppImage maker.
///
/// Every field is optional. Keys are camelCase in JSON and TOML files.
///
/// # Example
///
/// ```toml
/// name = "my-app"
/// productName = "My App"
/// categories = ["Utility"]
/// compressor = "xz"
///
/// [icon]
/// scalable = "assets/icon.svg"
/// "256x256" = "assets/icon-256.png"
///
/// [actions.new-window]
/// Name = "New Window"
/// Exec = "my-app --new-window"
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppImageOptions {
    /// Package name; sanitized. Defaults to the manifest name.
    pub name: Option<String>,
    /// Executable file name inside the application directory.
    pub bin: Option<String>,
    /// Human-friendly name. Defaults to the host's application name.
    pub product_name: Option<String>,
    /// FreeDesktop `GenericName`.
    pub generic_name: Option<String>,
    /// Icon file or icon set.
    pub icon: Option<IconSpec>,
    /// FreeDesktop categories.
    pub categories: Option<Vec<String>>,
    /// Desktop actions, keyed by action id.
    pub actions: Option<OrderedMap<DesktopAction>>,
    /// Use this `.desktop` file verbatim instead of generating one.
    pub desktop_file: Option<PathBuf>,
    /// SquashFS compressor. Defaults to `mksquashfs`'s own default.
    pub compressor: Option<Compressor>,
    /// Runtime stub path or URL, bypassing release selection.
    pub runtime: Option<String>,
    /// Runtime release. Defaults to continuous.
    #[serde(rename = "AppImageKitRelease", alias = "appImageKitRelease")]
    pub app_image_kit_release: Option<ReleaseTag>,
    /// Forces the static type-2 (continuous) runtime.
    #[serde(rename = "type2runtime", alias = "type2Runtime")]
    pub type2_runtime: Option<bool>,
    /// Expected MD5 digest of a pinned runtime.
    pub runtime_md5: Option<String>,
    /// Launch through a script honouring `<bin>-flags.conf`.
    pub flags_file: Option<bool>,
    /// Cache pinned and explicit-URL runtime downloads. Defaults to true.
    pub cache_downloads: Option<bool>,
}

impl AppImageOptions {
    /// Load options from a `.json` or `.toml` file.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .fs_context("reading maker options", path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(toml::from_str(&text)?),
            Some("json") => Ok(serde_json::from_str(&text)?),
            _ => Err(Error::GenericError(format!(
                "unsupported options file '{}': expected .json or .toml",
                path.display()
            ))),
        }
    }
}

/// Subset of `package.json` the maker reads.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    /// Package name.
    pub name: String,
    /// Human-friendly name, if declared.
    #[serde(default)]
    pub product_name: Option<String>,
    /// Package version.
    pub version: String,
}

impl PackageManifest {
    /// Read a `package.json`.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .fs_context("reading package manifest", path)?;
        serde_json::from_str(&text)
            .map_err(Error::from)
            .with_context(|| format!("parsing {}", path.display()))
    }
}

/// Everything the host provides for one `make` call.
#[derive(Clone, Debug)]
pub struct MakerMeta {
    /// Display name of the application.
    pub app_name: String,
    /// Prepared application directory.
    pub dir: PathBuf,
    /// Output base directory.
    pub make_dir: PathBuf,
    /// Parsed package manifest.
    pub package: PackageManifest,
    /// Target architecture identifier (`x64`, `arm64`, ...).
    pub target_arch: String,
}

/// Process environment values the maker consults, read once.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    /// Executable search path forwarded to `mksquashfs`.
    pub path: Option<String>,
    /// Reproducible-build timestamp override.
    pub source_date_epoch: Option<String>,
    /// Runtime mirror host.
    pub runtime_mirror: Option<String>,
    /// Runtime mirror path template with `{tag}` and `{arch}` placeholders.
    pub runtime_mirror_path: Option<String>,
    /// User cache directory.
    pub cache_dir: Option<PathBuf>,
}

impl Environment {
    /// Snapshot the current process environment.
    pub fn from_process() -> Self {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        Self {
            path: var("PATH"),
            source_date_epoch: var("SOURCE_DATE_EPOCH"),
            runtime_mirror: var("APPIMAGE_RUNTIME_MIRROR"),
            runtime_mirror_path: var("APPIMAGE_RUNTIME_MIRROR_PATH"),
            cache_dir: dirs::cache_dir(),
        }
    }
}

/// Where the runtime stub comes from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RuntimeSource {
    /// Local file; read directly.
    Local(PathBuf),
    /// Remote URL.
    Remote {
        /// Download URL.
        url: String,
        /// Expected MD5 digest; `Some` only for verified downloads.
        md5: Option<String>,
        /// Whether the download may be served from or stored in the cache.
        cacheable: bool,
        /// Release the URL was derived from, if any.
        release: Option<ReleaseTag>,
    },
}

/// Effective build configuration, resolved once per build.
///
/// # Defaults
///
/// | Value | Rule |
/// |-------|------|
/// | `name` | `sanitize(options.name ?? manifest.name)` |
/// | `bin` | `options.bin ?? options.name ?? manifest.name` |
/// | `product_name` | `options.productName ?? meta.app_name` |
/// | `out_file` | `<makeDir>/AppImage/<arch>/<product>-<version>-<arch>.AppImage` |
#[derive(Clone, Debug)]
pub struct Settings {
    name: String,
    bin: String,
    product_name: String,
    version: String,
    arch: Arch,
    appimage_arch: &'static str,
    app_dir: PathBuf,
    out_file: PathBuf,
    options: AppImageOptions,
    runtime: RuntimeSource,
    env: Environment,
}

impl Settings {
    /// Resolve every effective value from host metadata, options and environment.
    ///
    /// Performs no filesystem I/O; [`Error::UnsupportedArchitecture`] and
    /// [`Error::UnsanitizableName`] are raised here.
    pub fn resolve(meta: &MakerMeta, options: AppImageOptions, env: Environment) -> Result<Self> {
        let arch: Arch = meta.target_arch.parse()?;
        let appimage_arch = map_arch(&meta.target_arch)?;

        let raw_name = options.name.as_deref().unwrap_or(&meta.package.name);
        let name = sanitize_name(raw_name)?;
        let bin = options
            .bin
            .clone()
            .or_else(|| options.name.clone())
            .unwrap_or_else(|| meta.package.name.clone());
        if bin.is_empty() || bin.contains('/') {
            return Err(Error::ExecutableNotFound {
                bin,
                dir: meta.dir.clone(),
            });
        }
        let product_name = options
            .product_name
            .clone()
            .unwrap_or_else(|| meta.app_name.clone());
        let version = meta.package.version.clone();

        let out_file = meta
            .make_dir
            .join("AppImage")
            .join(arch.host_id())
            .join(format!("{product_name}-{version}-{}.AppImage", arch.host_id()));

        let runtime = runtime_source(&options, &env, appimage_arch)?;

        Ok(Self {
            name,
            bin,
            product_name,
            version,
            arch,
            appimage_arch,
            app_dir: meta.dir.clone(),
            out_file,
            options,
            runtime,
            env,
        })
    }

    /// Sanitized package name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Executable file name.
    pub fn bin(&self) -> &str {
        &self.bin
    }

    /// Human-friendly product name.
    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    /// Package version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Host architecture.
    pub fn arch(&self) -> Arch {
        self.arch
    }

    /// AppImage architecture identifier.
    pub fn appimage_arch(&self) -> &'static str {
        self.appimage_arch
    }

    /// Source application directory.
    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }

    /// Final artifact path.
    pub fn out_file(&self) -> &Path {
        &self.out_file
    }

    /// Prefix for the staging directory name.
    pub fn staging_prefix(&self) -> String {
        format!(".{}-{}-{}-", self.product_name, self.version, self.arch.host_id())
    }

    /// User options.
    pub fn options(&self) -> &AppImageOptions {
        &self.options
    }

    /// Runtime stub source.
    pub fn runtime(&self) -> &RuntimeSource {
        &self.runtime
    }

    /// Environment snapshot.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Configured compressor.
    pub fn compressor(&self) -> Option<Compressor> {
        self.options.compressor
    }

    /// Whether the launcher is a flags-file script instead of a symlink.
    pub fn flags_file(&self) -> bool {
        self.options.flags_file.unwrap_or(false)
    }

    /// Download cache directory, when caching is enabled and a cache root exists.
    pub fn cache_root(&self) -> Option<PathBuf> {
        if !self.options.cache_downloads.unwrap_or(true) {
            return None;
        }
        self.env.cache_dir.as_ref().map(|dir| dir.join(CACHE_DIR_NAME))
    }
}

fn runtime_source(
    options: &AppImageOptions,
    env: &Environment,
    appimage_arch: &str,
) -> Result<RuntimeSource> {
    if let Some(runtime) = &options.runtime {
        if runtime.starts_with("http://") || runtime.starts_with("https://") {
            url::Url::parse(runtime)?;
            return Ok(RuntimeSource::Remote {
                url: runtime.clone(),
                md5: options.runtime_md5.clone(),
                cacheable: true,
                release: None,
            });
        }
        return Ok(RuntimeSource::Local(PathBuf::from(runtime)));
    }

    let release = if options.type2_runtime.unwrap_or(false) {
        ReleaseTag::Continuous
    } else {
        options.app_image_kit_release.unwrap_or_default()
    };
    let mirror = env
        .runtime_mirror
        .as_deref()
        .unwrap_or(DEFAULT_RUNTIME_MIRROR)
        .trim_end_matches('/');
    let path = match (&env.runtime_mirror_path, release) {
        (Some(template), _) => template
            .replace("{tag}", &release.to_string())
            .replace("{arch}", appimage_arch),
        (None, ReleaseTag::Continuous) => {
            format!("/AppImage/type2-runtime/releases/download/continuous/runtime-{appimage_arch}")
        }
        (None, ReleaseTag::Pinned(tag)) => {
            format!("/AppImage/AppImageKit/releases/download/{tag}/runtime-{appimage_arch}")
        }
    };
    let path = if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    };
    let url = format!("{mirror}{path}");
    url::Url::parse(&url)
        .map_err(Error::from)
        .with_context(|| format!("invalid runtime mirror URL '{url}'"))?;

    Ok(match release {
        ReleaseTag::Continuous => RuntimeSource::Remote {
            url,
            md5: None,
            cacheable: false,
            release: Some(release),
        },
        ReleaseTag::Pinned(tag) => RuntimeSource::Remote {
            url,
            md5: options.runtime_md5.clone().or_else(|| {
                pinned_runtime_md5(PINNED_RUNTIME_MD5, tag, appimage_arch).map(str::to_string)
            }),
            cacheable: true,
            release: Some(release),
        },
    })
}

/// Built-in digest for `runtime-<appimage_arch>` of release `tag`.
///
/// Only [`SUPPORTED_APPIMAGEKIT_RELEASE`] has entries; other releases are
/// verified only against a configured `runtimeMd5`.
fn pinned_runtime_md5(
    table: &'static [(&'static str, &'static str)],
    tag: u32,
    appimage_arch: &str,
) -> Option<&'static str> {
    if tag != SUPPORTED_APPIMAGEKIT_RELEASE {
        return None;
    }
    table
        .iter()
        .find(|(arch, _)| *arch == appimage_arch)
        .map(|(_, md5)| *md5)
}
