//! FreeDesktop.org desktop entry and icon theme support.
//!
//! Renders `.desktop` files and installs icons into the `hicolor` theme
//! layout:
//!
//! ```text
//! usr/share/icons/hicolor/
//!   ├── 256x256/apps/{app_name}.png
//!   ├── 1024x1024/apps/{app_name}.png
//!   └── scalable/apps/{app_name}.svg
//! ```

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    resources::icons::IconSet,
    settings::{DesktopAction, OrderedMap, Settings},
};
use std::path::{Path, PathBuf};

/// Icon theme directory relative to the staging root.
pub const HICOLOR_DIR: &str = "usr/share/icons/hicolor";

/// Escape a desktop entry value.
///
/// A backslash is doubled unless it already starts one of the escapes
/// `\"`, `` \` ``, `\t`, `\r` or `\n`. Backticks and the control characters
/// tab, carriage return and line feed are then written as escapes.
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek() {
                Some('"' | '`' | 't' | 'r' | 'n') => out.push('\\'),
                _ => out.push_str("\\\\"),
            },
            '`' => out.push_str("\\`"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

/// Characters that force an `Exec` argument to be quoted.
const EXEC_RESERVED: &[char] = &[
    ' ', '\t', '\n', '"', '\'', '\\', '>', '<', '~', '|', '&', ';', '$', '*', '?', '#', '(', ')', '`',
];

/// Quote one `Exec` argument.
///
/// `%` is doubled so it is not read as a field code. Arguments containing a
/// reserved character are wrapped in double quotes, with `"`, `` ` ``, `$`
/// and `\` backslash-escaped inside. The result is still subject to
/// [`escape_value`].
pub fn quote_exec_arg(arg: &str) -> String {
    let arg = arg.replace('%', "%%");
    if !arg.contains(EXEC_RESERVED) {
        return arg;
    }
    let mut out = String::with_capacity(arg.len() + 2);
    out.push('"');
    for c in arg.chars() {
        if matches!(c, '"' | '`' | '$' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn push_line(out: &mut String, key: &str, value: &str) {
    out.push_str(key);
    out.push('=');
    out.push_str(&escape_value(value));
    out.push('\n');
}

/// Render a desktop entry.
///
/// Fields with a `None` value are omitted; order is preserved. A caller
/// supplied `Actions` field is ignored and rebuilt from `actions`, whose ids
/// must contain at least one ASCII letter to be emitted.
pub fn generate_desktop(
    entry: &[(&str, Option<String>)],
    actions: Option<&OrderedMap<DesktopAction>>,
) -> String {
    let mut out = String::from("[Desktop Entry]\n");
    for (key, value) in entry {
        if *key == "Actions" {
            continue;
        }
        if let Some(value) = value {
            push_line(&mut out, key, value);
        }
    }

    let actions: Vec<(&str, &DesktopAction)> = actions
        .map(|a| {
            a.iter()
                .filter(|(id, _)| id.chars().any(|c| c.is_ascii_alphabetic()))
                .collect()
        })
        .unwrap_or_default();

    if !actions.is_empty() {
        let ids: Vec<&str> = actions.iter().map(|(id, _)| *id).collect();
        push_line(&mut out, "Actions", &ids.join(";"));
    }

    for (id, action) in actions {
        out.push_str("\n[Desktop Action ");
        out.push_str(id);
        out.push_str("]\n");
        push_line(&mut out, "Name", &action.name);
        if let Some(icon) = &action.icon {
            push_line(&mut out, "Icon", icon);
        }
        if let Some(exec) = &action.exec {
            push_line(&mut out, "Exec", exec);
        }
    }

    out
}

/// Desktop entry fields for the application being packaged.
pub fn app_entry_fields(settings: &Settings, has_icon: bool) -> Vec<(&'static str, Option<String>)> {
    let options = settings.options();
    vec![
        ("Type", Some("Application".to_string())),
        ("Name", Some(settings.product_name().to_string())),
        ("GenericName", options.generic_name.clone()),
        ("Exec", Some(quote_exec_arg(settings.bin()))),
        ("Icon", has_icon.then(|| settings.name().to_string())),
        (
            "Categories",
            options
                .categories
                .as_ref()
                .filter(|c| !c.is_empty())
                .map(|c| format!("{};", c.join(";"))),
        ),
        ("X-AppImage-Name", Some(settings.name().to_string())),
        ("X-AppImage-Version", Some(settings.version().to_string())),
        ("X-AppImage-Arch", Some(settings.appimage_arch().to_string())),
    ]
}

/// Produce the `.desktop` text: the configured override file verbatim, or a
/// generated entry.
pub async fn desktop_entry(settings: &Settings, has_icon: bool) -> Result<String> {
    if let Some(path) = &settings.options().desktop_file {
        log::debug!("Using desktop file {}", path.display());
        return tokio::fs::read_to_string(path)
            .await
            .fs_context("reading desktop file", path);
    }
    Ok(generate_desktop(
        &app_entry_fields(settings, has_icon),
        settings.options().actions.as_ref(),
    ))
}

/// Installed location of an icon inside the theme.
pub fn icon_theme_path(key: &str, app_name: &str, extension: &str) -> PathBuf {
    Path::new(HICOLOR_DIR)
        .join(key)
        .join("apps")
        .join(format!("{app_name}.{extension}"))
}

/// Copy every icon of the set into its theme directory under `dest_dir`.
///
/// Each copy waits for its own resolution directory; different resolutions
/// are installed concurrently. Returns installed paths in set order.
pub async fn install_icons(icons: &IconSet, dest_dir: &Path, app_name: &str) -> Result<Vec<PathBuf>> {
    let mut jobs = tokio::task::JoinSet::new();

    for (index, entry) in icons.entries().iter().enumerate() {
        let dest = dest_dir.join(icon_theme_path(&entry.key, app_name, &entry.extension));
        let source = entry.path.clone();
        jobs.spawn(async move {
            if let Some(dir) = dest.parent() {
                tokio::fs::create_dir_all(dir)
                    .await
                    .fs_context("creating icon directory", dir)?;
            }
            tokio::fs::copy(&source, &dest)
                .await
                .fs_context("copying icon", &source)?;
            log::debug!("Installed icon {}", dest.display());
            Ok::<_, Error>((index, dest))
        });
    }

    let mut installed = Vec::with_capacity(jobs.len());
    while let Some(joined) = jobs.join_next().await {
        let job = joined.map_err(|e| Error::GenericError(format!("icon install task failed: {e}")))?;
        installed.push(job?);
    }
    installed.sort_by_key(|(index, _)| *index);
    Ok(installed.into_iter().map(|(_, path)| path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(name: &str, exec: Option<&str>) -> DesktopAction {
        DesktopAction {
            name: name.into(),
            icon: None,
            exec: exec.map(str::to_string),
        }
    }

    #[test]
    fn test_escape_value() {
        assert_eq!(escape_value("plain"), "plain");
        assert_eq!(escape_value("a\\b"), "a\\\\b");
        assert_eq!(escape_value("keep \\n and \\\""), "keep \\n and \\\"");
        assert_eq!(escape_value("tab\there"), "tab\\there");
        assert_eq!(escape_value("line\nbreak\r"), "line\\nbreak\\r");
        assert_eq!(escape_value("`cmd`"), "\\`cmd\\`");
    }

    #[test]
    fn test_generate_skips_missing_values_and_keeps_order() {
        let text = generate_desktop(
            &[
                ("Type", Some("Application".into())),
                ("GenericName", None),
                ("Name", Some("Demo".into())),
                ("Exec", Some("demo".into())),
            ],
            None,
        );
        assert_eq!(text, "[Desktop Entry]\nType=Application\nName=Demo\nExec=demo\n");
    }

    #[test]
    fn test_generate_actions() {
        let actions: OrderedMap<DesktopAction> = vec![
            ("new-window".to_string(), action("New Window", Some("demo --new"))),
            ("42".to_string(), action("Ignored", None)),
            ("quit".to_string(), action("Quit", None)),
        ]
        .into_iter()
        .collect();
        let text = generate_desktop(
            &[("Name", Some("Demo".into())), ("Actions", Some("bogus".into()))],
            Some(&actions),
        );
        assert_eq!(
            text,
            "[Desktop Entry]\nName=Demo\nActions=new-window;quit\n\
             \n[Desktop Action new-window]\nName=New Window\nExec=demo --new\n\
             \n[Desktop Action quit]\nName=Quit\n"
        );
    }

    #[test]
    fn test_quote_exec_arg() {
        assert_eq!(quote_exec_arg("mock-app"), "mock-app");
        assert_eq!(quote_exec_arg("Other Name"), "\"Other Name\"");
        assert_eq!(quote_exec_arg("100%"), "100%%");
        assert_eq!(quote_exec_arg("a$b"), "\"a\\$b\"");
        assert_eq!(quote_exec_arg("say \"hi\""), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn test_exec_line_quotes_bin_with_spaces() {
        use crate::bundler::settings::{AppImageOptions, Environment, MakerMeta, PackageManifest};

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
            bin: Some("Demo App".into()),
            ..Default::default()
        };
        let settings = Settings::resolve(&meta, options, Environment::default()).unwrap();
        let text = generate_desktop(&app_entry_fields(&settings, false), None);
        assert!(text.contains("\nExec=\"Demo App\"\n"), "{text}");
    }

    #[test]
    fn test_generate_is_deterministic() {
        let fields = [("Name", Some("A\tB".to_string())), ("Exec", Some("a".into()))];
        assert_eq!(generate_desktop(&fields, None), generate_desktop(&fields, None));
    }

    #[test]
    fn test_icon_theme_path() {
        assert_eq!(
            icon_theme_path("scalable", "demo", "svg"),
            Path::new("usr/share/icons/hicolor/scalable/apps/demo.svg")
        );
    }
}
