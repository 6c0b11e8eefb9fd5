//! Launcher entry point staged at `usr/bin/<bin>`.
//!
//! By default the launcher is a relative symlink to the real executable under
//! `usr/lib/<name>/`. With `flagsFile` enabled it is a POSIX shell script that
//! prepends arguments read from `<bin>-flags.conf` in the user's XDG config
//! directory, matching the convention Arch Linux uses for Chromium and
//! Electron packages.

use crate::bundler::{
    error::{ErrorExt, Result},
    settings::Settings,
    utils::fs::{self as fs_utils, EXEC_MODE},
};
use handlebars::Handlebars;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

const FLAGS_LAUNCHER_TEMPLATE: &str = r#"#!/bin/sh
HERE="$(dirname "$(readlink -f "$0")")"
FLAGS_FILE="${XDG_CONFIG_HOME:-$HOME/.config}"/{{bin_quoted}}-flags.conf
FLAGS=""
if [ -r "$FLAGS_FILE" ]; then
  FLAGS="$(grep -v '^[[:space:]]*#' "$FLAGS_FILE" | tr '\n' ' ')"
fi
ARGS=""
for arg in "$@"; do
  ARGS="$ARGS '$(printf '%s' "$arg" | sed "s/'/'\\\\''/g")'"
done
eval "set -- $FLAGS $ARGS"
exec "$HERE/../lib/"{{name_quoted}}/{{bin_quoted}} "$@"
"#;

/// Quote a string for POSIX shells using single quotes.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Render the flags-file launcher script.
pub fn render_flags_launcher(name: &str, bin: &str) -> Result<String> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.register_template_string("launcher", FLAGS_LAUNCHER_TEMPLATE)?;

    let mut data = BTreeMap::new();
    data.insert("name_quoted", shell_quote(name));
    data.insert("bin_quoted", shell_quote(bin));

    Ok(handlebars.render("launcher", &data)?)
}

/// Path of the launcher relative to the staging root.
pub fn launcher_path(bin: &str) -> PathBuf {
    Path::new("usr/bin").join(bin)
}

/// Path of the real executable relative to the staging root.
pub fn executable_path(name: &str, bin: &str) -> PathBuf {
    Path::new("usr/lib").join(name).join(bin)
}

/// Write the launcher into `root`, whose `usr/bin` directory must exist.
pub async fn install_launcher(settings: &Settings, root: &Path) -> Result<PathBuf> {
    let link = launcher_path(settings.bin());
    let target = executable_path(settings.name(), settings.bin());

    if settings.flags_file() {
        let script = render_flags_launcher(settings.name(), settings.bin())?;
        let dest = root.join(&link);
        tokio::fs::write(&dest, script)
            .await
            .fs_context("writing launcher script", &dest)?;
        fs_utils::set_mode(&dest, EXEC_MODE).await?;
        log::debug!("Wrote flags-file launcher {}", dest.display());
    } else {
        fs_utils::symlink_relative(root, &target, &link).await?;
        log::debug!("Linked {} -> {}", link.display(), target.display());
    }

    Ok(root.join(link))
}
