//! Command-line arguments passed by the host when it starts the plugin.
//!
//! The host uses single-dash long flags (`-port 28196 -pluginUUID ...`), which
//! clap does not accept, so they are rewritten to `--port` form before
//! parsing.

use std::path::PathBuf;

use clap::Parser;

use homedeck_core::prelude::*;

/// Flags the host passes on startup.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "homedeck")]
#[command(about = "Smart-home buttons for the host application", long_about = None)]
pub struct LaunchArgs {
    /// Port of the host's WebSocket server
    #[arg(long = "port")]
    pub port: u16,

    /// Identifier used for registration and global settings
    #[arg(long = "pluginUUID")]
    pub plugin_uuid: String,

    /// Event name of the registration frame
    #[arg(long = "registerEvent")]
    pub register_event: String,

    /// JSON blob describing the host application and devices
    #[arg(long = "info")]
    pub info: Option<String>,

    /// Plugin configuration file
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl LaunchArgs {
    /// Parse host-style arguments (the first item is the program name).
    ///
    /// # Errors
    ///
    /// Returns [`Error::LaunchArgs`] when a required flag is missing or
    /// malformed.
    pub fn parse_from_host<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let normalized = args.into_iter().map(|a| normalize_flag(a.into()));
        Self::try_parse_from(normalized).map_err(|e| Error::launch_args(e.to_string()))
    }

    /// UI language reported by the host, if the `-info` blob carries one.
    pub fn language(&self) -> Option<String> {
        let info = self.info.as_deref()?;
        match serde_json::from_str::<serde_json::Value>(info) {
            Ok(value) => value
                .pointer("/application/language")
                .and_then(|l| l.as_str())
                .map(str::to_string),
            Err(e) => {
                warn!("Failed to parse language from -info: {}", e);
                None
            }
        }
    }
}

/// Rewrite `-flag` to `--flag`; leave values and `--flag` untouched.
fn normalize_flag(arg: String) -> String {
    let is_single_dash_word = arg.len() > 2
        && arg.starts_with('-')
        && !arg.starts_with("--")
        && arg[1..].starts_with(|c: char| c.is_ascii_alphabetic());
    if is_single_dash_word {
        format!("-{arg}")
    } else {
        arg
    }
}
