use crate::theme::Theme;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

/// Default puzzle service address
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

/// Solve cryptograms served by a puzzle service
#[derive(Debug, Clone, Parser)]
#[command(name = "cryptogram", version, about)]
pub struct Cli {
    /// Base URL of the puzzle service
    #[arg(long, env = "CRYPTOGRAM_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    pub server_url: String,

    /// Request timeout in seconds
    #[arg(long, env = "CRYPTOGRAM_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,

    /// Log filter, e.g. `info` or `cryptogram_core=debug` (RUST_LOG wins)
    #[arg(long, env = "CRYPTOGRAM_LOG", default_value = "info")]
    pub log_level: String,

    /// Color theme
    #[arg(long, value_enum, default_value_t = ThemeChoice::Dark)]
    pub theme: ThemeChoice,
}

impl Cli {
    pub fn remote_config(&self) -> RemoteConfig {
        RemoteConfig {
            base_url: self.server_url.trim_end_matches('/').to_string(),
            timeout_secs: self.timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThemeChoice {
    Dark,
    Light,
    HighContrast,
}

impl ThemeChoice {
    pub fn theme(self) -> Theme {
        match self {
            ThemeChoice::Dark => Theme::dark(),
            ThemeChoice::Light => Theme::light(),
            ThemeChoice::HighContrast => Theme::high_contrast(),
        }
    }
}

/// Configuration for the remote puzzle service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVER_URL.to_string(),
            timeout_secs: 10,
        }
    }
}
