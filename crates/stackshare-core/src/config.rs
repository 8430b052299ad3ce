//! Configuration models.
//!
//! Every field has a default so a partial (or missing) `config.toml` is valid.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackshareConfig {
    pub share: ShareConfig,
    pub generator: GeneratorConfig,
    pub sync: SyncConfig,
}

/// Share link settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Canonical path the share token is appended to.
    pub base_url: String,
    /// Longest URL the codec will emit before compacting the payload.
    pub max_url_length: usize,
    /// Stack names are cut to this many characters in share links.
    pub max_name_chars: usize,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            base_url: "https://stackshare.dev/s".to_string(),
            max_url_length: 2000,
            max_name_chars: 80,
        }
    }
}

/// Install command generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Reference-manager program invoked in reference mode.
    pub installer: String,
    /// Root URL for direct downloads in script mode.
    pub raw_base_url: String,
    /// Directory the script installs into.
    pub install_root: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            installer: "stackshare".to_string(),
            raw_base_url: "https://stackshare.dev/raw".to_string(),
            install_root: ".claude".to_string(),
        }
    }
}

/// Remote mirror settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub enabled: bool,
    /// Base URL of the remote stacks API.
    pub endpoint: Option<String>,
    /// Environment variable holding the session token.
    pub api_key_env: String,
    /// Also mark stacks public after each mirrored save.
    pub publish_on_save: bool,
    pub timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            api_key_env: "STACKSHARE_SYNC_TOKEN".to_string(),
            publish_on_save: false,
            timeout_secs: 10,
        }
    }
}
