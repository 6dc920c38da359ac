use std::env;
use std::path::PathBuf;

/// Environment variable holding the processing service base URL.
pub const API_URL_VAR: &str = "TRACKER_API_URL";
/// Environment variable naming the directory processed files are saved to.
pub const DOWNLOAD_DIR_VAR: &str = "TRACKER_DOWNLOAD_DIR";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the processing service. A missing value surfaces as a transport failure
    /// when a form is submitted, not here.
    pub api_base: Option<String>,
    pub download_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base: None,
            download_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        Config {
            api_base: get(API_URL_VAR),
            download_dir: get(DOWNLOAD_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
        }
    }

    /// Apply command line overrides on top of this configuration.
    pub fn with_overrides(mut self, api_base: Option<String>, download_dir: Option<PathBuf>) -> Self {
        if let Some(api_base) = api_base {
            self.api_base = Some(api_base);
        }
        if let Some(dir) = download_dir {
            self.download_dir = dir;
        }
        self
    }
}
