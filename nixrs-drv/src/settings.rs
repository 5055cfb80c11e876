use std::num::ParseIntError;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::store_path::{ParseStorePathError, StoreDir};

pub const STORE_DIR_VAR: &str = "NIX_STORE";
pub const CACHE_URL_VAR: &str = "NIX_REPO_HTTP";
pub const CACHE_TIMEOUT_VAR: &str = "NIX_REPO_TIMEOUT";

pub const DEFAULT_MAX_CONCURRENCY: usize = 16;
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseSettingError {
    #[error("invalid store directory: {0}")]
    StoreDir(
        #[source]
        #[from]
        ParseStorePathError,
    ),
    #[error("invalid binary cache URL '{value}': {error}")]
    CacheUrl {
        value: String,
        #[source]
        error: url::ParseError,
    },
    #[error("invalid binary cache timeout '{value}': {error}")]
    CacheTimeout {
        value: String,
        #[source]
        error: ParseIntError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Where derivation files and build outputs live. Relative derivation
    /// paths are resolved against it.
    pub store_dir: StoreDir,

    /// Upper bound on derivation loads and cache probes in flight at once.
    pub max_concurrency: usize,

    /// Binary cache used to tell which missing outputs can be fetched
    /// instead of built. No cache is consulted when this is unset.
    pub cache_url: Option<Url>,

    /// Deadline for every request sent to the binary cache.
    pub cache_timeout: Duration,
}

impl Settings {
    /// Defaults overridden by `NIX_STORE`, `NIX_REPO_HTTP` and
    /// `NIX_REPO_TIMEOUT` (in seconds).
    pub fn from_env() -> Result<Settings, ParseSettingError> {
        Settings::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars<F>(var: F) -> Result<Settings, ParseSettingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();
        if let Some(value) = var(STORE_DIR_VAR).filter(|v| !v.is_empty()) {
            settings.store_dir = StoreDir::new(value)?;
        }
        if let Some(value) = var(CACHE_URL_VAR).filter(|v| !v.is_empty()) {
            let url = value
                .parse()
                .map_err(|error| ParseSettingError::CacheUrl { value, error })?;
            settings.cache_url = Some(url);
        }
        if let Some(value) = var(CACHE_TIMEOUT_VAR).filter(|v| !v.is_empty()) {
            let secs = value
                .trim()
                .parse()
                .map_err(|error| ParseSettingError::CacheTimeout { value, error })?;
            settings.cache_timeout = Duration::from_secs(secs);
        }
        Ok(settings)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            store_dir: StoreDir::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            cache_url: None,
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod unittests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn from_vars(vars: &[(&str, &str)]) -> Result<Settings, ParseSettingError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let settings = from_vars(&[]).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.store_dir.to_str(), "/nix/store");
        assert_eq!(settings.max_concurrency, 16);
        assert_eq!(settings.cache_url, None);
        assert_eq!(settings.cache_timeout, Duration::from_secs(30));
    }

    #[test]
    fn overrides() {
        let settings = from_vars(&[
            ("NIX_STORE", "/tmp/store/"),
            ("NIX_REPO_HTTP", "https://cache.example.org/nix"),
            ("NIX_REPO_TIMEOUT", "5"),
        ])
        .unwrap();
        assert_eq!(settings.store_dir.to_str(), "/tmp/store");
        assert_eq!(
            settings.cache_url.as_ref().map(Url::as_str),
            Some("https://cache.example.org/nix")
        );
        assert_eq!(settings.cache_timeout, Duration::from_secs(5));
    }

    #[test]
    fn empty_values_are_ignored() {
        let settings = from_vars(&[("NIX_REPO_HTTP", ""), ("NIX_REPO_TIMEOUT", "")]).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn bad_timeout() {
        let err = from_vars(&[("NIX_REPO_TIMEOUT", "soon")]).unwrap_err();
        assert!(matches!(err, ParseSettingError::CacheTimeout { ref value, .. } if value == "soon"));
    }

    #[test]
    fn bad_url() {
        let err = from_vars(&[("NIX_REPO_HTTP", "not a url")]).unwrap_err();
        assert!(matches!(err, ParseSettingError::CacheUrl { .. }));
    }
}
