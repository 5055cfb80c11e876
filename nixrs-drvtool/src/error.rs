use std::io;

use nixrs_drv::cache::CacheError;
use nixrs_drv::derived_path::ParseRequestError;
use nixrs_drv::settings::ParseSettingError;
use nixrs_drv::store_path::ParseStorePathError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Derivation(#[from] nixrs_drv::Error),
    #[error("invalid settings: {0}")]
    Settings(#[from] ParseSettingError),
    #[error(transparent)]
    StorePath(#[from] ParseStorePathError),
    #[error(transparent)]
    Request(#[from] ParseRequestError),
    #[error("binary cache: {0}")]
    Cache(#[from] CacheError),
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("could not render JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown attribute '{0}', expected one of: {1}")]
    UnknownAttribute(String, String),
    #[error("derivation has no environment variable '{0}'")]
    UnknownEnvVar(String),
    #[error("derivation has no output '{0}'")]
    UnknownOutput(String),
    #[error("attribute '{0}' is not a string or list of strings, try --json")]
    NotText(String),
    #[error("no derivation paths given")]
    NoPaths,
}
