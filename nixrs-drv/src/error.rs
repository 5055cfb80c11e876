use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::cache::CacheError;
use crate::derivation::ParseDerivationError;
use crate::derived_path::OutputName;
use crate::store_path::{ParseStorePathError, StorePath};

/// Failures that abort an analysis.
///
/// None of these are retried. A missing batch endpoint on the binary cache is
/// not an error at all and a failed per-path probe is recorded in the preview
/// result instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not read '{path}': {source}")]
    Io {
        path: StorePath,
        #[source]
        source: Arc<io::Error>,
    },
    #[error(transparent)]
    Parse(#[from] ParseDerivationError),
    #[error(transparent)]
    StorePath(#[from] ParseStorePathError),
    #[error("derivation '{path}' depends on itself")]
    Cycle { path: StorePath },
    #[error("derivation '{drv_path}' has no output named '{output}'")]
    MissingOutput {
        drv_path: StorePath,
        output: OutputName,
    },
    #[error("binary cache query failed: {0}")]
    Transport(#[from] CacheError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
