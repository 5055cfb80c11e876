use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

use crate::store_path::StorePath;

mod http;
#[cfg(any(test, feature = "test"))]
pub mod mock;

pub use http::{CacheAuth, HttpBinaryCache};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("HTTP error: {0}")]
    Http(
        #[from]
        #[source]
        reqwest::Error,
    ),
    #[error("binary cache answered {status} for {url}")]
    Status { url: Url, status: StatusCode },
    #[error("binary cache did not answer within {0:?}")]
    Timeout(Duration),
    #[error("URL error: {0}")]
    Url(
        #[from]
        #[source]
        url::ParseError,
    ),
}

/// Answer to a batched presence query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchQuery {
    /// Presence of each path the cache knows about. Paths left out are not
    /// present.
    Supported(BTreeMap<StorePath, bool>),
    /// The cache has no batch endpoint; ask per path with
    /// [`BinaryCache::probe`] instead.
    Unsupported,
}

/// A remote store that may hold build outputs.
pub trait BinaryCache {
    /// Ask about all of `paths` in one request.
    fn query_paths(
        &self,
        paths: &[StorePath],
    ) -> impl Future<Output = Result<BatchQuery, CacheError>> + Send;

    /// Ask about a single path through its metadata file.
    fn probe(&self, path: &StorePath) -> impl Future<Output = Result<bool, CacheError>> + Send;
}

impl<C: BinaryCache + Sync> BinaryCache for &C {
    fn query_paths(
        &self,
        paths: &[StorePath],
    ) -> impl Future<Output = Result<BatchQuery, CacheError>> + Send {
        (**self).query_paths(paths)
    }

    fn probe(&self, path: &StorePath) -> impl Future<Output = Result<bool, CacheError>> + Send {
        (**self).probe(path)
    }
}

/// Stand-in for "no binary cache configured".
///
/// Reports every path as absent without any network traffic.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl BinaryCache for NoCache {
    async fn query_paths(&self, _paths: &[StorePath]) -> Result<BatchQuery, CacheError> {
        Ok(BatchQuery::Supported(BTreeMap::new()))
    }

    async fn probe(&self, _path: &StorePath) -> Result<bool, CacheError> {
        Ok(false)
    }
}
