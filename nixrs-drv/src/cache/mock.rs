use std::collections::BTreeMap;

use parking_lot::Mutex;
use reqwest::StatusCode;
use url::Url;

use super::{BatchQuery, BinaryCache, CacheError};
use crate::store_path::StorePath;

const MOCK_URL: &str = "http://cache.invalid/";

fn status(path: &str, status: StatusCode) -> CacheError {
    match Url::parse(MOCK_URL).and_then(|base| base.join(path)) {
        Ok(url) => CacheError::Status { url, status },
        Err(err) => err.into(),
    }
}

/// In-memory cache with canned answers that records what it was asked.
#[derive(Debug, Default)]
pub struct MockCache {
    batch: Option<Result<BTreeMap<StorePath, bool>, StatusCode>>,
    probes: BTreeMap<StorePath, Result<bool, StatusCode>>,
    queries: Mutex<Vec<Vec<StorePath>>>,
    probed: Mutex<Vec<StorePath>>,
}

impl MockCache {
    /// A cache without a batch endpoint, every path is probed.
    pub fn unsupported() -> MockCache {
        MockCache::default()
    }

    pub fn with_batch(present: BTreeMap<StorePath, bool>) -> MockCache {
        MockCache {
            batch: Some(Ok(present)),
            ..Default::default()
        }
    }

    pub fn failing_batch(status: StatusCode) -> MockCache {
        MockCache {
            batch: Some(Err(status)),
            ..Default::default()
        }
    }

    /// Answer probes for `path`. Paths without an answer are absent.
    pub fn probe_result(mut self, path: StorePath, present: bool) -> MockCache {
        self.probes.insert(path, Ok(present));
        self
    }

    pub fn probe_failure(mut self, path: StorePath, status: StatusCode) -> MockCache {
        self.probes.insert(path, Err(status));
        self
    }

    pub fn queries(&self) -> Vec<Vec<StorePath>> {
        self.queries.lock().clone()
    }

    pub fn probed(&self) -> Vec<StorePath> {
        let mut probed = self.probed.lock().clone();
        probed.sort();
        probed
    }
}

impl BinaryCache for MockCache {
    async fn query_paths(&self, paths: &[StorePath]) -> Result<BatchQuery, CacheError> {
        self.queries.lock().push(paths.to_vec());
        match &self.batch {
            None => Ok(BatchQuery::Unsupported),
            Some(Ok(present)) => Ok(BatchQuery::Supported(
                paths
                    .iter()
                    .filter_map(|path| present.get(path).map(|p| (path.clone(), *p)))
                    .collect(),
            )),
            Some(Err(code)) => Err(status("query-paths", *code)),
        }
    }

    async fn probe(&self, path: &StorePath) -> Result<bool, CacheError> {
        self.probed.lock().push(path.clone());
        match self.probes.get(path) {
            Some(Ok(present)) => Ok(*present),
            Some(Err(code)) => Err(status(&format!("{}.narinfo", path.hash_part()), *code)),
            None => Ok(false),
        }
    }
}
