use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use futures::{StreamExt as _, TryStreamExt as _, stream};
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, trace};

use crate::derivation::aterm::parse_derivation_bytes;
use crate::derivation::{Derivation, ParseDerivationError};
use crate::settings::{DEFAULT_MAX_CONCURRENCY, Settings};
use crate::store_path::{StoreDir, StorePath};
use crate::{Error, Result};

/// Outcome of loading one derivation, shared by everyone who asked for it.
#[derive(Debug, Clone)]
enum LoadError {
    Io {
        path: StorePath,
        source: Arc<io::Error>,
    },
    Parse(ParseDerivationError),
}

impl From<LoadError> for Error {
    fn from(value: LoadError) -> Self {
        match value {
            LoadError::Io { path, source } => Error::Io { path, source },
            LoadError::Parse(err) => Error::Parse(err),
        }
    }
}

type Slot = Arc<OnceCell<Result<Arc<Derivation>, LoadError>>>;

/// Loads derivation files from a store directory and remembers them.
///
/// Every path is read and parsed at most once for the lifetime of the store,
/// failures included. Callers racing on the same path wait for the first one
/// and all get the same [`Arc`]. Create one store per analysis so that the
/// table does not outlive it.
#[derive(Debug)]
pub struct DerivationStore {
    store_dir: StoreDir,
    max_concurrency: usize,
    memo: Mutex<HashMap<StorePath, Slot>>,
}

impl DerivationStore {
    pub fn new(store_dir: StoreDir) -> DerivationStore {
        DerivationStore {
            store_dir,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            memo: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_settings(settings: &Settings) -> DerivationStore {
        DerivationStore::new(settings.store_dir.clone())
            .with_max_concurrency(settings.max_concurrency)
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> DerivationStore {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn store_dir(&self) -> &StoreDir {
        &self.store_dir
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Number of distinct paths that have been requested so far.
    pub fn len(&self) -> usize {
        self.memo.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.memo.lock().is_empty()
    }

    /// The memo key for `path`.
    pub fn canonical_path(&self, path: &StorePath) -> Result<StorePath> {
        Ok(self.store_dir.resolve(path.as_str())?)
    }

    pub async fn load(&self, path: &StorePath) -> Result<Arc<Derivation>> {
        let path = self.canonical_path(path)?;
        let slot = self.memo.lock().entry(path.clone()).or_default().clone();
        if let Some(loaded) = slot.get() {
            trace!(%path, "derivation already loaded");
            return loaded.clone().map_err(Error::from);
        }
        slot.get_or_init(|| self.read(path))
            .await
            .clone()
            .map_err(Error::from)
    }

    /// Load all of `paths`, at most [`max_concurrency`](Self::max_concurrency)
    /// at a time. The result is in the same order as `paths`.
    pub async fn load_many<'p, I>(&self, paths: I) -> Result<Vec<Arc<Derivation>>>
    where
        I: IntoIterator<Item = &'p StorePath>,
    {
        stream::iter(paths)
            .map(|path| self.load(path))
            .buffered(self.max_concurrency)
            .try_collect()
            .await
    }

    async fn read(&self, path: StorePath) -> Result<Arc<Derivation>, LoadError> {
        let file = self.store_dir.local_path(&path);
        debug!(%path, file = %file.display(), "loading derivation");
        let bytes = match tokio::fs::read(&file).await {
            Ok(bytes) => bytes,
            Err(source) => {
                return Err(LoadError::Io {
                    path,
                    source: Arc::new(source),
                });
            }
        };
        let drv = parse_derivation_bytes(&bytes, path).map_err(LoadError::Parse)?;
        Ok(Arc::new(drv))
    }
}
