use std::future::Future;
use std::sync::Arc;

use tracing::trace;

use crate::settings::Settings;
use crate::store_path::{StoreDir, StorePath, StorePathSet};
use crate::{Error, Result};

/// Tells which store paths are already present locally.
pub trait LocalStore {
    fn is_valid_path(&self, path: &StorePath) -> impl Future<Output = Result<bool>> + Send;
}

impl<L: LocalStore + Sync> LocalStore for &L {
    fn is_valid_path(&self, path: &StorePath) -> impl Future<Output = Result<bool>> + Send {
        (**self).is_valid_path(path)
    }
}

/// A fixed set of present paths.
impl LocalStore for StorePathSet {
    async fn is_valid_path(&self, path: &StorePath) -> Result<bool> {
        Ok(self.contains(path))
    }
}

/// Looks for store objects on the local file system.
#[derive(Debug, Clone, Default)]
pub struct FsLocalStore {
    store_dir: StoreDir,
}

impl FsLocalStore {
    pub fn new(store_dir: StoreDir) -> FsLocalStore {
        FsLocalStore { store_dir }
    }

    pub fn from_settings(settings: &Settings) -> FsLocalStore {
        FsLocalStore::new(settings.store_dir.clone())
    }
}

impl LocalStore for FsLocalStore {
    async fn is_valid_path(&self, path: &StorePath) -> Result<bool> {
        let file = self.store_dir.local_path(path);
        let exists = tokio::fs::try_exists(&file)
            .await
            .map_err(|source| Error::Io {
                path: path.clone(),
                source: Arc::new(source),
            })?;
        trace!(%path, exists, "checked local store");
        Ok(exists)
    }
}
