use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use super::{ParseStorePathError, StorePath, StorePathError};

/// Store directory.
/// Derivation paths given relative to the store are resolved against this, and
/// local existence checks look for store objects in it.
///
/// ```
/// use nixrs_drv::store_path::StoreDir;
/// let store = StoreDir::new("/nix/store").unwrap();
/// let path = store.resolve("55xkmqns51sw7nrgykp5vnz36w4fr3cw-nix-2.1.3.drv").unwrap();
/// assert_eq!("/nix/store/55xkmqns51sw7nrgykp5vnz36w4fr3cw-nix-2.1.3.drv", path.as_str());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoreDir(Arc<PathBuf>, Arc<String>);

impl StoreDir {
    /// Create a new StoreDir from given path.
    /// This can fail if the path contains non-UTF-8 characters and therefore can't be
    /// converted to a [`String`].
    pub fn new<P: Into<PathBuf>>(path: P) -> Result<StoreDir, ParseStorePathError> {
        let path = path.into();
        let path_s = path
            .to_str()
            .ok_or_else(|| {
                ParseStorePathError::new(
                    &path.to_string_lossy(),
                    StorePathError::NonUtf8,
                )
            })?
            .trim_end_matches('/')
            .to_string();
        if path_s.is_empty() {
            return Ok(StoreDir(Arc::new(PathBuf::from("/")), Arc::new("/".into())));
        }
        Ok(StoreDir(Arc::new(PathBuf::from(&path_s)), Arc::new(path_s)))
    }

    /// Get [`str`] representation of this StoreDir.
    pub fn to_str(&self) -> &str {
        self.1.as_ref()
    }

    pub fn to_path(&self) -> &Path {
        self.0.as_ref()
    }

    /// Resolve a derivation path to its canonical form.
    ///
    /// Relative paths are taken to be relative to the store directory. `.`
    /// segments and repeated separators are dropped so that the same file
    /// always maps to the same key.
    pub fn resolve(&self, path: &str) -> Result<StorePath, ParseStorePathError> {
        let joined = if path.starts_with('/') {
            PathBuf::from(path)
        } else {
            self.0.join(path)
        };
        let clean: PathBuf = joined
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect();
        let clean = clean.to_str().ok_or_else(|| {
            ParseStorePathError::new(path, StorePathError::NonUtf8)
        })?;
        clean.parse()
    }

    /// Location of a store object on the local file system.
    ///
    /// Absolute paths are taken as is, relative ones are looked up in the
    /// store directory.
    pub fn local_path(&self, path: &StorePath) -> PathBuf {
        if path.is_absolute() {
            path.as_path().to_owned()
        } else {
            self.0.join(path.as_str())
        }
    }
}

impl Default for StoreDir {
    fn default() -> Self {
        StoreDir(
            Arc::new(PathBuf::from("/nix/store")),
            Arc::new("/nix/store".into()),
        )
    }
}

impl fmt::Display for StoreDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

impl AsRef<Path> for StoreDir {
    fn as_ref(&self) -> &Path {
        self.0.as_ref()
    }
}
