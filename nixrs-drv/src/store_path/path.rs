use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A path in the store, kept as the opaque string it was written as.
///
/// Derivation files refer to their inputs and outputs by absolute path. No
/// assumptions are made about the shape of the hash part beyond it being the
/// text of the base name up to the first `-`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorePath(String);

impl StorePath {
    fn from_string(s: String) -> Result<Self, StorePathError> {
        if s.is_empty() {
            return Err(StorePathError::Empty);
        }
        if let Some(index) = s.bytes().position(|c| c == b'\0' || c == b'\n') {
            return Err(StorePathError::Symbol(index, s.as_bytes()[index]));
        }
        if s.ends_with('/') {
            return Err(StorePathError::NoBaseName);
        }
        Ok(StorePath(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    pub fn is_absolute(&self) -> bool {
        self.0.starts_with('/')
    }

    /// The last path segment, eg. `abc-foo` for `/nix/store/abc-foo`.
    pub fn base_name(&self) -> &str {
        match self.0.rsplit_once('/') {
            Some((_, base)) => base,
            None => &self.0,
        }
    }

    /// The hash prefix of the base name, used to look up per-object metadata
    /// in a binary cache.
    ///
    /// ```
    /// # use nixrs_drv::store_path::StorePath;
    /// let path: StorePath = "/nix/store/55xkmqns51sw7nrgykp5vnz36w4fr3cw-nix-2.1.3".parse().unwrap();
    /// assert_eq!("55xkmqns51sw7nrgykp5vnz36w4fr3cw", path.hash_part());
    /// ```
    pub fn hash_part(&self) -> &str {
        let base = self.base_name();
        match base.split_once('-') {
            Some((hash, _)) => hash,
            None => base,
        }
    }

    /// The name of the base name, that is everything after the hash part.
    pub fn name(&self) -> &str {
        let base = self.base_name();
        match base.split_once('-') {
            Some((_, name)) => name,
            None => "",
        }
    }

    pub fn is_derivation(&self) -> bool {
        self.0.ends_with(".drv")
    }
}

impl fmt::Debug for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StorePath")
            .field(&format_args!("{}", self))
            .finish()
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<Path> for StorePath {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

impl From<StorePath> for String {
    fn from(value: StorePath) -> Self {
        value.0
    }
}

impl TryFrom<String> for StorePath {
    type Error = ParseStorePathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        StorePath::from_string(value.clone()).map_err(|error| ParseStorePathError {
            path: value,
            error,
        })
    }
}

impl FromStr for StorePath {
    type Err = ParseStorePathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StorePath::from_string(s.to_owned()).map_err(|error| ParseStorePathError::new(s, error))
    }
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum StorePathError {
    #[error("store path is empty")]
    Empty,
    #[error("store path has no base name")]
    NoBaseName,
    #[error("invalid symbol {1:#04x} at {0} in store path")]
    Symbol(usize, u8),
    #[error("store path is not valid UTF-8")]
    NonUtf8,
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("bad store path '{path}': {error}")]
pub struct ParseStorePathError {
    pub path: String,
    pub error: StorePathError,
}

impl ParseStorePathError {
    pub fn new(path: &str, error: StorePathError) -> ParseStorePathError {
        ParseStorePathError {
            path: path.to_owned(),
            error,
        }
    }
}

#[cfg(any(test, feature = "test"))]
pub mod proptest {
    use ::proptest::prelude::*;

    use super::StorePath;

    pub fn arb_store_path_hash() -> impl Strategy<Value = String> {
        "[0-9a-df-np-sv-z]{32}"
    }

    prop_compose! {
        pub fn arb_store_path(suffix: &'static str)
        (
            hash in arb_store_path_hash(),
            name in "[a-zA-Z0-9+._?=][a-zA-Z0-9+._?=-]{0,40}",
        ) -> StorePath
        {
            StorePath(format!("/nix/store/{hash}-{name}{suffix}"))
        }
    }

    impl Arbitrary for StorePath {
        type Parameters = ();
        type Strategy = BoxedStrategy<StorePath>;

        fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
            arb_store_path("").boxed()
        }
    }
}
