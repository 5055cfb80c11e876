use std::collections::BTreeSet;

mod path;
mod store_dir;

pub use path::{ParseStorePathError, StorePath, StorePathError};
pub use store_dir::StoreDir;

pub type StorePathSet = BTreeSet<StorePath>;

#[cfg(any(test, feature = "test"))]
pub mod proptest {
    pub use super::path::proptest::*;
}
