//! Helpers for tests in this crate and in crates depending on it.

pub mod arbitrary {
    pub use crate::derivation::arbitrary::*;
    pub use crate::store_path::proptest::*;
}

#[cfg(test)]
pub(crate) mod fixture;

#[macro_export]
macro_rules! btree_set {
    () => { std::collections::BTreeSet::new() };
    ($($v:expr),+ $(,)?) => {{
        let mut ret = std::collections::BTreeSet::new();
        $(
            ret.insert($v.parse().unwrap());
        )+
        ret
    }};
}
