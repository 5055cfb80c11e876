use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::derived_path::OutputName;
use crate::store_path::StorePath;

/// An output as declared by a derivation.
///
/// Whether an output is fixed is decided once, when the derivation is parsed:
/// empty hash fields give a plain output, anything else a fixed one.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DerivationOutput {
    Plain(StorePath),
    #[serde(rename_all = "camelCase")]
    FixedOutput {
        path: StorePath,
        hash_algo: String,
        hash: String,
    },
}

impl DerivationOutput {
    pub fn from_parts(path: StorePath, hash_algo: String, hash: String) -> DerivationOutput {
        if hash_algo.is_empty() && hash.is_empty() {
            DerivationOutput::Plain(path)
        } else {
            DerivationOutput::FixedOutput {
                path,
                hash_algo,
                hash,
            }
        }
    }

    pub fn path(&self) -> &StorePath {
        match self {
            DerivationOutput::Plain(path) => path,
            DerivationOutput::FixedOutput { path, .. } => path,
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, DerivationOutput::FixedOutput { .. })
    }

    /// The hash algorithm and hash fields as they are written in a derivation
    /// file.
    pub fn hash_fields(&self) -> (&str, &str) {
        match self {
            DerivationOutput::Plain(_) => ("", ""),
            DerivationOutput::FixedOutput {
                hash_algo, hash, ..
            } => (hash_algo, hash),
        }
    }
}

pub type DerivationOutputs = BTreeMap<OutputName, DerivationOutput>;

#[cfg(any(test, feature = "test"))]
pub mod arbitrary {
    use ::proptest::prelude::*;

    use super::*;
    use crate::store_path::proptest::arb_store_path;

    impl Arbitrary for DerivationOutput {
        type Parameters = ();
        type Strategy = BoxedStrategy<DerivationOutput>;

        fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
            prop_oneof![
                4 => arb_store_path("").prop_map(DerivationOutput::Plain),
                1 => (
                    arb_store_path(""),
                    prop_oneof![Just("sha256"), Just("r:sha256"), Just("sha512")],
                    "[0-9a-z]{52}",
                ).prop_map(|(path, hash_algo, hash)| DerivationOutput::FixedOutput {
                    path,
                    hash_algo: hash_algo.into(),
                    hash,
                }),
            ]
            .boxed()
        }
    }

    pub fn arb_derivation_outputs(
        size: impl Into<proptest::sample::SizeRange>,
    ) -> impl Strategy<Value = DerivationOutputs> {
        proptest::collection::btree_map(any::<OutputName>(), any::<DerivationOutput>(), size)
    }
}

#[cfg(test)]
mod unittests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("", "", false)]
    #[case("sha256", "1b8m03r63zqhnjf7l5wnldhh7c134ap5vpj0850ymkq1iyzicy5s", true)]
    #[case("r:sha256", "", true)]
    #[case("", "1b8m03r63zqhnjf7l5wnldhh7c134ap5vpj0850ymkq1iyzicy5s", true)]
    fn from_parts(#[case] hash_algo: &str, #[case] hash: &str, #[case] fixed: bool) {
        let path: StorePath = "/store/abc-foo".parse().unwrap();
        let output = DerivationOutput::from_parts(path.clone(), hash_algo.into(), hash.into());
        assert_eq!(output.is_fixed(), fixed);
        assert_eq!(output.path(), &path);
        assert_eq!(output.hash_fields(), (hash_algo, hash));
    }

    #[test]
    fn json() {
        let plain = DerivationOutput::Plain("/store/abc-foo".parse().unwrap());
        assert_eq!(
            serde_json::to_value(&plain).unwrap(),
            serde_json::json!("/store/abc-foo")
        );
        let fixed = DerivationOutput::FixedOutput {
            path: "/store/abc-src.tar.gz".parse().unwrap(),
            hash_algo: "sha256".into(),
            hash: "0000".into(),
        };
        assert_eq!(
            serde_json::to_value(&fixed).unwrap(),
            serde_json::json!({
                "path": "/store/abc-src.tar.gz",
                "hashAlgo": "sha256",
                "hash": "0000",
            })
        );
    }
}
