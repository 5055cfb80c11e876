use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::derived_path::OutputName;
use crate::store_path::{StorePath, StorePathSet};

pub mod aterm;
mod derivation_output;

pub use aterm::{ParseDerivationError, ParseError, parse_derivation, parse_derivation_bytes};
pub use derivation_output::{DerivationOutput, DerivationOutputs};

/// Environment variable holding the display name of a derivation.
pub const NAME_VAR: &str = "name";

/// A parsed derivation file.
///
/// `path` identifies the derivation. The store treats derivation files as
/// immutable so two derivations with the same path always hold the same data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Derivation {
    pub path: StorePath,
    pub outputs: DerivationOutputs,
    pub input_derivations: BTreeMap<StorePath, BTreeSet<OutputName>>,
    pub input_files: StorePathSet,
    pub system: String,
    pub builder: String,
    pub builder_args: Vec<String>,
    pub environment: BTreeMap<String, String>,
}

impl Derivation {
    /// The display name from the `name` environment variable.
    ///
    /// Parsing rejects derivations without one, so this is only `None` for
    /// derivations built by hand.
    pub fn name(&self) -> Option<&str> {
        self.environment.get(NAME_VAR).map(String::as_str)
    }

    pub fn output_names(&self) -> BTreeSet<OutputName> {
        self.outputs.keys().cloned().collect()
    }

    pub fn output_path(&self, name: &OutputName) -> Option<&StorePath> {
        self.outputs.get(name).map(DerivationOutput::path)
    }

    /// Output name to store path, with fixed output hashes left out.
    pub fn output_paths(&self) -> BTreeMap<OutputName, StorePath> {
        self.outputs
            .iter()
            .map(|(name, output)| (name.clone(), output.path().clone()))
            .collect()
    }

    pub fn input_derivation_paths(&self) -> StorePathSet {
        self.input_derivations.keys().cloned().collect()
    }

    /// Render the derivation in the `Derive(...)` form it is stored in.
    pub fn to_aterm(&self) -> String {
        aterm::print_derivation(self)
    }
}

#[cfg(any(test, feature = "test"))]
pub mod arbitrary {
    use ::proptest::prelude::*;
    use proptest::sample::SizeRange;

    use super::*;
    use crate::store_path::proptest::arb_store_path;

    pub use super::derivation_output::arbitrary::arb_derivation_outputs;

    fn arb_text() -> impl Strategy<Value = String> {
        "[ -~\n\t\r\u{e9}]{0,20}"
    }

    prop_compose! {
        pub fn arb_derivation()
        (
            path in arb_store_path(".drv"),
            outputs in arb_derivation_outputs(1..5),
            input_derivations in proptest::collection::btree_map(
                arb_store_path(".drv"),
                proptest::collection::btree_set(any::<OutputName>(), 1..3),
                0..4,
            ),
            input_files in proptest::collection::btree_set(arb_store_path(""), 0..4),
            system in prop_oneof![Just("x86_64-linux".to_string()), Just("aarch64-darwin".to_string())],
            builder in arb_text(),
            builder_args in proptest::collection::vec(arb_text(), SizeRange::default()),
            mut environment in proptest::collection::btree_map("[a-zA-Z_]{1,10}", arb_text(), 0..6),
            name in "[a-z][a-z0-9.-]{0,15}",
        ) -> Derivation
        {
            environment.insert(NAME_VAR.into(), name);
            Derivation {
                path, outputs, input_derivations, input_files, system, builder, builder_args, environment,
            }
        }
    }

    impl Arbitrary for Derivation {
        type Parameters = ();
        type Strategy = BoxedStrategy<Derivation>;

        fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
            arb_derivation().boxed()
        }
    }
}
