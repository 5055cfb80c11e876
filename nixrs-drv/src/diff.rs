//! Finding the first meaningful difference between two derivations.
//!
//! Fields are compared in order of how much they tell about why two builds
//! differ: name, outputs, input files, input derivations and finally the
//! environment. Builder, builder arguments and system are not compared.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::derivation::Derivation;
use crate::derived_path::OutputName;
use crate::store_path::{StorePath, StorePathSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "derivation")]
pub enum DiffField {
    Name,
    OutputNames,
    InputFiles,
    InputDerivationPaths,
    InputDerivationOutputs(StorePath),
    Environment,
}

impl fmt::Display for DiffField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffField::Name => f.write_str("name"),
            DiffField::OutputNames => f.write_str("output names"),
            DiffField::InputFiles => f.write_str("input files"),
            DiffField::InputDerivationPaths => f.write_str("input derivation paths"),
            DiffField::InputDerivationOutputs(path) => write!(f, "outputs of derivation {path}"),
            DiffField::Environment => f.write_str("environment"),
        }
    }
}

/// One side of a difference.
///
/// For set valued fields this holds only the elements missing from the other
/// side. For the environment it holds the entries that were removed or
/// changed (left) and added or changed (right).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DiffValue {
    Name(Option<String>),
    OutputNames(BTreeSet<OutputName>),
    Paths(StorePathSet),
    Environment(BTreeMap<String, String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "result")]
pub enum DiffResult {
    Equal,
    Differs {
        field: DiffField,
        left: DiffValue,
        right: DiffValue,
    },
}

impl DiffResult {
    pub fn is_equal(&self) -> bool {
        matches!(self, DiffResult::Equal)
    }
}

fn halves<T: Ord + Clone>(left: &BTreeSet<T>, right: &BTreeSet<T>) -> (BTreeSet<T>, BTreeSet<T>) {
    (
        left.difference(right).cloned().collect(),
        right.difference(left).cloned().collect(),
    )
}

/// Entries of `from` that are missing from or different in `to`.
fn changed_entries(
    from: &BTreeMap<String, String>,
    to: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    from.iter()
        .filter(|&(key, value)| to.get(key) != Some(value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn differs(field: DiffField, left: DiffValue, right: DiffValue) -> DiffResult {
    DiffResult::Differs { field, left, right }
}

/// Report the first field in which `left` and `right` differ.
pub fn diff(left: &Derivation, right: &Derivation) -> DiffResult {
    if left.name() != right.name() {
        return differs(
            DiffField::Name,
            DiffValue::Name(left.name().map(str::to_owned)),
            DiffValue::Name(right.name().map(str::to_owned)),
        );
    }

    let (names_l, names_r) = (left.output_names(), right.output_names());
    if names_l != names_r {
        let (l, r) = halves(&names_l, &names_r);
        return differs(
            DiffField::OutputNames,
            DiffValue::OutputNames(l),
            DiffValue::OutputNames(r),
        );
    }

    if left.input_files != right.input_files {
        let (l, r) = halves(&left.input_files, &right.input_files);
        return differs(DiffField::InputFiles, DiffValue::Paths(l), DiffValue::Paths(r));
    }

    if left.input_derivations != right.input_derivations {
        let (paths_l, paths_r) = (left.input_derivation_paths(), right.input_derivation_paths());
        if paths_l != paths_r {
            let (l, r) = halves(&paths_l, &paths_r);
            return differs(
                DiffField::InputDerivationPaths,
                DiffValue::Paths(l),
                DiffValue::Paths(r),
            );
        }
        // Same keys on both sides, iteration is in path order.
        for ((path, outs_l), outs_r) in left
            .input_derivations
            .iter()
            .zip(right.input_derivations.values())
        {
            if outs_l != outs_r {
                let (l, r) = halves(outs_l, outs_r);
                return differs(
                    DiffField::InputDerivationOutputs(path.clone()),
                    DiffValue::OutputNames(l),
                    DiffValue::OutputNames(r),
                );
            }
        }
    }

    if left.environment != right.environment {
        return differs(
            DiffField::Environment,
            DiffValue::Environment(changed_entries(&left.environment, &right.environment)),
            DiffValue::Environment(changed_entries(&right.environment, &left.environment)),
        );
    }

    DiffResult::Equal
}
