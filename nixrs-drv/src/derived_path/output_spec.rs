use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use derive_more::Display;
#[cfg(any(test, feature = "test"))]
use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MAX_NAME_LEN: usize = 211;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum OutputNameError {
    #[error("output name must be between 1 and 211 characters")]
    NameLength,
    #[error("output name contains forbidden symbol {1:?} at {0}")]
    Symbol(usize, char),
}

fn validate_name(s: &str) -> Result<(), OutputNameError> {
    if s.is_empty() || s.len() > MAX_NAME_LEN {
        return Err(OutputNameError::NameLength);
    }
    for (index, c) in s.char_indices() {
        if !(c.is_ascii_alphanumeric() || "+-._?=".contains(c)) {
            return Err(OutputNameError::Symbol(index, c));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OutputName(String);

impl OutputName {
    pub fn is_default(&self) -> bool {
        self.0 == "out"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for OutputName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Default for OutputName {
    fn default() -> Self {
        OutputName("out".into())
    }
}

impl From<OutputName> for String {
    fn from(value: OutputName) -> Self {
        value.0
    }
}

impl TryFrom<String> for OutputName {
    type Error = OutputNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_name(&value)?;
        Ok(OutputName(value))
    }
}

#[cfg(any(test, feature = "test"))]
impl Arbitrary for OutputName {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            4 => Just(OutputName::default()),
            1 => "[a-z][a-z0-9]{0,10}".prop_map(OutputName),
        ]
        .boxed()
    }
}

impl FromStr for OutputName {
    type Err = OutputNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_name(s)?;
        Ok(OutputName(s.to_string()))
    }
}

/// Which outputs of a derivation a request is about.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutputSpec {
    All,
    Named(BTreeSet<OutputName>),
}

#[cfg(any(test, feature = "test"))]
impl Arbitrary for OutputSpec {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            Just(OutputSpec::All),
            proptest::collection::btree_set(any::<OutputName>(), 1..10)
                .prop_map(OutputSpec::Named),
        ]
        .boxed()
    }
}

impl fmt::Display for OutputSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputSpec::All => f.write_str("*")?,
            OutputSpec::Named(outputs) => {
                let mut it = outputs.iter();
                if let Some(output) = it.next() {
                    write!(f, "{}", output)?;
                    for output in it {
                        write!(f, ",{}", output)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl FromStr for OutputSpec {
    type Err = OutputNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "*" {
            Ok(OutputSpec::All)
        } else {
            let mut outputs = BTreeSet::new();
            for name in s.split(",") {
                let output = name.parse()?;
                outputs.insert(output);
            }
            Ok(OutputSpec::Named(outputs))
        }
    }
}
