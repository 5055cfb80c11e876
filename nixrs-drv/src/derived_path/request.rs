use std::fmt;
use std::str::FromStr;

#[cfg(any(test, feature = "test"))]
use test_strategy::Arbitrary;
use thiserror::Error;

use crate::store_path::{ParseStorePathError, StorePath};

use super::{OutputNameError, OutputSpec};

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ParseRequestError {
    #[error("{0}")]
    Path(
        #[from]
        #[source]
        ParseStorePathError,
    ),
    #[error("bad output selection in '{request}': {error}")]
    Outputs {
        request: String,
        #[source]
        error: OutputNameError,
    },
}

/// A derivation together with the outputs of it that are of interest.
///
/// Parsed from the legacy `/nix/store/...-foo.drv!out,dev` syntax. Without a
/// `!` suffix every output of the derivation is requested.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(any(test, feature = "test"), derive(Arbitrary))]
pub struct DerivationRequest {
    pub drv_path: StorePath,
    pub outputs: OutputSpec,
}

impl DerivationRequest {
    pub fn all(drv_path: StorePath) -> DerivationRequest {
        DerivationRequest {
            drv_path,
            outputs: OutputSpec::All,
        }
    }
}

impl fmt::Display for DerivationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outputs {
            OutputSpec::All => write!(f, "{}", self.drv_path),
            outputs => write!(f, "{}!{}", self.drv_path, outputs),
        }
    }
}

impl FromStr for DerivationRequest {
    type Err = ParseRequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once('!') {
            Some((path, outputs)) => {
                let drv_path = path.parse()?;
                let outputs = outputs
                    .parse()
                    .map_err(|error| ParseRequestError::Outputs {
                        request: s.to_owned(),
                        error,
                    })?;
                Ok(DerivationRequest { drv_path, outputs })
            }
            None => Ok(DerivationRequest::all(s.parse()?)),
        }
    }
}

#[cfg(test)]
mod unittests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("/store/xyz-bar.drv", "/store/xyz-bar.drv", OutputSpec::All)]
    #[case("/store/xyz-bar.drv!*", "/store/xyz-bar.drv", OutputSpec::All)]
    #[case("/store/xyz-bar.drv!out", "/store/xyz-bar.drv", OutputSpec::Named(BTreeSet::from(["out".parse().unwrap()])))]
    #[case("xyz-bar.drv!dev,out", "xyz-bar.drv", OutputSpec::Named(BTreeSet::from(["out".parse().unwrap(), "dev".parse().unwrap()])))]
    fn parse(#[case] value: &str, #[case] drv_path: &str, #[case] outputs: OutputSpec) {
        let actual: DerivationRequest = value.parse().unwrap();
        assert_eq!(actual.drv_path.as_str(), drv_path);
        assert_eq!(actual.outputs, outputs);
    }

    #[test]
    fn parse_bad_outputs() {
        let actual = "/store/xyz-bar.drv!".parse::<DerivationRequest>();
        assert_eq!(
            actual,
            Err(ParseRequestError::Outputs {
                request: "/store/xyz-bar.drv!".into(),
                error: OutputNameError::NameLength,
            })
        );
    }

    #[rstest]
    #[case("/store/xyz-bar.drv")]
    #[case("/store/xyz-bar.drv!dev,out")]
    fn display(#[case] value: &str) {
        let request: DerivationRequest = value.parse().unwrap();
        assert_eq!(request.to_string(), value);
    }

    proptest! {
        #[test]
        fn proptest_request_display_parse(request in any::<DerivationRequest>()) {
            let parsed = request.to_string().parse::<DerivationRequest>().unwrap();
            prop_assert_eq!(parsed, request);
        }
    }
}
