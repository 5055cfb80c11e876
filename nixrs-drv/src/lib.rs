// SPDX-FileCopyrightText: 2024 griff
//
// SPDX-License-Identifier: EUPL-1.2 or MIT

//! Reading Nix derivation files and answering questions about them: what a
//! derivation needs to build, how two derivations differ and which of their
//! outputs would have to be built, fetched or are already there.

pub mod cache;
pub mod closure;
pub mod derivation;
pub mod derived_path;
pub mod diff;
mod error;
pub mod local;
pub mod preview;
pub mod settings;
pub mod store;
pub mod store_path;
#[cfg(any(test, feature = "test"))]
pub mod test;

pub use closure::Resolver;
pub use derivation::Derivation;
pub use diff::{DiffResult, diff};
pub use error::{Error, Result};
pub use preview::{Classifier, PreviewResult};
pub use settings::Settings;
pub use store::DerivationStore;
