mod output_spec;
mod request;

pub use output_spec::{OutputName, OutputNameError, OutputSpec};
pub use request::{DerivationRequest, ParseRequestError};
