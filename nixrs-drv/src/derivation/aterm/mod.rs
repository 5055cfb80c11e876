//! Reading and writing the `Derive(...)` text form of derivations.
//!
//! The format is a nested literal: a tuple of seven positional fields made of
//! lists, tuples and double quoted strings.
//!
//! ```text
//! Derive([("out","/nix/store/...-foo","","")],   outputs
//!        [("/nix/store/...-bar.drv",["out"])],  input derivations
//!        ["/nix/store/...-builder.sh"],         input files
//!        "x86_64-linux",                        system
//!        "/nix/store/...-bash/bin/bash",        builder
//!        ["-e","builder.sh"],                   builder arguments
//!        [("name","foo")])                      environment
//! ```
use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::derived_path::{OutputName, OutputNameError};
use crate::store_path::{ParseStorePathError, StorePath};

use super::{Derivation, DerivationOutput, NAME_VAR};

mod print;
mod value;

pub use print::print_derivation;
pub use value::Value;

use value::Parser;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ParseError {
    #[error("derivation is not valid UTF-8 after byte {0}")]
    Utf8(usize),
    #[error("unexpected end of input at byte {0}")]
    UnexpectedEnd(usize),
    #[error("unexpected {found:?} at byte {position}, expected {expected}")]
    UnexpectedChar {
        position: usize,
        found: char,
        expected: &'static str,
    },
    #[error("values nested more than 256 deep at byte {position}")]
    TooDeep { position: usize },
    #[error("bad number '{text}' at byte {position}")]
    BadNumber { position: usize, text: String },
    #[error("unexpected input after derivation at byte {0}")]
    TrailingInput(usize),
    #[error("unknown tag '{0}', expected 'Derive'")]
    UnknownTag(String),
    #[error("derivation has {0} fields, expected 7")]
    FieldCount(usize),
    #[error("expected {expected} for {context}, found {found}")]
    Shape {
        context: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("expected {expected}-tuple for {context}, found {found}-tuple")]
    TupleLength {
        context: String,
        expected: usize,
        found: usize,
    },
    #[error("bad store path in {context}: {error}")]
    InvalidStorePath {
        context: String,
        #[source]
        error: ParseStorePathError,
    },
    #[error("bad output name '{name}' in {context}: {error}")]
    InvalidOutputName {
        context: String,
        name: String,
        #[source]
        error: OutputNameError,
    },
    #[error("duplicate key '{key}' in {context}")]
    DuplicateKey { context: &'static str, key: String },
    #[error("derivation has no 'name' in its environment")]
    MissingName,
}

/// A [`ParseError`] together with the derivation file it came from.
#[derive(Debug, Error, PartialEq, Clone)]
#[error("could not parse derivation '{path}': {error}")]
pub struct ParseDerivationError {
    pub path: StorePath,
    #[source]
    pub error: ParseError,
}

/// Parse the contents of the derivation file at `path`.
pub fn parse_derivation(text: &str, path: StorePath) -> Result<Derivation, ParseDerivationError> {
    match decode(text, path.clone()) {
        Ok(drv) => Ok(drv),
        Err(error) => Err(ParseDerivationError { path, error }),
    }
}

/// Like [`parse_derivation`] for raw file contents, which must be UTF-8.
pub fn parse_derivation_bytes(
    bytes: &[u8],
    path: StorePath,
) -> Result<Derivation, ParseDerivationError> {
    match std::str::from_utf8(bytes) {
        Ok(text) => parse_derivation(text, path),
        Err(err) => Err(ParseDerivationError {
            path,
            error: ParseError::Utf8(err.valid_up_to()),
        }),
    }
}

fn shape(context: impl Into<String>, expected: &'static str, found: &Value) -> ParseError {
    ParseError::Shape {
        context: context.into(),
        expected,
        found: found.kind(),
    }
}

fn list(value: Value, context: &str) -> Result<Vec<Value>, ParseError> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(shape(context, "list", &other)),
    }
}

fn tuple<const N: usize>(value: Value, context: &str) -> Result<[Value; N], ParseError> {
    match value {
        Value::Tuple(items) => items.try_into().map_err(|items: Vec<Value>| {
            ParseError::TupleLength {
                context: context.into(),
                expected: N,
                found: items.len(),
            }
        }),
        other => Err(shape(context, "tuple", &other)),
    }
}

fn string(value: Value, context: &str) -> Result<String, ParseError> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(shape(context, "string", &other)),
    }
}

fn strings(value: Value, context: &str) -> Result<Vec<String>, ParseError> {
    list(value, context)?
        .into_iter()
        .map(|item| string(item, context))
        .collect()
}

fn store_path(value: Value, context: &str) -> Result<StorePath, ParseError> {
    string(value, context)?
        .parse()
        .map_err(|error| ParseError::InvalidStorePath {
            context: context.into(),
            error,
        })
}

fn output_name(value: Value, context: &str) -> Result<OutputName, ParseError> {
    let name = string(value, context)?;
    name.parse().map_err(|error| ParseError::InvalidOutputName {
        context: context.into(),
        name,
        error,
    })
}

fn decode(text: &str, path: StorePath) -> Result<Derivation, ParseError> {
    let fields = Parser::new(text).parse_fields()?;
    let [
        outputs_v,
        input_drvs_v,
        input_files_v,
        system_v,
        builder_v,
        args_v,
        env_v,
    ]: [Value; 7] = fields
        .try_into()
        .map_err(|fields: Vec<Value>| ParseError::FieldCount(fields.len()))?;

    let mut outputs = BTreeMap::new();
    for item in list(outputs_v, "outputs")? {
        let [name, out_path, hash_algo, hash] = tuple(item, "output")?;
        let name = output_name(name, "output")?;
        let context = format!("output '{name}'");
        let output = DerivationOutput::from_parts(
            store_path(out_path, &context)?,
            string(hash_algo, &context)?,
            string(hash, &context)?,
        );
        if outputs.contains_key(&name) {
            return Err(ParseError::DuplicateKey {
                context: "outputs",
                key: name.to_string(),
            });
        }
        outputs.insert(name, output);
    }

    let mut input_derivations = BTreeMap::new();
    for item in list(input_drvs_v, "input derivations")? {
        let [drv_path, names] = tuple(item, "input derivation")?;
        let drv_path = store_path(drv_path, "input derivation")?;
        let context = format!("input derivation '{drv_path}'");
        let names = list(names, &context)?
            .into_iter()
            .map(|name| output_name(name, &context))
            .collect::<Result<BTreeSet<_>, _>>()?;
        if input_derivations.contains_key(&drv_path) {
            return Err(ParseError::DuplicateKey {
                context: "input derivations",
                key: drv_path.to_string(),
            });
        }
        input_derivations.insert(drv_path, names);
    }

    let input_files = list(input_files_v, "input files")?
        .into_iter()
        .map(|item| store_path(item, "input files"))
        .collect::<Result<_, _>>()?;

    let mut environment = BTreeMap::new();
    for item in list(env_v, "environment")? {
        let [key, value] = tuple(item, "environment")?;
        let key = string(key, "environment")?;
        let value = string(value, "environment")?;
        if environment.contains_key(&key) {
            return Err(ParseError::DuplicateKey {
                context: "environment",
                key,
            });
        }
        environment.insert(key, value);
    }
    if !environment.contains_key(NAME_VAR) {
        return Err(ParseError::MissingName);
    }

    Ok(Derivation {
        path,
        outputs,
        input_derivations,
        input_files,
        system: string(system_v, "system")?,
        builder: string(builder_v, "builder")?,
        builder_args: strings(args_v, "builder arguments")?,
        environment,
    })
}
