//! Turning analysis results into text for the terminal.
use std::collections::BTreeSet;

use nixrs_drv::derived_path::OutputName;
use nixrs_drv::diff::{DiffResult, DiffValue};
use nixrs_drv::preview::OutputsByDerivation;
use nixrs_drv::PreviewResult;
use nixrs_drv::store_path::StorePath;
use serde_json::Value;

use crate::error::CliError;

pub fn json(value: &Value, pretty: bool) -> Result<String, CliError> {
    if pretty {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(serde_json::to_string(value)?)
    }
}

/// Plain text for a string or a list of strings, one per line.
pub fn text(attribute: &str, value: &Value) -> Result<String, CliError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_owned))
            .collect::<Option<Vec<_>>>()
            .map(|lines| lines.join("\n"))
            .ok_or_else(|| CliError::NotText(attribute.into())),
        _ => Err(CliError::NotText(attribute.into())),
    }
}

/// Terminal text with every line ending in a newline.
fn lines(lines: impl IntoIterator<Item = String>) -> String {
    lines.into_iter().map(|line| line + "\n").collect()
}

pub fn paths<'p>(paths: impl IntoIterator<Item = &'p StorePath>) -> String {
    lines(paths.into_iter().map(StorePath::to_string))
}

fn join_names(names: &BTreeSet<OutputName>) -> String {
    names
        .iter()
        .map(OutputName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn diff_value(value: &DiffValue) -> Vec<String> {
    match value {
        DiffValue::Name(Some(name)) => vec![format!("  {name}")],
        DiffValue::Name(None) => vec!["  (no name)".into()],
        DiffValue::OutputNames(names) => names.iter().map(|name| format!("  {name}")).collect(),
        DiffValue::Paths(paths) => paths.iter().map(|path| format!("  {path}")).collect(),
        DiffValue::Environment(env) => env
            .iter()
            .map(|(key, value)| format!("  {key}={value:?}"))
            .collect(),
    }
}

pub fn diff(result: &DiffResult) -> String {
    match result {
        DiffResult::Equal => "equal\n".into(),
        DiffResult::Differs { field, left, right } => {
            let mut out = vec![format!("{field} differs:"), "Left:".into()];
            out.extend(diff_value(left));
            out.push("Right:".into());
            out.extend(diff_value(right));
            lines(out)
        }
    }
}

fn outputs_section(action: &str, outputs: &OutputsByDerivation) -> Vec<String> {
    if outputs.is_empty() {
        return Vec::new();
    }
    let entries = outputs
        .iter()
        .map(|(drv_path, names)| format!("  {drv_path} -> {}", join_names(names)));
    std::iter::once(format!("These derivation outputs {action}:"))
        .chain(entries)
        .collect()
}

pub fn preview(result: &PreviewResult, show_existing: bool) -> String {
    let mut out = outputs_section("need to be built", &result.needed);
    out.extend(outputs_section("will be fetched", &result.fetchable));
    if show_existing {
        out.extend(outputs_section("already exist", &result.existing));
    }
    lines(out)
}

pub fn preview_json(result: &PreviewResult, show_existing: bool) -> Result<Value, CliError> {
    let mut value = serde_json::to_value(result)?;
    if !show_existing {
        if let Value::Object(map) = &mut value {
            map.remove("existing");
        }
    }
    Ok(value)
}

#[cfg(test)]
mod unittests {
    use std::collections::BTreeMap;

    use nixrs_drv::diff::DiffField;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case(json!("x86_64-linux"), "x86_64-linux")]
    #[case(json!(["-e", "build.sh"]), "-e\nbuild.sh")]
    #[case(json!([]), "")]
    fn text_ok(#[case] value: Value, #[case] expected: &str) {
        assert_eq!(text("attr", &value).unwrap(), expected);
    }

    #[rstest]
    #[case(json!({"name": "foo"}))]
    #[case(json!(["a", 1]))]
    #[case(json!(null))]
    fn text_err(#[case] value: Value) {
        assert!(matches!(text("attr", &value), Err(CliError::NotText(a)) if a == "attr"));
    }

    #[test]
    fn diff_equal() {
        assert_eq!(diff(&DiffResult::Equal), "equal\n");
    }

    #[test]
    fn diff_differs() {
        let result = DiffResult::Differs {
            field: DiffField::InputFiles,
            left: DiffValue::Paths(BTreeSet::from(["/store/a-x".parse().unwrap()])),
            right: DiffValue::Paths(BTreeSet::new()),
        };
        assert_eq!(diff(&result), "input files differs:\nLeft:\n  /store/a-x\nRight:\n");
    }

    #[test]
    fn diff_environment() {
        let result = DiffResult::Differs {
            field: DiffField::Environment,
            left: DiffValue::Environment(BTreeMap::from([("src".into(), "a b".into())])),
            right: DiffValue::Environment(BTreeMap::new()),
        };
        assert_eq!(
            diff(&result),
            "environment differs:\nLeft:\n  src=\"a b\"\nRight:\n"
        );
    }

    #[rstest]
    #[case::name(DiffValue::Name(Some("foo".into())), DiffValue::Name(None), "name differs:\nLeft:\n  foo\nRight:\n  (no name)\n")]
    #[case::outputs(
        DiffValue::OutputNames(BTreeSet::from(["dev".parse().unwrap(), "out".parse().unwrap()])),
        DiffValue::OutputNames(BTreeSet::from(["out".parse().unwrap()])),
        "output names differs:\nLeft:\n  dev\n  out\nRight:\n  out\n"
    )]
    fn diff_lines(#[case] left: DiffValue, #[case] right: DiffValue, #[case] expected: &str) {
        let field = match left {
            DiffValue::Name(_) => DiffField::Name,
            _ => DiffField::OutputNames,
        };
        assert_eq!(diff(&DiffResult::Differs { field, left, right }), expected);
    }

    #[test]
    fn paths_one_per_line() {
        let a: StorePath = "/store/a-x".parse().unwrap();
        let b: StorePath = "/store/b-y".parse().unwrap();
        assert_eq!(paths([&a, &b]), "/store/a-x\n/store/b-y\n");
        assert_eq!(paths(&BTreeSet::new()), "");
    }

    fn preview_result() -> PreviewResult {
        let foo: StorePath = "/store/abc-foo.drv".parse().unwrap();
        let bar: StorePath = "/store/xyz-bar.drv".parse().unwrap();
        let out: OutputName = "out".parse().unwrap();
        let dev: OutputName = "dev".parse().unwrap();
        PreviewResult {
            needed: BTreeMap::from([(foo.clone(), BTreeSet::from([out.clone(), dev]))]),
            fetchable: BTreeMap::from([(bar, BTreeSet::from([out.clone()]))]),
            existing: BTreeMap::from([(
                "/store/def-baz.drv".parse().unwrap(),
                BTreeSet::from([out]),
            )]),
            probe_errors: Vec::new(),
        }
    }

    #[test]
    fn preview_text() {
        let result = preview_result();
        assert_eq!(
            preview(&result, false),
            "These derivation outputs need to be built:\n  /store/abc-foo.drv -> dev, out\n\
             These derivation outputs will be fetched:\n  /store/xyz-bar.drv -> out\n"
        );
        assert!(preview(&result, true).ends_with(
            "These derivation outputs already exist:\n  /store/def-baz.drv -> out\n"
        ));
        assert_eq!(preview(&PreviewResult::default(), true), "");
    }

    #[test]
    fn preview_as_json() {
        let value = preview_json(&preview_result(), false).unwrap();
        assert_eq!(
            value,
            json!({
                "needed": {"/store/abc-foo.drv": ["dev", "out"]},
                "fetchable": {"/store/xyz-bar.drv": ["out"]},
            })
        );
    }
}
