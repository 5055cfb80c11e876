use std::io::Write as _;

use clap::Args as OtherArgs;
use nixrs_drv::Derivation;
use nixrs_drv::derived_path::DerivationRequest;
use serde_json::Value;

use crate::error::CliError;
use crate::render;

#[derive(Clone, OtherArgs)]
pub struct Args {
    /// Derivation to show. A `!outputs` suffix is ignored.
    derivation: DerivationRequest,

    /// Print JSON instead of plain text.
    #[arg(long)]
    json: bool,

    /// Pretty print JSON.
    #[arg(short, long)]
    pretty: bool,

    /// Only show this attribute.
    #[arg(short = 'A', long, conflicts_with_all = ["env_var", "output"])]
    attribute: Option<String>,

    /// Only show this environment variable.
    #[arg(short, long, conflicts_with = "output")]
    env_var: Option<String>,

    /// Only show the path of this output.
    #[arg(short, long)]
    output: Option<String>,
}

type Accessor = fn(&Derivation) -> serde_json::Result<Value>;

/// Attributes that can be picked out with `-A`.
const ATTRIBUTES: &[(&str, Accessor)] = &[
    ("path", |drv| serde_json::to_value(&drv.path)),
    ("name", |drv| serde_json::to_value(drv.name())),
    ("outputs", |drv| serde_json::to_value(&drv.outputs)),
    ("output_names", |drv| serde_json::to_value(drv.output_names())),
    ("output_paths", |drv| serde_json::to_value(drv.output_paths())),
    ("input_derivations", |drv| {
        serde_json::to_value(&drv.input_derivations)
    }),
    ("input_derivation_paths", |drv| {
        serde_json::to_value(drv.input_derivation_paths())
    }),
    ("input_files", |drv| serde_json::to_value(&drv.input_files)),
    ("system", |drv| serde_json::to_value(&drv.system)),
    ("builder", |drv| serde_json::to_value(&drv.builder)),
    ("builder_args", |drv| serde_json::to_value(&drv.builder_args)),
    ("environment", |drv| serde_json::to_value(&drv.environment)),
];

pub fn attribute(drv: &Derivation, name: &str) -> Result<Value, CliError> {
    let accessor = ATTRIBUTES
        .iter()
        .find(|(attr, _)| *attr == name)
        .map(|(_, accessor)| accessor)
        .ok_or_else(|| {
            let known: Vec<_> = ATTRIBUTES.iter().map(|(attr, _)| *attr).collect();
            CliError::UnknownAttribute(name.into(), known.join(", "))
        })?;
    Ok(accessor(drv)?)
}

/// What `show` prints for `drv`.
pub fn render(drv: &Derivation, args: &Args) -> Result<String, CliError> {
    let (label, value) = if let Some(name) = &args.attribute {
        (name.as_str(), attribute(drv, name)?)
    } else if let Some(var) = &args.env_var {
        let value = drv
            .environment
            .get(var)
            .ok_or_else(|| CliError::UnknownEnvVar(var.clone()))?;
        (var.as_str(), Value::String(value.clone()))
    } else if let Some(output) = &args.output {
        let path = output
            .parse()
            .ok()
            .and_then(|name| drv.output_path(&name))
            .ok_or_else(|| CliError::UnknownOutput(output.clone()))?;
        (output.as_str(), Value::String(path.to_string()))
    } else {
        return render::json(&serde_json::to_value(drv)?, args.pretty);
    };
    if args.json {
        render::json(&value, args.pretty)
    } else {
        render::text(label, &value)
    }
}

pub async fn run_command(app: crate::App, args: Args) -> Result<(), CliError> {
    let settings = app.settings()?;
    let store = app.store(&settings);
    let drv = store.load(&args.derivation.drv_path).await?;
    let text = render(&drv, &args)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{text}")?;
    Ok(())
}

#[cfg(test)]
mod unittests {
    use std::collections::{BTreeMap, BTreeSet};

    use nixrs_drv::derivation::DerivationOutput;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn foo() -> Derivation {
        Derivation {
            path: "/store/abc-foo.drv".parse().unwrap(),
            outputs: BTreeMap::from([
                (
                    "out".parse().unwrap(),
                    DerivationOutput::Plain("/store/abc-foo".parse().unwrap()),
                ),
                (
                    "dev".parse().unwrap(),
                    DerivationOutput::Plain("/store/abc-foo-dev".parse().unwrap()),
                ),
            ]),
            input_derivations: BTreeMap::from([(
                "/store/xyz-bar.drv".parse().unwrap(),
                BTreeSet::from(["out".parse().unwrap()]),
            )]),
            input_files: BTreeSet::from(["/store/def-baz".parse().unwrap()]),
            system: "x86_64-linux".into(),
            builder: "/store/sh-bash".into(),
            builder_args: vec!["-e".into(), "build.sh".into()],
            environment: BTreeMap::from([("name".into(), "foo".into())]),
        }
    }

    fn args(extra: &[&str]) -> Args {
        #[derive(clap::Parser)]
        struct Cli {
            #[command(flatten)]
            args: Args,
        }
        let mut argv = vec!["show", "/store/abc-foo.drv!out"];
        argv.extend_from_slice(extra);
        <Cli as clap::Parser>::parse_from(argv).args
    }

    #[rstest]
    #[case::name(&["-A", "name"], "foo")]
    #[case::system(&["-A", "system"], "x86_64-linux")]
    #[case::args(&["-A", "builder_args"], "-e\nbuild.sh")]
    #[case::output_names(&["-A", "output_names"], "dev\nout")]
    #[case::input_files(&["-A", "input_files", "--json"], r#"["/store/def-baz"]"#)]
    #[case::output_paths(&["-A", "output_paths", "--json"], r#"{"dev":"/store/abc-foo-dev","out":"/store/abc-foo"}"#)]
    #[case::env_var(&["-e", "name"], "foo")]
    #[case::env_var_json(&["-e", "name", "--json"], r#""foo""#)]
    #[case::output(&["-o", "dev"], "/store/abc-foo-dev")]
    fn show(#[case] extra: &[&str], #[case] expected: &str) {
        assert_eq!(render(&foo(), &args(extra)).unwrap(), expected);
    }

    #[test]
    fn show_whole_derivation() {
        let text = render(&foo(), &args(&[])).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["path"], "/store/abc-foo.drv");
        assert_eq!(value["environment"]["name"], "foo");
        assert_eq!(value["inputDerivations"]["/store/xyz-bar.drv"][0], "out");
    }

    #[rstest]
    #[case::unknown_attribute(&["-A", "colour"])]
    #[case::map_as_text(&["-A", "environment"])]
    #[case::unknown_env_var(&["-e", "src"])]
    #[case::unknown_output(&["-o", "lib"])]
    fn show_error(#[case] extra: &[&str]) {
        assert!(render(&foo(), &args(extra)).is_err());
    }

    #[test]
    fn every_attribute_renders() {
        for (name, _) in ATTRIBUTES {
            attribute(&foo(), name).unwrap();
        }
    }
}
