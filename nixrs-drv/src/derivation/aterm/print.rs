use crate::derivation::Derivation;

fn write_str(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn write_list<I, F>(out: &mut String, items: I, mut write_item: F)
where
    I: IntoIterator,
    F: FnMut(&mut String, I::Item),
{
    out.push('[');
    for (index, item) in items.into_iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        write_item(out, item);
    }
    out.push(']');
}

fn write_strs<I, S>(out: &mut String, items: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    write_list(out, items, |out, s| write_str(out, s.as_ref()));
}

pub fn print_derivation(drv: &Derivation) -> String {
    let mut out = String::with_capacity(1024);
    out.push_str("Derive(");
    write_list(&mut out, &drv.outputs, |out, (name, output)| {
        let (hash_algo, hash) = output.hash_fields();
        out.push('(');
        write_str(out, name.as_str());
        out.push(',');
        write_str(out, output.path().as_str());
        out.push(',');
        write_str(out, hash_algo);
        out.push(',');
        write_str(out, hash);
        out.push(')');
    });
    out.push(',');
    write_list(&mut out, &drv.input_derivations, |out, (path, outputs)| {
        out.push('(');
        write_str(out, path.as_str());
        out.push(',');
        write_strs(out, outputs);
        out.push(')');
    });
    out.push(',');
    write_strs(&mut out, &drv.input_files);
    out.push(',');
    write_str(&mut out, &drv.system);
    out.push(',');
    write_str(&mut out, &drv.builder);
    out.push(',');
    write_strs(&mut out, &drv.builder_args);
    out.push(',');
    write_list(&mut out, &drv.environment, |out, (key, value)| {
        out.push('(');
        write_str(out, key);
        out.push(',');
        write_str(out, value);
        out.push(')');
    });
    out.push(')');
    out
}
