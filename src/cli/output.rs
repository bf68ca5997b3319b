use crate::cli::args::OutputFormat;
use crate::deps::{AttrValue, Rule};
use std::fmt::Write;

pub struct OutputFormatter {
    format: OutputFormat,
}

/// Quote `value` as a Starlark string literal.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn format_value(value: &AttrValue) -> String {
    match value {
        AttrValue::String(s) => quote(s),
        AttrValue::List(items) => {
            let items: Vec<String> = items.iter().map(|s| quote(s)).collect();
            format!("[{}]", items.join(", "))
        }
    }
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_rules(&self, rules: &[Rule]) -> String {
        match self.format {
            OutputFormat::Starlark => Self::format_starlark(rules),
            OutputFormat::Json => Self::format_json(rules),
        }
    }

    fn format_starlark(rules: &[Rule]) -> String {
        let mut output = String::new();
        for (i, rule) in rules.iter().enumerate() {
            if i > 0 {
                output.push('\n');
            }
            let _ = writeln!(output, "{}(", rule.kind);
            let _ = writeln!(output, "    name = {},", quote(&rule.name));
            for (key, value) in rule.attrs() {
                let _ = writeln!(output, "    {key} = {},", format_value(value));
            }
            output.push_str(")\n");
        }
        output
    }

    fn format_json(rules: &[Rule]) -> String {
        serde_json::to_string_pretty(rules).unwrap_or_else(|_| "[]".to_string())
    }
}
