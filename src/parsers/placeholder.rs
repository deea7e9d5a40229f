use std::sync::OnceLock;

use regex::Regex;

/// A `{{name}}` token found in a text, with its byte span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder<'a> {
    pub name: &'a str,
    pub start: usize,
    pub end: usize,
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // The name is everything between the braces, verbatim; `{{ name }}` is a
    // different token than `{{name}}`.
    RE.get_or_init(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("placeholder pattern compiles"))
}

pub fn scan(text: &str) -> Vec<Placeholder<'_>> {
    placeholder_re()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            Some(Placeholder {
                name: name.as_str(),
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

/// Distinct placeholder names in order of first appearance.
pub fn names(text: &str) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    for p in scan(text) {
        if !out.contains(&p.name) {
            out.push(p.name);
        }
    }
    out
}
