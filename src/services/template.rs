use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::parsers::placeholder;

/// A substitution value: text or a number, stringified without formatting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for VarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarValue::Int(n) => write!(f, "{n}"),
            VarValue::Float(x) if x.is_infinite() => {
                f.write_str(if *x > 0.0 { "Infinity" } else { "-Infinity" })
            }
            VarValue::Float(x) => write_float(f, *x),
            VarValue::Text(s) => f.write_str(s),
        }
    }
}

// Shortest round-trip digits. Zero has no sign, and magnitudes outside
// [1e-6, 1e21) use exponent notation with an explicit sign (`1e+21`, `1e-7`).
fn write_float(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    if x == 0.0 {
        return f.write_str("0");
    }

    let magnitude = x.abs();
    if !(1e-6..1e21).contains(&magnitude) && magnitude.is_finite() {
        let exp = format!("{x:e}");
        return match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => {
                write!(f, "{mantissa}e+{power}")
            }
            _ => f.write_str(&exp),
        };
    }

    write!(f, "{x}")
}

impl From<&str> for VarValue {
    fn from(value: &str) -> Self {
        VarValue::Text(value.to_string())
    }
}

impl From<String> for VarValue {
    fn from(value: String) -> Self {
        VarValue::Text(value)
    }
}

impl From<i64> for VarValue {
    fn from(value: i64) -> Self {
        VarValue::Int(value)
    }
}

impl From<i32> for VarValue {
    fn from(value: i32) -> Self {
        VarValue::Int(value.into())
    }
}

impl From<u32> for VarValue {
    fn from(value: u32) -> Self {
        VarValue::Int(value.into())
    }
}

impl From<f64> for VarValue {
    fn from(value: f64) -> Self {
        VarValue::Float(value)
    }
}

/// Ordered so two maps with the same pairs compare equal regardless of
/// insertion order.
pub type Variables = BTreeMap<String, VarValue>;

pub fn variables<I, K, V>(pairs: I) -> Variables
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<VarValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Fills `{{name}}` placeholders in a single pass.
///
/// A placeholder is replaced only when `name` is listed in `declared` and
/// present in `vars`. Everything else, including undeclared names, stays in
/// the output literally. Substituted values are not scanned again.
pub fn render(text: &str, declared: &[String], vars: &Variables) -> String {
    if declared.is_empty() || vars.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;

    for p in placeholder::scan(text) {
        let value = declared
            .iter()
            .any(|d| d == p.name)
            .then(|| vars.get(p.name))
            .flatten();

        if let Some(value) = value {
            out.push_str(&text[cursor..p.start]);
            out.push_str(&value.to_string());
            cursor = p.end;
        }
    }

    out.push_str(&text[cursor..]);
    out
}
