use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::entry::TextEntry;
use crate::parsers::placeholder;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AuditIssue {
    pub key: String,
    pub code: String,
    pub message: String,
}

fn issue(key: &str, code: &str, message: impl Into<String>) -> AuditIssue {
    AuditIssue {
        key: key.to_string(),
        code: code.to_string(),
        message: message.into(),
    }
}

pub fn run(entries: &[TextEntry]) -> Vec<AuditIssue> {
    let mut issues: Vec<AuditIssue> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for e in entries {
        let key = e.key.trim();

        if key.is_empty() {
            issues.push(issue(&e.key, "EMPTY_KEY", "Row without a key is ignored"));
            continue;
        }

        if !seen.insert(key) {
            issues.push(issue(key, "DUPLICATE_KEY", "Key appears more than once; the last row wins"));
        }

        if e.content_nl.trim().is_empty() {
            issues.push(issue(key, "EMPTY_NL", "Dutch text is empty"));
        }

        let en = e.content_en.as_deref().filter(|s| !s.trim().is_empty());
        if en.is_none() {
            issues.push(issue(key, "MISSING_EN", "No English text; Dutch is shown instead"));
        }

        let declared: HashSet<&str> = e.variables.iter().map(String::as_str).collect();
        let used_nl: BTreeSet<&str> = placeholder::names(&e.content_nl).into_iter().collect();
        let used_en: BTreeSet<&str> = en.map(placeholder::names).unwrap_or_default().into_iter().collect();

        for name in used_nl.union(&used_en) {
            if !declared.contains(name) {
                issues.push(issue(
                    key,
                    "UNDECLARED_PLACEHOLDER",
                    format!("{{{{{name}}}}} is not listed in variables and is never filled in"),
                ));
            }
        }

        for name in &e.variables {
            if !used_nl.contains(name.as_str()) && !used_en.contains(name.as_str()) {
                issues.push(issue(
                    key,
                    "UNUSED_VARIABLE",
                    format!("variable {name} is not used in any text"),
                ));
            }
        }

        if en.is_some() && used_nl != used_en {
            issues.push(issue(
                key,
                "PLACEHOLDER_MISMATCH",
                "Dutch and English texts use different placeholders",
            ));
        }
    }

    issues
}
