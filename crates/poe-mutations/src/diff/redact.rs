//! Secret redaction for diff output
//!
//! Structured content is parsed to find values under sensitive keys; those
//! values are then masked in the raw text so the layout of the diff is
//! unchanged. A regex pass masks keys embedded in shell snippets and
//! headers (`echo <key>`, `Bearer <key>`, `--api-key <key>`, `X_API_KEY=<key>`).

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::format::FormatKind;

/// Replacement for redacted secrets
pub const REDACTED: &str = "<redacted>";

/// Secrets shorter than this are left alone to keep diffs readable
const MIN_SECRET_LEN: usize = 4;

const SENSITIVE_SUFFIXES: [&str; 4] = ["apikey", "token", "secret", "password"];

/// Redact secrets in `content`
///
/// With a `format`, content that parses is scanned structurally first.
/// Unparsable or plain-text content only gets the inline pass.
#[must_use]
pub fn redact(content: &str, format: Option<FormatKind>) -> String {
    let mut text = content.to_string();

    if let Some(document) = format.and_then(|kind| kind.handler().parse(content).ok()) {
        let mut secrets = Vec::new();
        for (key, value) in &document {
            collect_secrets(key, value, &mut secrets);
        }
        let mut forms: Vec<String> = secrets.iter().map(String::as_str).flat_map(encoded_forms).collect();
        forms.sort_by_key(|s| std::cmp::Reverse(s.len()));
        forms.dedup();
        for form in forms {
            text = text.replace(form.as_str(), REDACTED);
        }
    }

    redact_inline(&text)
}

/// Mask keys embedded in shell snippets and auth headers
#[must_use]
pub fn redact_inline(text: &str) -> String {
    inline_patterns()
        .iter()
        .fold(text.to_string(), |acc, (pattern, replacement)| {
            pattern.replace_all(&acc, *replacement).into_owned()
        })
}

/// Whether a key names a secret (`apiKey`, `POE_API_KEY`, `auth_token`, ...)
#[must_use]
pub fn is_sensitive_key(key: &str) -> bool {
    let normalized: String = key
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .collect::<String>()
        .to_ascii_lowercase();
    normalized == "authorization"
        || SENSITIVE_SUFFIXES
            .iter()
            .any(|suffix| normalized.ends_with(suffix))
}

/// The secret as parsed plus its quoted-string escaping (`\"`, `\\`, `\n`),
/// which JSON and TOML basic strings share
fn encoded_forms(secret: &str) -> Vec<String> {
    let mut forms = vec![secret.to_string()];
    if let Ok(quoted) = serde_json::to_string(secret) {
        let escaped = &quoted[1..quoted.len() - 1];
        if escaped != secret {
            forms.push(escaped.to_string());
        }
    }
    forms
}

fn collect_secrets(key: &str, value: &Value, secrets: &mut Vec<String>) {
    if is_sensitive_key(key) {
        collect_strings(value, secrets);
        return;
    }
    match value {
        Value::Object(map) => {
            for (child_key, child) in map {
                collect_secrets(child_key, child, secrets);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_secrets(key, item, secrets);
            }
        }
        _ => {}
    }
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) if s.len() >= MIN_SECRET_LEN && s != REDACTED => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|item| collect_strings(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect_strings(item, out)),
        _ => {}
    }
}

fn inline_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"(?i)(bearer\s+)[A-Za-z0-9._~+/=-]{8,}", "${1}<redacted>"),
            (r#"(?i)(--api-key[=\s]+)(["']?)[^\s"']+"#, "${1}${2}<redacted>"),
            (
                r#"\b([A-Za-z0-9_]*(?:API_KEY|TOKEN|SECRET))=(["']?)[^\s"']+"#,
                "${1}=${2}<redacted>",
            ),
            (r#"(\becho\s+)(["']?)[A-Za-z0-9._-]{12,}"#, "${1}${2}<redacted>"),
            (r"\bsk-[A-Za-z0-9_-]{8,}", "<redacted>"),
        ]
        .into_iter()
        .filter_map(|(pattern, replacement)| Some((Regex::new(pattern).ok()?, replacement)))
        .collect()
    })
}
