//! Field fingerprints.
//!
//! A fingerprint identifies a form field across repeated scrapes of the same
//! page. It is derived from the field's label, type and option list only, so
//! it survives DOM re-renders that change ids, positions or selectors. The
//! mapping service computes the same value server-side; both sides must agree
//! byte for byte.

use std::fmt::Write as _;

use serde::Serialize;
use sha2::{Digest, Sha256};

use jobfill_protocols::FieldDescriptor;

/// Hex characters kept from the SHA-256 digest.
const FINGERPRINT_LEN: usize = 32;

/// Canonical payload. Field order is alphabetical, which is what the
/// server's `sort_keys=True` produces.
#[derive(Serialize)]
struct Canonical<'a> {
    label: String,
    options: Vec<String>,
    #[serde(rename = "type")]
    field_type: &'a str,
}

/// Lowercase, replace everything outside `[a-z0-9 ]` with a space, collapse
/// runs of whitespace.
pub fn normalize_label(text: &str) -> String {
    let replaced: String = text
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == ' ' {
                c
            } else {
                ' '
            }
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fingerprint of one scraped field.
pub fn compute_fingerprint(field: &FieldDescriptor) -> String {
    // First non-empty raw value wins, even if it normalizes to nothing.
    let label = [&field.label, &field.placeholder, &field.name]
        .into_iter()
        .filter_map(|s| s.as_deref())
        .find(|s| !s.is_empty())
        .unwrap_or("");

    let field_type = field.field_type.to_lowercase();
    let mut options: Vec<String> = field.options.iter().map(|o| normalize_label(o)).collect();
    options.sort();

    let canonical = Canonical {
        label: normalize_label(label),
        options,
        field_type: field_type.trim(),
    };
    // Serializing strings and string lists cannot fail.
    let payload = serde_json::to_string(&canonical).unwrap_or_default();

    let digest = Sha256::digest(ascii_escaped(&payload).as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(FINGERPRINT_LEN);
    hex
}

/// Fill in fingerprints the scraper did not provide.
///
/// Returns how many fields were updated.
pub fn ensure_fingerprints(fields: &mut [FieldDescriptor]) -> usize {
    let mut computed = 0;
    for field in fields.iter_mut().filter(|f| f.fingerprint.trim().is_empty()) {
        field.fingerprint = compute_fingerprint(field);
        computed += 1;
    }
    computed
}

/// Escape non-ASCII characters as `\uXXXX` UTF-16 units, the way the server's
/// JSON encoder does.
fn ascii_escaped(json: &str) -> String {
    if json.is_ascii() {
        return json.to_string();
    }
    let mut out = String::with_capacity(json.len() + 16);
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                let _ = write!(out, "\\u{:04x}", unit);
            }
        }
    }
    out
}
