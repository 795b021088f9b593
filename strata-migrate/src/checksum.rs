//! Checksum computation for migration scripts.
//!
//! Checksums detect drift between a script on disk and the version of it
//! that was applied. They are CRC32 values computed over the line content
//! of a script (line terminators excluded), so the same script checked out
//! with LF or CRLF endings produces the same value.

use std::collections::HashMap;

/// Compute the CRC32 checksum of one textual resource.
pub fn checksum(text: &str) -> i32 {
    checksum_all(std::iter::once(text))
}

/// Compute one combined CRC32 checksum over several resources in order.
///
/// Used when a single logical migration maps to multiple physical files.
/// Order-sensitive and deterministic.
pub fn checksum_all<'a>(resources: impl IntoIterator<Item = &'a str>) -> i32 {
    let mut hasher = crc32fast::Hasher::new();
    for text in resources {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        for line in text.lines() {
            hasher.update(line.trim_end_matches('\r').as_bytes());
        }
    }
    hasher.finalize() as i32
}

/// Replace `${key}` placeholders in script text.
///
/// Only configured keys are replaced; unknown placeholders pass through
/// untouched. Whether replacement applies to checksum computation is a
/// configuration switch threaded through the SQL resolver, not a variant of
/// the checksum algorithm.
pub fn apply_placeholders(text: &str, placeholders: &HashMap<String, String>) -> String {
    if placeholders.is_empty() {
        return text.to_string();
    }
    let mut out = text.to_string();
    for (key, value) in placeholders {
        out = out.replace(&format!("${{{key}}}"), value);
    }
    out
}
