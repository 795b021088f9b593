//! Migration version parsing and ordering.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::{MigrateResult, MigrationError};

/// One dot-separated component of a version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum VersionPart {
    /// Purely numeric component, compared numerically.
    Number(u64),
    /// Anything else, compared lexically. Numeric components sort before
    /// textual ones.
    Text(String),
}

impl VersionPart {
    fn is_zero(&self) -> bool {
        matches!(self, Self::Number(0))
    }
}

impl Ord for VersionPart {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for VersionPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An ordered migration version such as `1`, `2.1` or `2024.01.15`.
///
/// Parsed from a dot-separated string (filenames use underscores, which the
/// name parser maps to dots before this type sees them). Comparison is
/// component-wise; missing trailing components count as zero, so `1` and
/// `1.0` compare equal while `1 < 1.1 < 1.1.1`. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct MigrationVersion {
    /// Display form, dots included, as parsed.
    raw: String,
    /// Components with trailing zero components stripped, so that `1` and
    /// `1.0` share one canonical representation.
    parts: Vec<VersionPart>,
}

impl MigrationVersion {
    /// Parse a version string. Underscores are accepted as component
    /// separators and normalized to dots.
    ///
    /// A version starting with a dot is invalid, as are empty components
    /// and all-digit components larger than `u64::MAX`.
    pub fn parse(raw: &str) -> MigrateResult<Self> {
        let normalized = raw.replace('_', ".");

        if normalized.is_empty() {
            return Err(MigrationError::invalid_version(raw, "version is empty"));
        }
        if normalized.starts_with('.') {
            return Err(MigrationError::invalid_version(
                raw,
                "version must not start with a dot",
            ));
        }

        let mut parts = Vec::new();
        for component in normalized.split('.') {
            if component.is_empty() {
                return Err(MigrationError::invalid_version(
                    raw,
                    "version contains an empty component",
                ));
            }
            if !component
                .chars()
                .all(|c| c.is_ascii_alphanumeric())
            {
                return Err(MigrationError::invalid_version(
                    raw,
                    format!("invalid characters in component '{component}'"),
                ));
            }
            match component.parse::<u64>() {
                Ok(n) => parts.push(VersionPart::Number(n)),
                // All-digit components must stay numeric; letting an
                // over-range one degrade to text would make it sort after
                // every number.
                Err(_) if component.bytes().all(|b| b.is_ascii_digit()) => {
                    return Err(MigrationError::invalid_version(
                        raw,
                        format!("numeric component '{component}' is out of range"),
                    ));
                }
                Err(_) => parts.push(VersionPart::Text(component.to_ascii_uppercase())),
            }
        }

        while parts.last().is_some_and(VersionPart::is_zero) {
            parts.pop();
        }

        Ok(Self {
            raw: normalized,
            parts,
        })
    }
}

impl fmt::Display for MigrationVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for MigrationVersion {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialEq for MigrationVersion {
    fn eq(&self, other: &Self) -> bool {
        self.parts == other.parts
    }
}

impl Eq for MigrationVersion {}

impl Hash for MigrationVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.parts.hash(state);
    }
}

impl Ord for MigrationVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.parts.iter().zip(other.parts.iter()) {
            match a.cmp(b) {
                Ordering::Equal => {}
                non_equal => return non_equal,
            }
        }
        // Trailing zeros are already stripped, so any remaining component
        // makes the longer version the greater one.
        self.parts.len().cmp(&other.parts.len())
    }
}

impl PartialOrd for MigrationVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
