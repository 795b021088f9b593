//! Migration filename parsing.
//!
//! Migration scripts follow the convention
//! `<prefix><version>__<description>.<suffix>`, e.g. `V1_2__Add_users.sql`
//! or `R__Refresh_view.sql`. Filenames that do not parse are filtered out
//! by the resolvers, never fatal.

use std::fmt;

use crate::version::MigrationVersion;

/// The migration category a filename prefix selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamePrefix {
    /// Versioned migration, applied at most once.
    Versioned,
    /// Undo migration for a versioned migration.
    Undo,
    /// Repeatable migration, re-applied whenever its checksum changes.
    Repeatable,
}

impl fmt::Display for NamePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Versioned => f.write_str("versioned"),
            Self::Undo => f.write_str("undo"),
            Self::Repeatable => f.write_str("repeatable"),
        }
    }
}

/// A parsed migration filename.
#[derive(Debug, Clone)]
pub struct ResourceName {
    /// The prefix kind, when the name parsed.
    pub prefix: Option<NamePrefix>,
    /// The version (absent for repeatable migrations).
    pub version: Option<MigrationVersion>,
    /// The description, underscores mapped to spaces. May be empty.
    pub description: String,
    /// The matched suffix, including the dot.
    pub suffix: String,
    failure: Option<String>,
}

impl ResourceName {
    fn invalid(reason: impl Into<String>) -> Self {
        Self {
            prefix: None,
            version: None,
            description: String::new(),
            suffix: String::new(),
            failure: Some(reason.into()),
        }
    }

    /// Whether the filename parsed as a migration name.
    pub fn is_valid(&self) -> bool {
        self.failure.is_none()
    }

    /// Why the filename did not parse, if it did not.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }
}

/// Parses filenames against configured prefixes and suffixes.
#[derive(Debug, Clone)]
pub struct ResourceNameParser {
    versioned_prefix: String,
    undo_prefix: String,
    repeatable_prefix: String,
    separator: String,
    suffixes: Vec<String>,
}

impl Default for ResourceNameParser {
    fn default() -> Self {
        Self {
            versioned_prefix: "V".to_string(),
            undo_prefix: "U".to_string(),
            repeatable_prefix: "R".to_string(),
            separator: "__".to_string(),
            suffixes: vec![".sql".to_string()],
        }
    }
}

impl ResourceNameParser {
    /// Create a parser with the default `V`/`U`/`R` prefixes and `.sql`
    /// suffix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the versioned prefix.
    pub fn versioned_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.versioned_prefix = prefix.into();
        self
    }

    /// Override the repeatable prefix.
    pub fn repeatable_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.repeatable_prefix = prefix.into();
        self
    }

    /// Override the undo prefix.
    pub fn undo_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.undo_prefix = prefix.into();
        self
    }

    /// Override the accepted suffixes.
    pub fn suffixes(mut self, suffixes: Vec<String>) -> Self {
        self.suffixes = suffixes;
        self
    }

    /// Parse a filename into its name parts.
    pub fn parse(&self, filename: &str) -> ResourceName {
        let Some(suffix) = self
            .suffixes
            .iter()
            .find(|s| filename.len() > s.len() && filename.ends_with(s.as_str()))
        else {
            return ResourceName::invalid(format!(
                "filename '{filename}' does not end with a configured suffix ({})",
                self.suffixes.join(", ")
            ));
        };
        let stem = &filename[..filename.len() - suffix.len()];

        // Longest prefix wins, so a custom multi-character prefix is never
        // shadowed by a single-character one.
        let mut prefixes = [
            (NamePrefix::Versioned, self.versioned_prefix.as_str()),
            (NamePrefix::Undo, self.undo_prefix.as_str()),
            (NamePrefix::Repeatable, self.repeatable_prefix.as_str()),
        ];
        prefixes.sort_by_key(|(_, p)| std::cmp::Reverse(p.len()));

        let Some((kind, prefix)) = prefixes
            .iter()
            .find(|(_, p)| !p.is_empty() && stem.starts_with(p))
            .copied()
        else {
            return ResourceName::invalid(format!(
                "filename '{filename}' does not start with a configured prefix"
            ));
        };

        let rest = &stem[prefix.len()..];
        let (version_part, description_part) = match rest.find(self.separator.as_str()) {
            Some(idx) => (&rest[..idx], &rest[idx + self.separator.len()..]),
            None => (rest, ""),
        };

        let version = match kind {
            NamePrefix::Versioned | NamePrefix::Undo => {
                if version_part.is_empty() {
                    return ResourceName::invalid(format!(
                        "{kind} migration '{filename}' is missing a version"
                    ));
                }
                match MigrationVersion::parse(version_part) {
                    Ok(version) => Some(version),
                    Err(err) => {
                        return ResourceName::invalid(format!(
                            "filename '{filename}': {err}"
                        ));
                    }
                }
            }
            NamePrefix::Repeatable => {
                if !version_part.is_empty() {
                    return ResourceName::invalid(format!(
                        "repeatable migration '{filename}' must not have a version"
                    ));
                }
                None
            }
        };

        ResourceName {
            prefix: Some(kind),
            version,
            description: description_part.replace('_', " "),
            suffix: suffix.clone(),
            failure: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parser() -> ResourceNameParser {
        ResourceNameParser::new()
    }

    #[test]
    fn test_versioned_name() {
        let name = parser().parse("V1_2__Add_users_table.sql");
        assert!(name.is_valid());
        assert_eq!(name.prefix, Some(NamePrefix::Versioned));
        assert_eq!(name.version.unwrap().to_string(), "1.2");
        assert_eq!(name.description, "Add users table");
        assert_eq!(name.suffix, ".sql");
    }

    #[test]
    fn test_repeatable_name() {
        let name = parser().parse("R__Refresh_view.sql");
        assert!(name.is_valid());
        assert_eq!(name.prefix, Some(NamePrefix::Repeatable));
        assert!(name.version.is_none());
        assert_eq!(name.description, "Refresh view");
    }

    #[test]
    fn test_undo_name() {
        let name = parser().parse("U1__Drop_users_table.sql");
        assert!(name.is_valid());
        assert_eq!(name.prefix, Some(NamePrefix::Undo));
        assert_eq!(name.version.unwrap().to_string(), "1");
    }

    #[test]
    fn test_version_without_description() {
        let name = parser().parse("V2.sql");
        assert!(name.is_valid());
        assert_eq!(name.version.unwrap().to_string(), "2");
        assert_eq!(name.description, "");
    }

    #[test]
    fn test_invalid_prefix_rejected() {
        let name = parser().parse("X1__Nope.sql");
        assert!(!name.is_valid());
        assert!(name.failure().unwrap().contains("prefix"));
    }

    #[test]
    fn test_invalid_suffix_rejected() {
        let name = parser().parse("V1__Init.txt");
        assert!(!name.is_valid());
        assert!(name.failure().unwrap().contains("suffix"));
    }

    #[test]
    fn test_version_starting_with_dot_rejected() {
        let name = parser().parse("V.1__Bad.sql");
        assert!(!name.is_valid());

        let name = parser().parse("V_1__Bad.sql");
        assert!(!name.is_valid());
    }

    #[test]
    fn test_versioned_without_version_rejected() {
        let name = parser().parse("V__Missing.sql");
        assert!(!name.is_valid());
        assert!(name.failure().unwrap().contains("version"));
    }

    #[test]
    fn test_repeatable_with_version_rejected() {
        let name = parser().parse("R1__Bad.sql");
        assert!(!name.is_valid());
    }

    #[test]
    fn test_custom_prefixes_and_suffixes() {
        let parser = ResourceNameParser::new()
            .versioned_prefix("MIG")
            .suffixes(vec![".ddl".to_string()]);
        let name = parser.parse("MIG3__Widen_column.ddl");
        assert!(name.is_valid());
        assert_eq!(name.version.unwrap().to_string(), "3");
    }
}
