//! Script resource listing.
//!
//! Resolvers do not care where scripts come from; they only see named
//! readable resources. A filesystem provider is included, and anything else
//! (archives, embedded assets, remote stores) can implement the same trait.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::MigrateResult;

/// A named, fully read script resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// The bare filename, e.g. `V1__Init.sql`.
    pub name: String,
    /// Absolute physical location, used in error messages.
    pub path: String,
    /// The full text content.
    pub content: String,
}

/// Yields named resources for a location.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// List all resources under a location, in stable name order.
    async fn list(&self, location: &str) -> MigrateResult<Vec<Resource>>;
}

/// Reads migration scripts from directories on the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct FilesystemResourceProvider;

impl FilesystemResourceProvider {
    /// Create a filesystem provider.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResourceProvider for FilesystemResourceProvider {
    async fn list(&self, location: &str) -> MigrateResult<Vec<Resource>> {
        let dir = PathBuf::from(location);
        if !dir.is_dir() {
            debug!(location, "migration location does not exist, skipping");
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut resources = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let content = tokio::fs::read_to_string(&path).await?;
            resources.push(Resource {
                name: name.to_string(),
                path: absolute_path(&path).await,
                content,
            });
        }

        Ok(resources)
    }
}

async fn absolute_path(path: &Path) -> String {
    match tokio::fs::canonicalize(path).await {
        Ok(abs) => abs.display().to_string(),
        Err(_) => path.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lists_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("V2__Second.sql"), "SELECT 2;").unwrap();
        std::fs::write(dir.path().join("V1__First.sql"), "SELECT 1;").unwrap();

        let provider = FilesystemResourceProvider::new();
        let resources = provider
            .list(dir.path().to_str().unwrap())
            .await
            .unwrap();

        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].name, "V1__First.sql");
        assert_eq!(resources[1].name, "V2__Second.sql");
        assert_eq!(resources[0].content, "SELECT 1;");
        assert!(Path::new(&resources[0].path).is_absolute());
    }

    #[tokio::test]
    async fn test_missing_location_yields_nothing() {
        let provider = FilesystemResourceProvider::new();
        let resources = provider.list("/does/not/exist").await.unwrap();
        assert!(resources.is_empty());
    }
}
