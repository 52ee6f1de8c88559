//! Document loading from a directory tree.

use crate::types::{AppError, Document, DocumentMetadata, Result};
use std::path::{Path, PathBuf};

/// Rough token estimate: 4 bytes per token.
fn estimate_tokens(content: &str) -> usize {
    content.len() / 4
}

/// Reads qualifying text documents from a directory tree.
///
/// Re-running over an unchanged tree yields the same documents in the same
/// order: results are sorted by relative path.
pub struct DocumentLoader {
    extensions: Vec<String>,
}

impl DocumentLoader {
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e == ext))
            .unwrap_or(false)
    }

    /// Walk `root` recursively and load every matching file as UTF-8 text.
    ///
    /// A file that cannot be read or decoded is logged and skipped; an
    /// unreadable root directory fails the whole call.
    pub async fn load(&self, root: &Path) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if dir == root => {
                    return Err(AppError::IngestionRead(format!(
                        "Cannot read directory {}: {}",
                        dir.display(),
                        e
                    )));
                }
                Err(e) => {
                    tracing::warn!(path = %dir.display(), error = %e, "Skipping unreadable directory");
                    continue;
                }
            };

            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(path = %dir.display(), error = %e, "Directory walk interrupted");
                        break;
                    }
                };

                let path = entry.path();
                // file_type() does not follow symlinks, so a link cycle in
                // the tree cannot make the walk loop.
                let file_type = match entry.file_type().await {
                    Ok(file_type) => file_type,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                        continue;
                    }
                };
                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                if !self.matches_extension(&path) {
                    continue;
                }

                match self.read_document(root, &path).await {
                    Ok(document) => documents.push(document),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable document");
                    }
                }
            }
        }

        documents.sort_by(|a, b| a.metadata.source_path.cmp(&b.metadata.source_path));

        Ok(documents)
    }

    async fn read_document(&self, root: &Path, path: &Path) -> Result<Document> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::IngestionRead(e.to_string()))?;
        let content = String::from_utf8(bytes)
            .map_err(|e| AppError::IngestionRead(format!("Invalid UTF-8: {}", e)))?;

        let source_path = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| source_path.clone());
        let token_count = estimate_tokens(&content);

        Ok(Document {
            content,
            metadata: DocumentMetadata {
                source_path,
                display_name,
                token_count,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader() -> DocumentLoader {
        DocumentLoader::new(vec!["md".to_string()])
    }

    #[tokio::test]
    async fn test_loads_matching_files_recursively() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.md"), "beta content").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/a.md"), "alpha content").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let docs = loader().load(dir.path()).await.unwrap();

        assert_eq!(docs.len(), 2);
        // Sorted by relative path.
        assert_eq!(docs[0].metadata.source_path, "b.md");
        assert_eq!(docs[1].metadata.source_path, "nested/a.md");
        assert_eq!(docs[1].metadata.display_name, "a.md");
        assert_eq!(docs[0].content, "beta content");
        assert_eq!(docs[0].metadata.token_count, "beta content".len() / 4);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.md"), "fine").unwrap();
        std::fs::write(dir.path().join("bad.md"), [0xff, 0xfe, 0xfd]).unwrap();

        let docs = loader().load(dir.path()).await.unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].metadata.source_path, "good.md");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_cycle_terminates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("real.md"), "real content").unwrap();
        // Link back to the root: following it would walk forever.
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();

        let docs = loader().load(dir.path()).await.unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].metadata.source_path, "real.md");
    }

    #[tokio::test]
    async fn test_missing_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");

        let result = loader().load(&missing).await;
        assert!(matches!(result, Err(AppError::IngestionRead(_))));
    }

    #[tokio::test]
    async fn test_empty_directory_yields_no_documents() {
        let dir = tempfile::tempdir().unwrap();
        let docs = loader().load(dir.path()).await.unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_rerun_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["z.md", "a.md", "m.md"] {
            std::fs::write(dir.path().join(name), name).unwrap();
        }

        let first = loader().load(dir.path()).await.unwrap();
        let second = loader().load(dir.path()).await.unwrap();

        let paths: Vec<_> = first.iter().map(|d| &d.metadata.source_path).collect();
        assert_eq!(
            paths,
            second
                .iter()
                .map(|d| &d.metadata.source_path)
                .collect::<Vec<_>>()
        );
        assert_eq!(paths, vec!["a.md", "m.md", "z.md"]);
    }
}
