//! File passthroughs for the developer workspace: read, write, delete, tree,
//! and LLM-assisted writes.
//!
//! Reads and writes go wherever the caller points them. Deletes are confined
//! to the delete root.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::contract::LlmClient;
use crate::error::WorkspaceError;
use crate::prompts;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileContent {
    pub content: String,
    /// Length in characters.
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiWriteResult {
    pub content: String,
    pub original: Option<String>,
    pub applied: bool,
}

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    delete_root: PathBuf,
}

impl Workspace {
    /// The delete root is resolved once here, so a relative or symlinked
    /// root compares against resolved targets.
    pub fn new(root: impl Into<PathBuf>, delete_root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            delete_root: resolve(delete_root.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn delete_root(&self) -> &Path {
        &self.delete_root
    }

    /// Reads a file as text, replacing invalid UTF-8.
    pub async fn read_file(&self, path: &Path) -> Result<FileContent, WorkspaceError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| WorkspaceError::from_io(path, e))?;
        let content = String::from_utf8_lossy(&bytes).into_owned();
        let size = content.chars().count();
        debug!(path = %path.display(), size, "Read file");
        Ok(FileContent { content, size })
    }

    /// Writes `content`, creating parent directories. Returns the size in characters.
    pub async fn write_file(&self, path: &Path, content: &str) -> Result<usize, WorkspaceError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content).await?;
        let size = content.chars().count();
        info!(path = %path.display(), size, "Wrote file");
        Ok(size)
    }

    /// Deletes a single file under the delete root.
    ///
    /// The parent directory is resolved through symlinks before the check, and
    /// the resolved path is what gets removed.
    pub async fn delete_file(&self, path: &Path) -> Result<(), WorkspaceError> {
        let (parent, name) = match (path.parent(), path.file_name()) {
            (Some(parent), Some(name)) if self.is_deletable(path) => (parent, name),
            _ => return Err(self.refuse_delete(path)),
        };
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        let resolved = match tokio::fs::canonicalize(parent).await {
            Ok(dir) if dir.starts_with(&self.delete_root) => dir.join(name),
            Ok(_) => return Err(self.refuse_delete(path)),
            Err(e) => return Err(WorkspaceError::from_io(path, e)),
        };
        tokio::fs::remove_file(&resolved)
            .await
            .map_err(|e| WorkspaceError::from_io(path, e))?;
        info!(path = %path.display(), resolved = %resolved.display(), "Deleted file");
        Ok(())
    }

    /// Free of `..` and, as written, inside the delete root. Symlinks are
    /// only checked by [`Workspace::delete_file`].
    pub fn is_deletable(&self, path: &Path) -> bool {
        !path.components().any(|c| matches!(c, Component::ParentDir))
            && absolute(path).starts_with(&self.delete_root)
    }

    fn refuse_delete(&self, path: &Path) -> WorkspaceError {
        warn!(path = %path.display(), root = %self.delete_root.display(), "Refusing delete outside root");
        WorkspaceError::PermissionDenied(format!(
            "Can only delete files inside {}",
            self.delete_root.display()
        ))
    }

    /// Lists `path` and its descendants down to `depth` levels, sorted.
    /// `depth` 0 lists only `path` itself.
    pub async fn tree(&self, path: &Path, depth: usize) -> Result<Vec<String>, WorkspaceError> {
        let root = path.to_path_buf();
        let lines = tokio::task::spawn_blocking(move || {
            let mut lines = Vec::new();
            std::fs::metadata(&root).map_err(|e| WorkspaceError::from_io(&root, e))?;
            lines.push(root.display().to_string());
            visit_dir(&root, depth, &mut lines)?;
            lines.sort();
            Ok::<_, WorkspaceError>(lines)
        })
        .await
        .map_err(|e| WorkspaceError::Io(std::io::Error::other(e)))??;
        debug!(path = %path.display(), depth, entries = lines.len(), "Listed tree");
        Ok(lines)
    }

    /// Asks the LLM for the full new content of `path` and optionally writes it.
    pub async fn ai_write<L: LlmClient + ?Sized>(
        &self,
        llm: &L,
        path: &Path,
        instruction: &str,
        apply: bool,
    ) -> Result<AiWriteResult, WorkspaceError> {
        let original = match self.read_file(path).await {
            Ok(file) => Some(file.content),
            Err(WorkspaceError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };
        let content = prompts::write_file(llm, path, instruction, original.as_deref()).await?;
        if apply {
            self.write_file(path, &content).await?;
        }
        info!(path = %path.display(), apply, existed = original.is_some(), "AI write completed");
        Ok(AiWriteResult {
            content,
            original,
            applied: apply,
        })
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Canonical form when the path exists, otherwise made absolute.
fn resolve(path: PathBuf) -> PathBuf {
    std::fs::canonicalize(&path).unwrap_or_else(|_| absolute(&path))
}

fn visit_dir(dir: &Path, remaining: usize, lines: &mut Vec<String>) -> Result<(), WorkspaceError> {
    if remaining == 0 || !dir.is_dir() {
        return Ok(());
    }
    for entry_res in std::fs::read_dir(dir)? {
        let entry = entry_res?;
        let path = entry.path();
        lines.push(path.display().to_string());
        // Symlinked directories are listed but not followed.
        if entry.file_type()?.is_dir() {
            visit_dir(&path, remaining - 1, lines)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deletable_paths_stay_under_root() {
        let ws = Workspace::new("/workspaces", "/workspaces");
        assert!(ws.is_deletable(Path::new("/workspaces/app/main.rs")));
        assert!(!ws.is_deletable(Path::new("/workspaces/../etc/passwd")));
        assert!(!ws.is_deletable(Path::new("/workspaces-evil/file")));
        assert!(!ws.is_deletable(Path::new("/etc/passwd")));
        assert!(!ws.is_deletable(Path::new("workspaces/relative")));
    }

    #[test]
    fn relative_delete_root_is_made_absolute() {
        let ws = Workspace::new("ws", "ws");
        assert!(ws.delete_root().is_absolute());
        assert!(ws.is_deletable(Path::new("ws/notes.txt")));
        assert!(!ws.is_deletable(Path::new("other/notes.txt")));
    }
}
