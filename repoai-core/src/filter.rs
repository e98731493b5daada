//! File Filter: narrows a repository listing down to the files worth reviewing.
//!
//! Pure and deterministic. The pipeline applies it once per session between
//! listing and the per-file loop.

use std::collections::BTreeSet;

use crate::contract::FileEntry;

/// Source and config extensions reviewed when a request does not name any.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    ".py", ".js", ".ts", ".jsx", ".tsx", ".java", ".go", ".rb", ".cpp", ".c", ".cs", ".php",
    ".rs", ".swift", ".kt", ".yaml", ".yml", ".json", ".toml", ".md",
];

/// Build, dependency and VCS directories never worth reviewing.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "__pycache__",
    "dist",
    "build",
    ".next",
    "venv",
    ".venv",
    "vendor",
    "target",
    "out",
    "coverage",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFilter {
    extensions: BTreeSet<String>,
    exclude_dirs: BTreeSet<String>,
    max_files: Option<usize>,
}

impl Default for FileFilter {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|d| d.to_string()).collect(),
            max_files: None,
        }
    }
}

impl FileFilter {
    /// Replaces the allowed extensions. Entries are normalised to a lower-case
    /// `.ext` form; an input with no usable entry keeps the defaults.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let normalised: BTreeSet<String> = extensions
            .into_iter()
            .filter_map(|ext| normalise_extension(ext.as_ref()))
            .collect();
        if !normalised.is_empty() {
            self.extensions = normalised;
        }
        self
    }

    pub fn with_exclude_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    /// Caps the number of survivors. `Some(0)` means no cap.
    pub fn with_max_files(mut self, max_files: Option<usize>) -> Self {
        self.max_files = max_files.filter(|&n| n > 0);
        self
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    /// Whether a single path survives the directory and extension rules.
    pub fn accepts(&self, path: &str) -> bool {
        let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some(file_name) = segments.pop() else {
            return false;
        };
        if segments.iter().any(|dir| self.exclude_dirs.contains(*dir)) {
            return false;
        }
        match extension_of(file_name) {
            Some(ext) => self.extensions.contains(&ext),
            None => false,
        }
    }

    /// Filters blob entries, preserving listing order, then applies the cap.
    pub fn apply(&self, entries: &[FileEntry]) -> Vec<String> {
        let survivors = entries
            .iter()
            .filter(|entry| entry.is_blob())
            .filter(|entry| self.accepts(&entry.path))
            .map(|entry| entry.path.clone());
        match self.max_files {
            Some(max) => survivors.take(max).collect(),
            None => survivors.collect(),
        }
    }
}

/// Lower-cased suffix of the final segment, including the dot.
///
/// Follows the usual suffix rules: `.gitignore` has no suffix, `a.tar.gz`
/// has `.gz`, `Makefile` has none.
fn extension_of(file_name: &str) -> Option<String> {
    let idx = file_name.rfind('.')?;
    if idx == 0 || idx == file_name.len() - 1 {
        return None;
    }
    Some(file_name[idx..].to_lowercase())
}

fn normalise_extension(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "." {
        return None;
    }
    let lowered = trimmed.to_lowercase();
    if lowered.starts_with('.') {
        Some(lowered)
    } else {
        Some(format!(".{lowered}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_rules() {
        assert_eq!(extension_of("main.RS").as_deref(), Some(".rs"));
        assert_eq!(extension_of("archive.tar.gz").as_deref(), Some(".gz"));
        assert_eq!(extension_of(".gitignore"), None);
        assert_eq!(extension_of("Makefile"), None);
        assert_eq!(extension_of("trailing."), None);
    }

    #[test]
    fn extension_normalisation() {
        assert_eq!(normalise_extension("PY").as_deref(), Some(".py"));
        assert_eq!(normalise_extension(" .Rs ").as_deref(), Some(".rs"));
        assert_eq!(normalise_extension(""), None);
        assert_eq!(normalise_extension("."), None);
    }

    #[test]
    fn blank_extension_list_keeps_defaults() {
        let filter = FileFilter::default().with_extensions(["", "  "]);
        assert_eq!(filter.extensions().count(), DEFAULT_EXTENSIONS.len());
    }
}
