use crate::errors::{Error, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions treated as C/C++ sources when a directory is expanded.
pub const SOURCE_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "cxx", "h", "hh", "hpp", "hxx"];

/// Expands directory arguments to the C/C++ sources below them.
pub struct SourceWalker {
    roots: Vec<PathBuf>,
    ignore_patterns: Vec<glob::Pattern>,
}

impl SourceWalker {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            ignore_patterns: Vec::new(),
        }
    }

    pub fn with_ignore_patterns(mut self, patterns: &[String]) -> Result<Self> {
        self.ignore_patterns = patterns
            .iter()
            .map(|p| glob::Pattern::new(p))
            .collect::<std::result::Result<_, _>>()?;
        Ok(self)
    }

    /// Files named explicitly are kept whatever their extension; directory
    /// contents are filtered and sorted so runs are reproducible.
    pub fn walk(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for root in &self.roots {
            if root.is_file() {
                files.push(root.clone());
                continue;
            }
            if !root.exists() {
                return Err(Error::file_system(
                    format!("no such file or directory: {}", root.display()),
                    root,
                ));
            }
            let mut found: Vec<PathBuf> = WalkDir::new(root)
                .follow_links(false)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|path| self.should_process(path))
                .collect();
            found.sort();
            files.extend(found);
        }
        Ok(files)
    }

    fn should_process(&self, path: &Path) -> bool {
        let is_source = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        is_source
            && !self
                .ignore_patterns
                .iter()
                .any(|pattern| pattern.matches_path(path))
    }
}

pub fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
