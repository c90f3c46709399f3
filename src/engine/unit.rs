use super::checksum::ChecksumSet;
use std::path::PathBuf;

/// One file under analysis for the duration of a single entry-point call.
#[derive(Debug, Clone)]
pub struct AnalysisUnit {
    pub path: PathBuf,
    pub source: String,
    /// Checksums of configurations already analysed
    pub checksums: ChecksumSet,
    /// Configurations that reached tokenization
    pub config_count: usize,
    /// Set once the ceiling is hit; never cleared
    pub too_many_configs: bool,
    /// Set once any check or collaborator fails; never cleared
    pub internal_error_found: bool,
    /// Counted diagnostics accepted during this call
    pub error_count: u32,
}

impl AnalysisUnit {
    pub fn new(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
            checksums: ChecksumSet::new(),
            config_count: 0,
            too_many_configs: false,
            internal_error_found: false,
            error_count: 0,
        }
    }
}
