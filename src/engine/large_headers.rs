use crate::config::LargeHeaderSettings;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Headers that are repeatedly expensive to re-expand.
///
/// Membership only grows; re-inserting a flagged header is a no-op.
#[derive(Debug, Clone)]
pub struct LargeHeaderTracker {
    size_threshold: usize,
    repeat_threshold: usize,
    expansions: HashMap<PathBuf, usize>,
    flagged: BTreeSet<PathBuf>,
}

impl LargeHeaderTracker {
    pub fn new(settings: &LargeHeaderSettings) -> Self {
        Self {
            size_threshold: settings.size_threshold,
            repeat_threshold: settings.repeat_threshold,
            expansions: HashMap::new(),
            flagged: BTreeSet::new(),
        }
    }

    /// Record one expansion of `identity` that produced `expanded_size` bytes.
    pub fn note_header(&mut self, identity: &Path, expanded_size: usize) {
        let count = self.expansions.entry(identity.to_path_buf()).or_insert(0);
        *count += 1;
        if expanded_size >= self.size_threshold || *count >= self.repeat_threshold {
            self.flagged.insert(identity.to_path_buf());
        }
    }

    pub fn headers(&self) -> &BTreeSet<PathBuf> {
        &self.flagged
    }

    pub fn contains(&self, identity: &Path) -> bool {
        self.flagged.contains(identity)
    }

    /// Fold another tracker's counts and flags into this one.
    pub fn merge(&mut self, other: LargeHeaderTracker) {
        for (identity, count) in other.expansions {
            let total = self.expansions.entry(identity.clone()).or_insert(0);
            *total += count;
            if *total >= self.repeat_threshold {
                self.flagged.insert(identity);
            }
        }
        self.flagged.extend(other.flagged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(size: usize, repeat: usize) -> LargeHeaderTracker {
        LargeHeaderTracker::new(&LargeHeaderSettings {
            size_threshold: size,
            repeat_threshold: repeat,
        })
    }

    #[test]
    fn test_size_threshold_flags_immediately() {
        let mut t = tracker(100, 10);
        t.note_header(Path::new("small.h"), 99);
        t.note_header(Path::new("big.h"), 100);
        assert!(!t.contains(Path::new("small.h")));
        assert!(t.contains(Path::new("big.h")));
    }

    #[test]
    fn test_repeat_threshold_and_idempotence() {
        let mut t = tracker(1_000, 3);
        for _ in 0..2 {
            t.note_header(Path::new("common.h"), 10);
        }
        assert!(t.headers().is_empty());
        for _ in 0..5 {
            t.note_header(Path::new("common.h"), 10);
        }
        assert_eq!(t.headers().len(), 1);
    }

    #[test]
    fn test_merge_sums_counts() {
        let mut left = tracker(1_000, 3);
        let mut right = tracker(1_000, 3);
        left.note_header(Path::new("x.h"), 1);
        right.note_header(Path::new("x.h"), 1);
        right.note_header(Path::new("x.h"), 1);
        left.merge(right);
        assert!(left.contains(Path::new("x.h")));
    }
}
