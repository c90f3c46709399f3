//! Content checksums for configuration deduplication.

use std::collections::HashSet;
use xxhash_rust::xxh64::xxh64;

/// Checksum of a configuration's fully expanded text.
pub fn checksum(expanded: &str) -> u64 {
    xxh64(expanded.as_bytes(), 0)
}

/// Checksums already analysed for the current file.
#[derive(Debug, Clone, Default)]
pub struct ChecksumSet {
    seen: HashSet<u64>,
}

impl ChecksumSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, checksum: u64) -> bool {
        self.seen.contains(&checksum)
    }

    /// Returns false when the checksum was already present.
    pub fn record(&mut self, checksum: u64) -> bool {
        self.seen.insert(checksum)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_record_then_seen() {
        let mut set = ChecksumSet::new();
        let sum = checksum("int x;\n");
        assert!(!set.seen(sum));
        assert!(set.record(sum));
        assert!(set.seen(sum));
        assert!(!set.record(sum));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_distinct_text_distinct_checksum() {
        assert_ne!(checksum("int x;\n"), checksum("int y;\n"));
    }

    proptest! {
        #[test]
        fn prop_checksum_is_deterministic(text in ".{0,200}") {
            prop_assert_eq!(checksum(&text), checksum(&text.clone()));
        }
    }
}
