//! Source fixtures.
//!
//! | Helper | Purpose |
//! |--------|---------|
//! | [`token_source`] | Source text with an exact token count |
//! | [`write_sources`] | Materialize a small source tree on disk |

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Source text of `count` name tokens (`t0 t1 ...`), `per_line` per line.
///
/// ```rust
/// use cfgscan::testkit::token_source;
///
/// assert_eq!(token_source(5, 2), "t0 t1\nt2 t3\nt4\n");
/// ```
pub fn token_source(count: usize, per_line: usize) -> String {
    let per_line = per_line.max(1);
    let names: Vec<String> = (0..count).map(|i| format!("t{i}")).collect();
    names
        .chunks(per_line)
        .map(|line| format!("{}\n", line.join(" ")))
        .collect()
}

/// Write `(relative path, content)` pairs below `root`, creating parent
/// directories. Returns the written paths in input order.
pub fn write_sources(root: &Path, files: &[(&str, &str)]) -> io::Result<Vec<PathBuf>> {
    files
        .iter()
        .map(|(relative, content)| {
            let path = root.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, content)?;
            Ok(path)
        })
        .collect()
}
