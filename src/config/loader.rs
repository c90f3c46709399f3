use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::settings::Settings;
use crate::errors::{Error, Result};

pub const CONFIG_FILE_NAME: &str = ".cfgscan.toml";
const MAX_TRAVERSAL_DEPTH: usize = 10;

/// Read a settings file into a string
pub(crate) fn read_config_file(path: &Path) -> std::result::Result<String, std::io::Error> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Parse and validate settings from a TOML string
pub fn parse_and_validate_settings(contents: &str) -> Result<Settings> {
    let settings = toml::from_str::<Settings>(contents)?;
    settings.validate()?;
    Ok(settings)
}

/// Try loading settings from a specific path; missing or broken files yield `None`
pub(crate) fn try_load_settings_from_path(config_path: &Path) -> Option<Settings> {
    let contents = match read_config_file(config_path) {
        Ok(contents) => contents,
        Err(e) => {
            handle_read_error(config_path, &e);
            return None;
        }
    };

    match parse_and_validate_settings(&contents) {
        Ok(settings) => {
            log::debug!("Loaded settings from {}", config_path.display());
            Some(settings)
        }
        Err(e) => {
            log::warn!(
                "Ignoring {}: {}. Using defaults.",
                config_path.display(),
                e
            );
            None
        }
    }
}

/// Only log actual errors, not "file not found"
pub(crate) fn handle_read_error(config_path: &Path, error: &std::io::Error) {
    if error.kind() != std::io::ErrorKind::NotFound {
        log::warn!(
            "Failed to read config file {}: {}",
            config_path.display(),
            error
        );
    }
}

/// Directory ancestors of `start`, nearest first, up to a depth limit
pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

/// Load settings from an explicit file; errors propagate to the caller.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    let contents = read_config_file(path).map_err(|e| Error::read_failed(path, e))?;
    parse_and_validate_settings(&contents)
}

/// Discover `.cfgscan.toml` from `start` upwards, falling back to defaults.
pub fn discover_settings(start: PathBuf) -> Settings {
    directory_ancestors(start, MAX_TRAVERSAL_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find_map(|path| try_load_settings_from_path(&path))
        .unwrap_or_else(|| {
            log::debug!(
                "No settings found after checking {} directories. Using defaults.",
                MAX_TRAVERSAL_DEPTH
            );
            Settings::default()
        })
}

/// Load settings the way the command line does: explicit path or discovery
/// from the current directory.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    if let Some(path) = explicit {
        return load_settings_from(path);
    }
    match std::env::current_dir() {
        Ok(dir) => Ok(discover_settings(dir)),
        Err(e) => {
            log::warn!(
                "Failed to get current directory: {}. Using default settings.",
                e
            );
            Ok(Settings::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_and_validate_valid_toml() {
        let settings = parse_and_validate_settings("max_configs = 4\nforce = true\n").unwrap();
        assert_eq!(settings.max_configs, 4);
        assert!(settings.force);
    }

    #[test]
    fn test_parse_and_validate_invalid_toml() {
        assert!(parse_and_validate_settings("max_configs = [").is_err());
    }

    #[test]
    fn test_parse_and_validate_rejects_invalid_values() {
        assert!(parse_and_validate_settings("max_configs = 0").is_err());
    }

    #[test]
    fn test_directory_ancestors_generates_correct_sequence() {
        let dirs: Vec<_> = directory_ancestors(PathBuf::from("/a/b/c"), 10).collect();
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/a/b/c"),
                PathBuf::from("/a/b"),
                PathBuf::from("/a"),
                PathBuf::from("/"),
            ]
        );
    }

    #[test]
    fn test_directory_ancestors_respects_max_depth() {
        let dirs: Vec<_> = directory_ancestors(PathBuf::from("/a/b/c/d"), 2).collect();
        assert_eq!(dirs.len(), 2);
    }

    #[test]
    fn test_discover_settings_finds_parent_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE_NAME), "max_configs = 7\n").unwrap();
        let nested = temp.path().join("src/deep");
        fs::create_dir_all(&nested).unwrap();

        let settings = discover_settings(nested);
        assert_eq!(settings.max_configs, 7);
    }

    #[test]
    fn test_broken_file_falls_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE_NAME), "max_configs = \"many\"").unwrap();
        assert!(try_load_settings_from_path(&temp.path().join(CONFIG_FILE_NAME)).is_none());
    }

    #[test]
    fn test_load_settings_from_missing_file_errors() {
        let temp = TempDir::new().unwrap();
        assert!(load_settings_from(&temp.path().join("nope.toml")).is_err());
    }
}
