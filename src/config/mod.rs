//! Settings for the analysis core and its host.

mod loader;
mod settings;
mod suppressions;

pub use loader::{
    directory_ancestors, discover_settings, load_settings, load_settings_from,
    parse_and_validate_settings, CONFIG_FILE_NAME,
};
pub use settings::{LargeHeaderSettings, ReducerSettings, RuleConfig, Settings};
pub use suppressions::{Suppression, Suppressions};
