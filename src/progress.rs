//! Progress feedback for the binary.
//!
//! A single file-count bar on stderr, shown only when stderr is a terminal
//! and neither `--quiet` nor `CFGSCAN_QUIET` is set. The engine's own
//! `Checking ...` lines are independent of this bar.

use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;

pub const TEMPLATE_FILES: &str = "{msg} {pos}/{len} files ({percent}%) - {eta}";
pub const TEMPLATE_SPINNER: &str = "{spinner} {msg}";

/// Environment variable forcing quiet mode.
pub const QUIET_ENV: &str = "CFGSCAN_QUIET";

#[derive(Debug, Clone, Default)]
pub struct ProgressConfig {
    pub quiet_mode: bool,
    /// 0 = bar only, 1+ = also keep finished bars on screen
    pub verbosity: u8,
}

impl ProgressConfig {
    pub fn from_env(quiet: bool, verbosity: u8) -> Self {
        Self {
            quiet_mode: quiet || std::env::var_os(QUIET_ENV).is_some(),
            verbosity,
        }
    }

    pub fn should_show_progress(&self) -> bool {
        !self.quiet_mode && std::io::stderr().is_terminal()
    }
}

#[derive(Debug, Clone)]
pub struct ProgressManager {
    config: ProgressConfig,
}

impl ProgressManager {
    pub fn new(config: ProgressConfig) -> Self {
        Self { config }
    }

    /// Bar over `len` files; hidden when progress should not be shown.
    pub fn create_bar(&self, len: u64, msg: &str) -> ProgressBar {
        if !self.config.should_show_progress() {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::default_bar()
            .template(TEMPLATE_FILES)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░  ");
        let pb = ProgressBar::new(len).with_style(style);
        pb.set_message(msg.to_string());
        pb
    }

    pub fn create_spinner(&self, msg: &str) -> ProgressBar {
        if !self.config.should_show_progress() {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::default_spinner()
            .template(TEMPLATE_SPINNER)
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        let pb = ProgressBar::new_spinner().with_style(style);
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }

    /// Finish `pb`, keeping it on screen only at higher verbosity.
    pub fn finish(&self, pb: &ProgressBar, msg: &str) {
        if self.config.verbosity > 0 {
            pb.finish_with_message(msg.to_string());
        } else {
            pb.finish_and_clear();
        }
    }

    pub fn verbosity(&self) -> u8 {
        self.config.verbosity
    }
}
