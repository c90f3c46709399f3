use crate::config::Settings;
use crate::io::{ColorMode, OutputFormat};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cfgscan")]
#[command(about = "Configuration-aware static analysis for C and C++", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (defaults to the nearest .cfgscan.toml)
    #[arg(long, global = true, env = "CFGSCAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// When to colour text output
    #[arg(long, global = true, value_enum, default_value = "auto")]
    pub color: ColorMode,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check files for violations under every preprocessor configuration
    Check(RunArgs),

    /// Collect file info only; exits non-zero if any file failed
    Analyze(RunArgs),

    /// Print the diagnostics every enabled check can report
    Catalog {
        /// Include the unused-function check
        #[arg(long = "unused-function")]
        unused_function: bool,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Files or directories to analyse
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Check all configurations, ignoring --max-configs
    #[arg(long)]
    pub force: bool,

    /// Maximum number of configurations checked per file
    #[arg(long = "max-configs")]
    pub max_configs: Option<usize>,

    /// Check only this configuration (repeatable: -D A -D B=2)
    #[arg(short = 'D', long = "define")]
    pub defines: Vec<String>,

    /// Additional include directory
    #[arg(short = 'I', long = "include")]
    pub include_paths: Vec<PathBuf>,

    /// Suppress diagnostics: id[:file-glob[:line]]
    #[arg(long = "suppress")]
    pub suppressions: Vec<String>,

    /// Glob of paths to skip when expanding directories
    #[arg(long = "ignore")]
    pub ignore: Vec<String>,

    /// Worker threads (one file per worker)
    #[arg(short = 'j', long = "jobs")]
    pub jobs: Option<usize>,

    /// Attach a minimized reproducer to internal errors
    #[arg(long)]
    pub reduce: bool,

    /// Enable the whole-program unused-function check
    #[arg(long = "unused-function")]
    pub unused_function: bool,

    /// Skip the simplified token list
    #[arg(long = "no-simplify")]
    pub no_simplify: bool,

    /// Skip the whole-program pass
    #[arg(long = "no-whole-program")]
    pub no_whole_program: bool,
}

impl RunArgs {
    /// Overlay command-line flags on settings loaded from file.
    pub fn apply(&self, settings: &mut Settings) {
        settings.force |= self.force;
        if let Some(max) = self.max_configs {
            settings.max_configs = max;
        }
        if !self.defines.is_empty() {
            settings.user_defines = Some(self.defines.join(";"));
        }
        settings
            .include_paths
            .extend(self.include_paths.iter().cloned());
        settings
            .suppressions
            .extend(self.suppressions.iter().cloned());
        if let Some(jobs) = self.jobs {
            settings.jobs = jobs;
        }
        settings.reducer.enabled |= self.reduce;
        settings.unused_function |= self.unused_function;
        if self.no_simplify {
            settings.simplify = false;
        }
        if self.no_whole_program {
            settings.whole_program = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defines_join_into_one_configuration() {
        let cli = Cli::parse_from(["cfgscan", "check", "-D", "A", "-D", "B=2", "--force", "a.c"]);
        let Commands::Check(args) = cli.command else {
            panic!("expected check");
        };
        let mut settings = Settings::default();
        args.apply(&mut settings);
        assert_eq!(settings.user_defines.as_deref(), Some("A;B=2"));
        assert!(settings.force);
    }

    #[test]
    fn test_flags_override_file_settings() {
        let cli = Cli::parse_from([
            "cfgscan",
            "analyze",
            "--max-configs",
            "3",
            "--no-simplify",
            "-j",
            "4",
            "src",
        ]);
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        let mut settings = Settings::default();
        args.apply(&mut settings);
        assert_eq!(settings.max_configs, 3);
        assert_eq!(settings.jobs, 4);
        assert!(!settings.simplify);
        assert!(settings.whole_program);
    }
}
