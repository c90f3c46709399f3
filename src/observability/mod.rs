//! Observability infrastructure: crash reports, analysis context and logging.
//!
//! ## Usage
//!
//! ```ignore
//! use cfgscan::observability::{init_tracing, install_panic_hook};
//!
//! fn main() {
//!     init_tracing(0);
//!     install_panic_hook();
//!     // ... rest of application
//! }
//! ```

pub mod context;
pub mod panic_hook;

pub use context::{
    enter_isolation, get_current_context, get_progress, increment_processed, reset_context,
    reset_progress, set_configuration, set_current_file, set_phase, set_progress,
    AnalysisContext, AnalysisPhase, ContextGuard,
};
pub use panic_hook::install_panic_hook;

use std::any::Any;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "CFGSCAN_LOG";

/// Initialise the global `tracing` subscriber on stderr.
///
/// `CFGSCAN_LOG` wins over `verbosity` (0 = warn, 1 = info, 2 = debug, 3+ = trace).
/// Calling this twice is harmless.
pub fn init_tracing(verbosity: u8) {
    let fallback = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Best-effort text of a panic payload.
pub fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
