//! Thread-local context tracking for crash reports.
//!
//! Records which file, configuration and check the current thread is working
//! on, plus how deep it is inside the fault-isolation boundary. Guards restore
//! the previous context on drop, so nesting works naturally.

use std::cell::RefCell;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Global progress counters (atomic for thread-safety)
static FILES_PROCESSED: AtomicUsize = AtomicUsize::new(0);
static FILES_TOTAL: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static CURRENT_CONTEXT: RefCell<AnalysisContext> = const { RefCell::new(AnalysisContext::new()) };
}

/// Context snapshot for the current analysis operation.
#[derive(Debug, Clone, Default)]
pub struct AnalysisContext {
    pub phase: Option<AnalysisPhase>,
    pub current_file: Option<PathBuf>,
    pub configuration: Option<String>,
    /// Check or collaborator currently running inside the isolation boundary
    pub origin: Option<String>,
    /// Number of active isolation boundaries on this thread
    pub isolation_depth: usize,
}

impl AnalysisContext {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: None,
            current_file: None,
            configuration: None,
            origin: None,
            isolation_depth: 0,
        }
    }

    pub fn is_isolated(&self) -> bool {
        self.isolation_depth > 0
    }
}

/// Pipeline stages, for crash reports and log spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPhase {
    Preprocessing,
    Tokenizing,
    Simplifying,
    RunningChecks,
    ExecutingRules,
    WholeProgram,
    Reducing,
}

impl std::fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Preprocessing => write!(f, "preprocessing"),
            Self::Tokenizing => write!(f, "tokenizing"),
            Self::Simplifying => write!(f, "simplifying"),
            Self::RunningChecks => write!(f, "running_checks"),
            Self::ExecutingRules => write!(f, "executing_rules"),
            Self::WholeProgram => write!(f, "whole_program"),
            Self::Reducing => write!(f, "reducing"),
        }
    }
}

/// RAII guard restoring the previous context on drop.
pub struct ContextGuard {
    previous: AnalysisContext,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CURRENT_CONTEXT.with(|ctx| {
            *ctx.borrow_mut() = self.previous.clone();
        });
    }
}

fn update(apply: impl FnOnce(&mut AnalysisContext)) -> ContextGuard {
    CURRENT_CONTEXT.with(|ctx| {
        let previous = ctx.borrow().clone();
        apply(&mut ctx.borrow_mut());
        ContextGuard { previous }
    })
}

#[must_use]
pub fn set_phase(phase: AnalysisPhase) -> ContextGuard {
    update(|ctx| ctx.phase = Some(phase))
}

#[must_use]
pub fn set_current_file(path: impl Into<PathBuf>) -> ContextGuard {
    let path = path.into();
    update(|ctx| {
        ctx.current_file = Some(path);
        ctx.configuration = None;
    })
}

#[must_use]
pub fn set_configuration(configuration: impl Into<String>) -> ContextGuard {
    let configuration = configuration.into();
    update(|ctx| ctx.configuration = Some(configuration))
}

/// Mark the thread as running `origin` inside the isolation boundary.
///
/// While the guard lives, the panic hook treats panics as recoverable.
#[must_use]
pub fn enter_isolation(origin: impl Into<String>) -> ContextGuard {
    let origin = origin.into();
    update(|ctx| {
        ctx.origin = Some(origin);
        ctx.isolation_depth += 1;
    })
}

pub fn set_progress(processed: usize, total: usize) {
    FILES_PROCESSED.store(processed, Ordering::Relaxed);
    FILES_TOTAL.store(total, Ordering::Relaxed);
}

pub fn increment_processed() {
    FILES_PROCESSED.fetch_add(1, Ordering::Relaxed);
}

#[must_use]
pub fn get_current_context() -> AnalysisContext {
    CURRENT_CONTEXT.with(|ctx| ctx.borrow().clone())
}

#[must_use]
pub fn get_progress() -> (usize, usize) {
    (
        FILES_PROCESSED.load(Ordering::Relaxed),
        FILES_TOTAL.load(Ordering::Relaxed),
    )
}

pub fn reset_progress() {
    FILES_PROCESSED.store(0, Ordering::Relaxed);
    FILES_TOTAL.store(0, Ordering::Relaxed);
}

pub fn reset_context() {
    CURRENT_CONTEXT.with(|ctx| {
        *ctx.borrow_mut() = AnalysisContext::new();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_guard_restores_previous() {
        reset_context();

        let _phase = set_phase(AnalysisPhase::Tokenizing);
        {
            let _inner = set_phase(AnalysisPhase::RunningChecks);
            assert_eq!(
                get_current_context().phase,
                Some(AnalysisPhase::RunningChecks)
            );
        }
        assert_eq!(get_current_context().phase, Some(AnalysisPhase::Tokenizing));
    }

    #[test]
    fn test_isolation_depth_nests() {
        reset_context();

        assert!(!get_current_context().is_isolated());
        {
            let _outer = enter_isolation("zerodiv");
            {
                let _inner = enter_isolation("tokenizer");
                let ctx = get_current_context();
                assert_eq!(ctx.isolation_depth, 2);
                assert_eq!(ctx.origin.as_deref(), Some("tokenizer"));
            }
            assert_eq!(get_current_context().isolation_depth, 1);
        }
        assert!(!get_current_context().is_isolated());
    }

    #[test]
    fn test_new_file_clears_configuration() {
        reset_context();

        let _file = set_current_file("a.c");
        let _cfg = set_configuration("WIN32");
        assert_eq!(get_current_context().configuration.as_deref(), Some("WIN32"));
        let _next = set_current_file("b.c");
        assert!(get_current_context().configuration.is_none());
    }

    #[test]
    fn test_increment_processed() {
        reset_progress();

        set_progress(0, 10);
        increment_processed();
        increment_processed();
        assert_eq!(get_progress(), (2, 10));
    }

    #[test]
    fn test_analysis_phase_display() {
        assert_eq!(AnalysisPhase::WholeProgram.to_string(), "whole_program");
        assert_eq!(AnalysisPhase::Reducing.to_string(), "reducing");
    }
}
