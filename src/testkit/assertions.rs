//! Assertion macros over diagnostics and results.
//!
//! - [`crate::assert_result_ok!`] - Assert a Result is Ok and extract the value
//! - [`crate::assert_contains_error!`] - Assert an error message contains a pattern
//! - [`crate::assert_diagnostic!`] - Assert a diagnostic with an id was produced
//! - [`crate::assert_no_diagnostic!`] - Assert no diagnostic with an id was produced
//!
//! ```rust
//! use cfgscan::core::{Diagnostic, Severity};
//! use cfgscan::{assert_diagnostic, assert_no_diagnostic};
//!
//! let found = vec![Diagnostic::violation("zerodiv", Severity::Error, "Division by zero.")];
//! let d = assert_diagnostic!(found, "zerodiv");
//! assert_eq!(d.severity, Severity::Error);
//! assert_no_diagnostic!(found, "unusedFunction");
//! ```

/// Assert that a Result is Ok and extract the value.
#[macro_export]
macro_rules! assert_result_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!(
                "Expected Ok, got Err: {:?}\n  at {}:{}",
                e,
                file!(),
                line!()
            ),
        }
    };
}

/// Assert that a Result is Err and its message contains `pattern`.
#[macro_export]
macro_rules! assert_contains_error {
    ($result:expr, $pattern:expr) => {
        match $result {
            Ok(value) => panic!(
                "Expected Err containing {:?}, got Ok: {:?}\n  at {}:{}",
                $pattern,
                value,
                file!(),
                line!()
            ),
            Err(e) => {
                let message = e.to_string();
                assert!(
                    message.contains($pattern),
                    "Error {:?} does not contain {:?}\n  at {}:{}",
                    message,
                    $pattern,
                    file!(),
                    line!()
                );
            }
        }
    };
}

/// Assert that a diagnostic with the given id is present and return the
/// first one.
#[macro_export]
macro_rules! assert_diagnostic {
    ($diagnostics:expr, $id:expr) => {
        match $diagnostics.iter().find(|d| d.id == $id) {
            Some(d) => d.clone(),
            None => panic!(
                "Expected diagnostic {:?}, found ids {:?}\n  at {}:{}",
                $id,
                $diagnostics.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
                file!(),
                line!()
            ),
        }
    };
}

/// Assert that no diagnostic with the given id is present.
#[macro_export]
macro_rules! assert_no_diagnostic {
    ($diagnostics:expr, $id:expr) => {
        if let Some(d) = $diagnostics.iter().find(|d| d.id == $id) {
            panic!(
                "Unexpected diagnostic {:?}: {}\n  at {}:{}",
                $id,
                d,
                file!(),
                line!()
            );
        }
    };
}
