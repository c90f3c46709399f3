//! Test doubles for the engine's collaborators.
//!
//! - [`StubCheck`]: configurable check plugin with invocation counters and
//!   fault injection
//! - [`ScriptedPreprocessor`]: fixed configuration list with scripted
//!   expansions, purges and failures
//! - [`CountingTokenizer`]: the built-in tokenizer with call counters
//! - [`RecordingSink`]: sink keeping every event for later inspection
//!
//! # Example
//!
//! ```rust
//! use cfgscan::config::Settings;
//! use cfgscan::check::CheckRegistry;
//! use cfgscan::engine::EngineBuilder;
//! use cfgscan::testkit::{RecordingSink, ScriptedPreprocessor, StubCheck};
//!
//! let stub = StubCheck::new("stub").reporting("stubViolation");
//! let counters = stub.counters();
//! let mut checks = CheckRegistry::new();
//! checks.register(stub);
//!
//! let mut engine = EngineBuilder::new(Settings::default())
//!     .preprocessor(
//!         ScriptedPreprocessor::new()
//!             .configuration("", "int a;\n")
//!             .configuration("A", "int a;\n"),
//!     )
//!     .checks(checks)
//!     .sink(RecordingSink::new())
//!     .build()
//!     .unwrap();
//!
//! // identical expansions are analysed once (normal + simplified list)
//! assert_eq!(engine.check_content("a.c", ""), 2);
//! assert_eq!(counters.runs(), 2);
//! ```

pub mod assertions;
mod collaborators;
mod helpers;
mod plugins;
mod sink;

pub use collaborators::{CountingTokenizer, ScriptedPreprocessor, TokenizerCounters};
pub use helpers::{token_source, write_sources};
pub use plugins::{FaultMode, StubArtifact, StubCheck, StubCounters};
pub use sink::{RecordingSink, SinkEvent};
