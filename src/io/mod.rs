//! Host-side I/O: source discovery and diagnostic sinks.

pub mod output;
pub mod walker;

pub use output::{format_diagnostic, ColorMode, JsonSink, OutputFormat, TextSink};
pub use walker::{file_size, SourceWalker, SOURCE_EXTENSIONS};
