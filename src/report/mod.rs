//! Terminal reporting: run header, yield table, diagnostics.

pub mod format;

pub use format::*;
