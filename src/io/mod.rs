//! Output helpers: table exports (CSV/JSON).

pub mod export;

pub use export::*;
