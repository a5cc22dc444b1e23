//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - configured rows and columns (`Series`, `TargetDate`, `DerivedColumn`)
//! - raw source observations (`Observation`)
//! - the single lookup policy applied to every cell (`LookupPolicy`)

pub mod types;

pub use types::*;
