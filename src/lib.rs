//! `ry-curves` library crate.
//!
//! The binary (`ry`) is a thin wrapper around this library so that:
//!
//! - lookup and table logic is testable without spawning processes or
//!   reaching the network
//! - the same pipeline drives both the printed report and the TUI

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod plot;
pub mod report;
pub mod resolve;
pub mod table;
pub mod tui;
