//! `biomass-allometry` library crate.
//!
//! The binary (`biomass`) is a thin wrapper around this library so that:
//!
//! - the pipeline is testable without spawning processes
//! - each stage (ingest, cohort, features, fit, normality test) is usable on its own

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod report;
pub mod stats;
