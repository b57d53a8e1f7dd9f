//! pagecheck CLI
//!
//! Command-line interface for loading route catalogs and running them
//! against a live site.

pub mod commands;
pub mod output;
