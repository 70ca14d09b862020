//! CLI subcommand implementations.

pub mod facts;
pub mod run;
pub mod validate;
