//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! Results go to stdout, diagnostics to stderr. Everything a command prints
//! goes through this module so quiet mode and `--json` behave the same for
//! every command.

pub mod output;
