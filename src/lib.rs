//! ccsync - ClearCase UCM build view synchronization for CI servers
//!
//! Before every build, ccsync makes sure the build stream and its view
//! exist, brings the view up to the newest integration baseline (or the
//! newest versions on a branch for Base ClearCase plans), and reports what
//! changed since the previous build as a list of commits. The revision
//! marker it prints is handed back on the next build.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Settings, provisioning, load rules, reconciliation and labelling
//! - [`core`] - Selectors, markers, paths, output parsing and configuration
//! - [`cleartool`] - Single interface for all `cleartool` invocations
//! - [`ui`] - Output formatting
//!
//! # Invariants
//!
//! 1. Inconsistent stream/view states are reported, never repaired
//! 2. A sync that finds nothing new issues no mutating command
//! 3. Load rules are only ever added, never removed

pub mod cleartool;
pub mod cli;
pub mod core;
pub mod engine;
pub mod ui;
