//! core
//!
//! Core domain types, output parsing and configuration for ccsync.
//!
//! # Modules
//!
//! - [`types`] - Strong types: Selector, SelectorKind, CommitRecord
//! - [`marker`] - The revision marker persisted between builds
//! - [`parse`] - Pure parsers for `cleartool` output
//! - [`config`] - Configuration schema and loading
//! - [`paths`] - Centralized path routing for views
//!
//! # Design Principles
//!
//! - Nothing in `core` runs an external command
//! - Parsing is permissive, rendering is canonical
//! - Schemas are strict and self-describing

pub mod config;
pub mod marker;
pub mod parse;
pub mod paths;
pub mod types;
