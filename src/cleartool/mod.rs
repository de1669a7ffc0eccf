//! cleartool
//!
//! The single doorway to the external `cleartool` executable.
//!
//! # Layers
//!
//! - [`request`] - Immutable descriptions of invocations ([`Op`], [`CommandRequest`])
//! - [`executor`] - The [`Executor`] trait, the process-backed executor and
//!   failure classification
//! - [`mock`] - A scripted executor for tests
//! - [`interface`] - Typed queries and actions ([`Cleartool`]) used by the engine
//!
//! No other module spawns `cleartool` or inspects its error text.

pub mod executor;
pub mod interface;
pub mod mock;
pub mod request;

pub use executor::{classify, CleartoolError, CommandOutput, Executor, ProcessExecutor};
pub use interface::Cleartool;
pub use request::{CommandRequest, Op};
