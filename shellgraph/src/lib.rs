//! Natural-language shell agent.
//!
//! A request is driven through a graph of nodes until it reaches terminal:
//! the classifier verifies progress and routes, action nodes generate and run
//! commands or answer directly, and every command passes a safety gate first.
//! The architecture keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (run state, safety rules, failure
//!   classification, reply parsing). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (model calls, process execution,
//!   terminal prompts, directory walks). Behind traits so tests can script them.
//!
//! [`nodes`] holds one handler per node type and [`graph`] runs them.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod graph;
pub mod io;
pub mod logging;
pub mod nodes;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
