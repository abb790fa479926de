//! Deterministic, pure logic shared by the agent.
//!
//! Core modules are free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod failure;
pub mod response;
pub mod safety;
pub mod state;
pub mod subject;
pub mod types;
