//! Side-effecting collaborators: model, shell, terminal and filesystem.

pub mod collect;
pub mod config;
pub mod console;
pub mod gateway;
pub mod process;
pub mod prompt;
pub mod shell;
