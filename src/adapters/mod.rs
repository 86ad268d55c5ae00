//! Adapters module - front ends that drive agent turns.
//!
//! - **CLI** - interactive terminal chat with history and trace view

pub mod cli;

pub use cli::{ChatCommand, CliChannel};
