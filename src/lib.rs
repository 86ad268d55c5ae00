//! portfolio-agent - chat client for a hosted knowledge-base and action agent
//!
//! This library provides SigV4-signed invocation of the agent runtime,
//! decoding of its streamed event responses, and the demo action group
//! (company research, portfolio construction) the agent calls back into.

pub mod actions;
pub mod adapters;
pub mod agent;
pub mod auth;
pub mod config;
pub mod error;
pub mod ui;

pub use error::{Error, Result};
