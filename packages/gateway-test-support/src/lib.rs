//! Gateway test support utilities
//!
//! Shared helpers for the gateway's integration tests: unified logging
//! initialization and assertions over the JSON response envelope.

pub mod envelope;
pub mod logging;
