//! Lead-generation gate HTTP server.
//!
//! Exposes the router, configuration, and logging setup as a library so
//! integration tests can drive the API in-process.

pub mod api;
pub mod config;
pub mod logging;
