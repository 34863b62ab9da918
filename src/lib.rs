//! railcache library
//!
//! Polls a transit GraphQL API on a fixed interval and serves the latest good
//! response from memory. Exposed as a library for integration tests.

pub mod api;
pub mod cache;
pub mod cli;
pub mod data;
pub mod refresh;
pub mod server;
