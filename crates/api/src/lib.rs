//! vidtally HTTP server library.
//!
//! Exposes config, state, the run registry, error handling and routes so
//! integration tests and the binary entrypoint build the same app.

pub mod config;
pub mod detector;
pub mod error;
pub mod handlers;
pub mod html;
pub mod router;
pub mod routes;
pub mod runs;
pub mod state;
