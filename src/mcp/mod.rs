//! Model Context Protocol surface
//!
//! Exposes the batch lookup as a single tool over newline-delimited JSON-RPC
//! on stdin/stdout.

pub mod protocol;
mod server;

pub use server::{RevenueServer, ServerError, FETCH_REVENUE_TOOL};
