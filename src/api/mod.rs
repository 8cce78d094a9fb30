//! HTTP API

pub mod handlers;
pub mod routes;
pub mod types;
