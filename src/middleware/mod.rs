//! HTTP middleware

pub mod auth;
pub mod rate_limit;

pub use auth::{AuthLayer, AuthUser, ANONYMOUS_USER};
pub use rate_limit::RateLimitLayer;
