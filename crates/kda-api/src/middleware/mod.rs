//! Middleware modules
//!
//! Rate limiting and security headers.

pub mod headers;
pub mod rate_limit;
