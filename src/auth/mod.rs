//! Authentication module for the HomeLink server
//!
//! This module handles account registration and login, token and session
//! management, role checks, and per-user rate limiting.

pub mod handlers;
mod rate_limit;
mod service;

pub use handlers::{authenticate_request, require_role};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use service::{AuthService, Claims};
