//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transactions)
//! 2. `TraceLayer` (request span)
//! 3. Request log (request ID, `/api` ring buffer)
//!
//! Identity is not a layer: handlers opt in with the [`RequireUser`] and
//! [`RequireAdmin`] extractors.

pub mod identity;
pub mod request_log;

pub use identity::{IdentityRejection, RequireAdmin, RequireUser, USER_ID_HEADER, USER_ROLE_HEADER};
pub use request_log::{REQUEST_ID_HEADER, RequestLog, RequestLogEntry, request_log_middleware};
