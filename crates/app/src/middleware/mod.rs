//! HTTP middleware.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Session layer (OAuth state and the connected shop)
//! 4. Security headers

mod security_headers;
mod session;

pub use security_headers::security_headers_middleware;
pub use session::{CONNECTED_SHOP_KEY, OAUTH_STATE_KEY, SESSION_COOKIE_NAME, create_session_layer};
