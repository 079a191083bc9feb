//! Typed wrappers around the backend endpoints.
//!
//! These never touch shared state. Whatever happens to a response after it is
//! decoded is up to the caller.

mod auth;
mod rooms;
mod stats;

pub use auth::*;
pub use rooms::*;
pub use stats::*;
