//! HTTP client for the Wheels API.
//!
//! [`ApiClient`] wraps every endpoint. It keeps the signed-in [`Session`] in a
//! [`SessionStore`], attaches its token to each request and drops it as soon as the
//! server answers 401.

pub mod checks;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod session;

pub use checks::booking_total;
pub use client::ApiClient;
pub use error::ClientError;
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionStore};
