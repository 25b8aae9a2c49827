//! Authentication module
//!
//! Supports: HTTP Basic
//!
//! Listing endpoints are queried with a user name and password (or app
//! password) sent as a Basic `Authorization` header on every request.

mod credentials;

pub use credentials::Credentials;
