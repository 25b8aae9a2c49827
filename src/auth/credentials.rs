//! Basic credentials

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::RequestBuilder;

/// User name and password for HTTP Basic authentication
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User name
    pub username: String,
    /// Password
    pub password: String,
}

impl Credentials {
    /// Create new credentials
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The `Authorization` header value: `Basic base64(user:password)`
    pub fn authorization_header(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(raw))
    }

    /// Apply the Basic authorization header to a request builder
    pub fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        match HeaderValue::from_str(&self.authorization_header()) {
            Ok(mut value) => {
                value.set_sensitive(true);
                req.header(AUTHORIZATION, value)
            }
            // Base64 output is always a valid header value
            Err(_) => req,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}
