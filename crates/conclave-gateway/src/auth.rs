//! Gateway authentication.
//!
//! The gateway authenticates applications with a time-windowed token: the
//! SHA-256 of app id, app secret, and the current minute, truncated to the
//! first ten hex characters and passed as a query parameter.

use sha2::{Digest, Sha256};

/// Application id of the built-in development identity.
pub const DEV_APP_ID: &str = "b75fce6f-e8af-4207-9c32-f8166afb4520";

/// Secret paired with [`DEV_APP_ID`].
pub const DEV_APP_SECRET: &str = "magi-gateway-development-secret";

/// Compute the auth token for the minute containing `unix_time`.
///
/// # Examples
///
/// ```
/// use conclave_gateway::auth::auth_token;
///
/// let token = auth_token("app", "secret", 1_700_000_000);
/// assert_eq!(token.len(), 10);
/// assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
/// ```
pub fn auth_token(app_id: &str, app_secret: &str, unix_time: u64) -> String {
    let window = unix_time / 60;
    let mut hasher = Sha256::new();
    hasher.update(app_id.as_bytes());
    hasher.update(app_secret.as_bytes());
    hasher.update(window.to_string().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..10].to_string()
}

/// Build the full connection URL with authentication query parameters.
///
/// # Examples
///
/// ```
/// use conclave_gateway::auth::authenticated_url;
///
/// let url = authenticated_url("ws://127.0.0.1:8000/ws", "app", "t0k3n");
/// assert_eq!(url, "ws://127.0.0.1:8000/ws?appid=app&token=t0k3n");
/// ```
pub fn authenticated_url(base_url: &str, app_id: &str, token: &str) -> String {
    format!("{base_url}?appid={app_id}&token={token}")
}
