//! Authentication strategies for the InProd API.
//!
//! Current servers accept a static API key (`Authorization: Api-Key ...`).
//! Older deployments exchange a username and password for a token at
//! `/api/admin/obtain-auth-token/` (`Authorization: Token ...`).

use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

/// Token-exchange endpoint, `/api/admin/obtain-auth-token/`.
pub(crate) const OBTAIN_TOKEN_SEGMENTS: [&str; 3] = ["api", "admin", "obtain-auth-token"];

/// How the client authenticates. `Debug` never prints secrets.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    ApiKey(String),
    Credentials { username: String, password: String },
}

impl Auth {
    pub fn api_key(key: impl Into<String>) -> Self {
        Auth::ApiKey(key.into())
    }

    pub fn credentials(username: impl Into<String>, password: impl Into<String>) -> Self {
        Auth::Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Short label for logs.
    pub fn method(&self) -> &'static str {
        match self {
            Auth::ApiKey(_) => "api-key",
            Auth::Credentials { .. } => "token",
        }
    }
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::ApiKey(_) => f.debug_tuple("ApiKey").field(&"<redacted>").finish(),
            Auth::Credentials { username, .. } => f
                .debug_struct("Credentials")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// `Authorization` header value for a static API key.
pub fn api_key_header(key: &str) -> String {
    format!("Api-Key {key}")
}

/// `Authorization` header value for an exchanged token.
pub fn token_header(token: &str) -> String {
    format!("Token {token}")
}

#[derive(Serialize)]
pub(crate) struct TokenRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Pull `tokens.auth` out of a token-exchange response.
///
/// On failure, the server's `errors.base` message is surfaced when present.
pub fn token_from_response(response: &Value) -> ApiResult<String> {
    if let Some(token) = response.pointer("/tokens/auth").and_then(Value::as_str) {
        return Ok(token.to_string());
    }
    let reason = match response.pointer("/errors/base") {
        Some(Value::String(msg)) => msg.clone(),
        Some(Value::Array(msgs)) if !msgs.is_empty() => msgs
            .iter()
            .map(|m| m.as_str().map(str::to_owned).unwrap_or_else(|| m.to_string()))
            .collect::<Vec<_>>()
            .join("; "),
        _ => "no token in response".to_string(),
    };
    Err(ApiError::Auth(reason))
}
