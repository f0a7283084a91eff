//! Bearer token authentication for the API clients.

use std::fmt;

use crate::error::ClientError;

/// Adds `Authorization: Bearer <token>` to outgoing requests.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerAuth {
    token: String,
}

impl BearerAuth {
    /// Create a bearer authenticator. Empty tokens are rejected.
    pub fn new(token: impl Into<String>) -> Result<Self, ClientError> {
        let token = token.into();
        if token.is_empty() {
            return Err(ClientError::InvalidCredentials(
                "Bearer token cannot be empty".to_string(),
            ));
        }
        Ok(Self { token })
    }

    /// Value of the `Authorization` header.
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Authenticate an async request.
    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.bearer_auth(&self.token)
    }

    /// Authenticate a blocking request.
    #[cfg(feature = "blocking")]
    pub fn apply_blocking(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        request.bearer_auth(&self.token)
    }
}

impl fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuth")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::AUTHORIZATION;

    #[test]
    fn test_adds_authorization_header() {
        let auth = BearerAuth::new("test_token").unwrap();
        let request = auth
            .apply(reqwest::Client::new().get("https://api.example.com/test"))
            .build()
            .unwrap();

        assert_eq!(request.headers()[AUTHORIZATION], "Bearer test_token");
        assert_eq!(auth.header_value(), "Bearer test_token");
    }

    #[cfg(feature = "blocking")]
    #[test]
    fn test_adds_authorization_header_blocking() {
        let auth = BearerAuth::new("test_token").unwrap();
        let request = auth
            .apply_blocking(reqwest::blocking::Client::new().get("https://api.example.com/test"))
            .build()
            .unwrap();

        assert_eq!(request.headers()[AUTHORIZATION], "Bearer test_token");
    }

    #[test]
    fn test_rejects_empty_token() {
        let err = BearerAuth::new("").unwrap_err();
        assert!(err.to_string().contains("Bearer token cannot be empty"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let auth = BearerAuth::new("super-secret").unwrap();
        assert!(!format!("{:?}", auth).contains("super-secret"));
    }
}
