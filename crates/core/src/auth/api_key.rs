//! API Key authentication.

use async_trait::async_trait;
use std::collections::HashMap;

use super::{AuthError, AuthRequest, Authenticator, Identity};
use crate::config::ApiKeyConfig;

/// Authenticator that validates requests against configured API keys.
///
/// Each key authenticates as its own user and carries `role`, `user_id` and
/// `shop_ids` claims. Accepts the key in either:
/// - `Authorization: Bearer <key>` header
/// - `X-API-Key: <key>` header
pub struct ApiKeyAuthenticator {
    keys: Vec<ApiKeyConfig>,
}

impl ApiKeyAuthenticator {
    pub fn new(keys: Vec<ApiKeyConfig>) -> Self {
        Self { keys }
    }

    /// Extract API key from request headers.
    /// Checks Authorization: Bearer and X-API-Key headers.
    fn extract_key<'a>(&self, request: &'a AuthRequest) -> Option<&'a str> {
        if let Some(auth_header) = request.header("authorization") {
            if let Some(key) = auth_header
                .strip_prefix("Bearer ")
                .or_else(|| auth_header.strip_prefix("bearer "))
            {
                return Some(key);
            }
        }

        request.header("x-api-key")
    }

    fn identity_for(grant: &ApiKeyConfig) -> Identity {
        let mut claims = HashMap::new();
        claims.insert("role".to_string(), serde_json::json!(grant.role));
        claims.insert("user_id".to_string(), serde_json::json!(grant.user_id));
        claims.insert("shop_ids".to_string(), serde_json::json!(grant.shop_ids));

        Identity {
            user_id: grant.user_id.to_string(),
            method: "api_key".to_string(),
            claims,
        }
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let provided_key = self
            .extract_key(request)
            .ok_or(AuthError::NotAuthenticated)?;

        // Compare against every key so timing does not reveal which matched.
        let mut matched = None;
        for grant in &self.keys {
            if constant_time_eq(provided_key.as_bytes(), grant.key.as_bytes()) {
                matched = Some(grant);
            }
        }

        match matched {
            Some(grant) => Ok(Self::identity_for(grant)),
            None => Err(AuthError::InvalidCredentials("Invalid API key".to_string())),
        }
    }

    fn method_name(&self) -> &'static str {
        "api_key"
    }
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthContext;

    fn make_request(headers: Vec<(&str, &str)>) -> AuthRequest {
        AuthRequest::from_headers(headers)
    }

    fn authenticator() -> ApiKeyAuthenticator {
        ApiKeyAuthenticator::new(vec![
            ApiKeyConfig {
                key: "owner-key-123".to_string(),
                user_id: 12,
                role: "shop_owner".to_string(),
                shop_ids: vec![3, 4],
            },
            ApiKeyConfig {
                key: "customer-key-456".to_string(),
                user_id: 13,
                role: "customer".to_string(),
                shop_ids: vec![],
            },
        ])
    }

    #[tokio::test]
    async fn test_bearer_token_valid() {
        let request = make_request(vec![("Authorization", "Bearer owner-key-123")]);
        let identity = authenticator().authenticate(&request).await.unwrap();

        assert_eq!(identity.user_id, "12");
        assert_eq!(identity.method, "api_key");
        assert_eq!(identity.claims["role"], serde_json::json!("shop_owner"));
        assert_eq!(identity.claims["shop_ids"], serde_json::json!([3, 4]));
    }

    #[tokio::test]
    async fn test_x_api_key_header_selects_matching_identity() {
        let request = make_request(vec![("X-API-Key", "customer-key-456")]);
        let identity = authenticator().authenticate(&request).await.unwrap();

        assert_eq!(identity.user_id, "13");
        let ctx = AuthContext::from_identity(&identity);
        assert!(!ctx.is_shop_owner());
    }

    #[tokio::test]
    async fn test_invalid_key() {
        let request = make_request(vec![("Authorization", "Bearer wrong-key")]);
        let result = authenticator().authenticate(&request).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
    }

    #[tokio::test]
    async fn test_missing_header() {
        let request = make_request(vec![]);
        let result = authenticator().authenticate(&request).await;
        assert!(matches!(result, Err(AuthError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_bearer_lowercase() {
        let request = make_request(vec![("Authorization", "bearer owner-key-123")]);
        let identity = authenticator().authenticate(&request).await.unwrap();
        assert_eq!(identity.user_id, "12");
    }

    #[test]
    fn test_method_name() {
        assert_eq!(authenticator().method_name(), "api_key");
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hell"));
        assert!(!constant_time_eq(b"", b"x"));
        assert!(constant_time_eq(b"", b""));
    }
}
