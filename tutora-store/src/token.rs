//! Bearer credential source for store requests.
//!
//! The identity provider mints short-lived tokens scoped for the store
//! integration. The provider is consulted on every request; a `None`
//! answer (no active session, or the provider failed) downgrades the
//! request to anonymous access under the public key rather than failing
//! the call.

use async_trait::async_trait;

/// Source of bearer tokens for store requests.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// A token scoped for the store integration, or `None` to fall back
    /// to anonymous access. Implementations swallow their own provider
    /// errors; this method never fails.
    async fn access_token(&self) -> Option<String>;
}

/// Always-anonymous access. Every request is made under the public key.
#[derive(Debug, Clone, Default)]
pub struct AnonAccess;

#[async_trait]
impl TokenProvider for AnonAccess {
    async fn access_token(&self) -> Option<String> {
        None
    }
}

/// Fixed-token provider for service contexts and tests.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn anon_access_yields_no_token() {
        assert_eq!(AnonAccess.access_token().await, None);
    }

    #[tokio::test]
    async fn static_token_yields_its_token() {
        let provider = StaticToken::new("jwt-abc");
        assert_eq!(provider.access_token().await.as_deref(), Some("jwt-abc"));
    }
}
