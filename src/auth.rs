//! Identity-provider contract.
//!
//! Establishing an owner identity is an external concern (anonymous sign-in,
//! OAuth, whatever the embedding application uses). The core only requires
//! that an [`OwnerId`] exists before any store traffic is issued;
//! [`crate::client::ChatClient::connect`] awaits [`IdentityProvider::resolve_owner`]
//! before creating subscriptions or writing documents.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Opaque owner identity that partitions all store paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug)]
pub enum IdentityError {
    /// The provider could not establish an identity (auth backend down,
    /// credential rejected).
    Unavailable(String),
}

impl std::fmt::Display for IdentityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityError::Unavailable(reason) => {
                write!(f, "identity unavailable: {reason}")
            }
        }
    }
}

impl std::error::Error for IdentityError {}

/// Supplies the owner identity once the auth layer is ready.
///
/// `auth_token` is the optional pre-authenticated credential from
/// [`crate::core::config::EngineConfig`]; providers that exchange a token for
/// an identity consume it, providers with their own bootstrap ignore it.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve_owner(&self, auth_token: Option<&str>) -> Result<OwnerId, IdentityError>;
}

/// Identity provider for a caller that already knows its owner id, e.g. a
/// desktop shell with a cached identity or a test harness.
pub struct StaticIdentity {
    owner: OwnerId,
}

impl StaticIdentity {
    pub fn new(owner: OwnerId) -> Self {
        Self { owner }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn resolve_owner(&self, _auth_token: Option<&str>) -> Result<OwnerId, IdentityError> {
        Ok(self.owner.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_identity_resolves_immediately() {
        let provider = StaticIdentity::new(OwnerId::new("owner-1"));
        let owner = provider.resolve_owner(None).await.expect("identity");
        assert_eq!(owner.as_str(), "owner-1");
    }

    #[tokio::test]
    async fn static_identity_ignores_tokens() {
        let provider = StaticIdentity::new(OwnerId::new("owner-1"));
        let owner = provider
            .resolve_owner(Some("pre-authed"))
            .await
            .expect("identity");
        assert_eq!(owner.as_str(), "owner-1");
    }
}
