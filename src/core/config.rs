/// Configuration passed at construction time.
///
/// The original client read its runtime identifiers from ambient globals;
/// here they are explicit so an embedder can run several isolated clients in
/// one process.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Leading store-path segment that partitions this application's
    /// documents, e.g. `owner` yields `owner/{ownerId}/characters/{id}`.
    pub owner_scope: String,

    /// Optional pre-authenticated credential handed to the identity provider
    /// during connect.
    pub auth_token: Option<String>,
}

impl EngineConfig {
    pub fn new(owner_scope: impl Into<String>) -> Self {
        Self {
            owner_scope: owner_scope.into(),
            auth_token: None,
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new("owner")
    }
}
