//! Persistent-store contract.
//!
//! The durable side of a conversation lives in a document-oriented store
//! keyed by owner identity: point reads, point writes, and subscriptions that
//! deliver full snapshots (never deltas) whenever a document or an ordered
//! collection changes. This module only defines the contract the engine
//! consumes; [`memory::MemoryStore`] is the in-process implementation used by
//! the test suite and for offline operation, and real backends live in the
//! embedding application.

use async_trait::async_trait;
use serde_json::Value;

use crate::auth::OwnerId;
use crate::core::character::CharacterId;

pub mod memory;

pub use memory::MemoryStore;

/// Snapshot callback for a document subscription.
pub type SnapshotCallback = Box<dyn Fn(Value) + Send + Sync>;

/// Snapshot callback for a collection subscription. Each delivery carries the
/// full ordered document list.
pub type CollectionCallback = Box<dyn Fn(Vec<Value>) + Send + Sync>;

/// Error callback for either kind of subscription.
pub type ErrorCallback = Box<dyn Fn(StoreError) + Send + Sync>;

/// Handle returned by the subscribe operations; calling it detaches the
/// listener. Dropping it without calling leaves the listener attached.
pub type Unsubscribe = Box<dyn FnOnce() + Send>;

#[derive(Debug)]
pub enum StoreError {
    /// Network or backend failure. Durability is best-effort, so the engine
    /// logs these and keeps the in-memory state authoritative.
    Transport(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Transport(reason) => write!(f, "store transport error: {reason}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Path of a single document, `{scope}/{owner}/...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath(String);

impl DocPath {
    /// `{scope}/{owner}/characters/{id}`
    pub fn character(scope: &str, owner: &OwnerId, id: &CharacterId) -> Self {
        Self(format!("{scope}/{owner}/characters/{id}"))
    }

    /// `{scope}/{owner}/chats/{characterId}`
    pub fn chat(scope: &str, owner: &OwnerId, character_id: &CharacterId) -> Self {
        Self(format!("{scope}/{owner}/chats/{character_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path of a document collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// `{scope}/{owner}/characters`
    pub fn characters(scope: &str, owner: &OwnerId) -> Self {
        Self(format!("{scope}/{owner}/characters"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordering applied to collection snapshots before delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Document store reachable through point operations and change
/// subscriptions.
///
/// Subscriptions may invoke their callbacks from any thread and at any time
/// until the returned [`Unsubscribe`] runs; callers that need stronger
/// delivery guarantees layer them on top (see
/// [`crate::subscription::SubscriptionManager`]).
#[async_trait]
pub trait PersistentStore: Send + Sync {
    async fn get_doc(&self, path: &DocPath) -> Result<Option<Value>, StoreError>;

    /// Writes a document. With `merge` set, top-level fields are merged into
    /// an existing document instead of replacing it.
    async fn set_doc(&self, path: &DocPath, data: Value, merge: bool) -> Result<(), StoreError>;

    fn subscribe_doc(
        &self,
        path: &DocPath,
        on_snapshot: SnapshotCallback,
        on_error: ErrorCallback,
    ) -> Unsubscribe;

    fn subscribe_collection(
        &self,
        path: &CollectionPath,
        order: OrderBy,
        on_snapshot: CollectionCallback,
        on_error: ErrorCallback,
    ) -> Unsubscribe;
}
