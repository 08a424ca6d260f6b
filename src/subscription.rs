//! Store-subscription lifecycle management.
//!
//! The engine listens to two logical targets: the owner's character list and
//! the active chat document. This module guarantees at most one live
//! subscription per target, atomic retargeting of the chat subscription when
//! the active character changes, and teardown that is both idempotent and
//! effective against in-flight deliveries: every forwarded notification is
//! gated on a [`CancellationToken`] cancelled before the store-side
//! unsubscribe runs, so a notification raced against teardown is dropped
//! instead of reaching the engine.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::auth::OwnerId;
use crate::core::character::CharacterId;
use crate::store::{CollectionPath, DocPath, OrderBy, PersistentStore, Unsubscribe};

/// Notification forwarded to the client event loop.
#[derive(Debug)]
pub enum StoreEvent {
    /// Full ordered character-list snapshot.
    CharacterList(Vec<Value>),

    /// Full chat-document snapshot, tagged with the conversation it was
    /// subscribed for.
    ChatSnapshot {
        character_id: CharacterId,
        snapshot: Value,
    },
}

struct SubscriptionHandle {
    cancel: CancellationToken,
    unsubscribe: Option<Unsubscribe>,
}

impl SubscriptionHandle {
    fn new(cancel: CancellationToken, unsubscribe: Unsubscribe) -> Self {
        Self {
            cancel,
            unsubscribe: Some(unsubscribe),
        }
    }

    /// Safe to call any number of times.
    fn teardown(&mut self) {
        self.cancel.cancel();
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

pub struct SubscriptionManager {
    store: Arc<dyn PersistentStore>,
    owner_scope: String,
    owner: OwnerId,
    character_list: Option<SubscriptionHandle>,
    active_chat: Option<(CharacterId, SubscriptionHandle)>,
}

impl SubscriptionManager {
    pub fn new(store: Arc<dyn PersistentStore>, owner_scope: String, owner: OwnerId) -> Self {
        Self {
            store,
            owner_scope,
            owner,
            character_list: None,
            active_chat: None,
        }
    }

    /// Subscribes to the owner's character list, ordered by creation time
    /// descending. An existing list subscription is torn down first.
    pub fn watch_characters(&mut self, events: UnboundedSender<StoreEvent>) {
        if let Some(mut handle) = self.character_list.take() {
            handle.teardown();
        }

        let cancel = CancellationToken::new();
        let guard = cancel.clone();
        let path = CollectionPath::characters(&self.owner_scope, &self.owner);
        let unsubscribe = self.store.subscribe_collection(
            &path,
            OrderBy::desc("created_at"),
            Box::new(move |entries| {
                if guard.is_cancelled() {
                    return;
                }
                let _ = events.send(StoreEvent::CharacterList(entries));
            }),
            Box::new(move |err| {
                warn!("character list subscription error: {err}");
            }),
        );
        self.character_list = Some(SubscriptionHandle::new(cancel, unsubscribe));
    }

    /// Retargets the chat subscription to `character_id`.
    ///
    /// A subscription already watching that conversation is left alone.
    /// Otherwise the previous subscription is torn down before the new one
    /// attaches, so there is no window with two live chat subscriptions and
    /// no window in which a stale target can still deliver.
    pub fn watch_chat(&mut self, character_id: CharacterId, events: UnboundedSender<StoreEvent>) {
        if self
            .active_chat
            .as_ref()
            .is_some_and(|(current, _)| *current == character_id)
        {
            return;
        }
        self.clear_chat();

        let cancel = CancellationToken::new();
        let guard = cancel.clone();
        let forwarded_id = character_id.clone();
        let path = DocPath::chat(&self.owner_scope, &self.owner, &character_id);
        let unsubscribe = self.store.subscribe_doc(
            &path,
            Box::new(move |snapshot| {
                if guard.is_cancelled() {
                    return;
                }
                let _ = events.send(StoreEvent::ChatSnapshot {
                    character_id: forwarded_id.clone(),
                    snapshot,
                });
            }),
            Box::new(move |err| {
                warn!("chat subscription error: {err}");
            }),
        );
        self.active_chat = Some((character_id, SubscriptionHandle::new(cancel, unsubscribe)));
    }

    /// Tears down the chat subscription, if any. Idempotent.
    pub fn clear_chat(&mut self) {
        if let Some((_, mut handle)) = self.active_chat.take() {
            handle.teardown();
        }
    }

    pub fn watched_chat(&self) -> Option<&CharacterId> {
        self.active_chat.as_ref().map(|(id, _)| id)
    }
}
