//! The `ChatClient` facade.
//!
//! Composes the registry, the conversation engine, and the subscription
//! manager behind the operations a rendering layer actually calls. All state
//! transitions happen on the caller's task; concurrency only ever comes from
//! the overlapping asynchronous operations themselves (a pending generation
//! racing an incoming snapshot), which is why the facade funnels everything
//! through [`ChatClient::pump`] on one logical execution context.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

use crate::api::GenerationClient;
use crate::auth::{IdentityError, IdentityProvider, OwnerId};
use crate::core::character::{
    Character, CharacterDraft, CharacterId, CharacterRegistry, RegistryError,
};
use crate::core::config::EngineConfig;
use crate::core::engine::{ConversationEngine, TurnError};
use crate::core::generation::{GenerationResolution, GenerationService};
use crate::core::message::Message;
use crate::store::{DocPath, PersistentStore};
use crate::subscription::{StoreEvent, SubscriptionManager};

pub struct ChatClient {
    config: EngineConfig,
    owner: OwnerId,
    store: Arc<dyn PersistentStore>,
    registry: CharacterRegistry,
    engine: ConversationEngine,
    subscriptions: SubscriptionManager,
    store_tx: mpsc::UnboundedSender<StoreEvent>,
    store_rx: mpsc::UnboundedReceiver<StoreEvent>,
    generation_rx: mpsc::UnboundedReceiver<GenerationResolution>,
}

impl ChatClient {
    /// Establishes identity and brings up a connected client.
    ///
    /// No store operation is issued before the identity provider resolves;
    /// the character-list subscription attaches immediately afterwards so
    /// persisted characters flow in through [`ChatClient::pump`].
    pub async fn connect(
        config: EngineConfig,
        store: Arc<dyn PersistentStore>,
        generation_client: Arc<dyn GenerationClient>,
        identity: &dyn IdentityProvider,
    ) -> Result<Self, IdentityError> {
        let owner = identity
            .resolve_owner(config.auth_token.as_deref())
            .await?;

        let (generation, generation_rx) = GenerationService::new();
        let (store_tx, store_rx) = mpsc::unbounded_channel();

        let mut subscriptions = SubscriptionManager::new(
            store.clone(),
            config.owner_scope.clone(),
            owner.clone(),
        );
        subscriptions.watch_characters(store_tx.clone());

        let engine = ConversationEngine::new(
            config.owner_scope.clone(),
            owner.clone(),
            store.clone(),
            generation_client,
            generation,
        );

        Ok(Self {
            config,
            owner,
            store,
            registry: CharacterRegistry::new(),
            engine,
            subscriptions,
            store_tx,
            store_rx,
            generation_rx,
        })
    }

    /// Creates a character, makes it active, and starts a fresh conversation.
    ///
    /// Creation succeeds once the in-memory character is active; the write of
    /// the character document is best-effort and a failure is only logged.
    pub async fn create_character(
        &mut self,
        draft: CharacterDraft,
    ) -> Result<CharacterId, RegistryError> {
        let character = self.registry.create(&self.owner, draft)?;
        self.sync_active();

        let path = DocPath::character(&self.config.owner_scope, &self.owner, &character.id);
        if let Err(err) = self
            .store
            .set_doc(&path, character.to_document(), true)
            .await
        {
            warn!(%path, "best-effort character write failed: {err}");
        }
        Ok(character.id)
    }

    pub fn select_character(&mut self, id: &CharacterId) -> Result<(), RegistryError> {
        self.registry.select_active(id)?;
        self.sync_active();
        Ok(())
    }

    pub fn clear_character(&mut self) {
        self.registry.clear_active();
        self.sync_active();
    }

    /// Submits a user turn for the active character. [`TurnError::Busy`]
    /// means a turn is outstanding and the input should be dropped.
    pub fn submit_turn(&mut self, user_text: &str) -> Result<(), TurnError> {
        let character = self
            .registry
            .active()
            .cloned()
            .ok_or(TurnError::NoActiveCharacter)?;
        self.engine.submit_turn(&character, user_text).map(|_| ())
    }

    /// Drains and applies everything that resolved since the last call:
    /// generation results first, then store notifications in delivery order.
    /// Rendering layers call this once per frame or wakeup.
    pub async fn pump(&mut self) {
        while let Ok((outcome, token)) = self.generation_rx.try_recv() {
            self.engine.resolve_generation(token, outcome).await;
        }
        while let Ok(event) = self.store_rx.try_recv() {
            self.apply_store_event(event);
        }
    }

    pub fn log(&self) -> &[Message] {
        self.engine.log().messages()
    }

    pub fn characters(&self) -> &[Character] {
        self.registry.characters()
    }

    pub fn active_character(&self) -> Option<&Character> {
        self.registry.active()
    }

    pub fn is_busy(&self) -> bool {
        self.engine.is_busy()
    }

    fn apply_store_event(&mut self, event: StoreEvent) {
        match event {
            StoreEvent::CharacterList(entries) => {
                self.registry.apply_remote_list(&entries);
                self.sync_active();
            }
            StoreEvent::ChatSnapshot {
                character_id,
                snapshot,
            } => self.apply_chat_snapshot(character_id, snapshot),
        }
    }

    fn apply_chat_snapshot(&mut self, character_id: CharacterId, snapshot: Value) {
        // The subscription manager already filters torn-down targets; this
        // guard covers the gap between a queued event and a selection change
        // applied since it was enqueued.
        if self.engine.active_character_id() == Some(&character_id) {
            self.engine.reconcile_remote(snapshot);
        }
    }

    /// Aligns the engine's conversation and the chat subscription with the
    /// registry's active selection.
    fn sync_active(&mut self) {
        let active = self.registry.active_id().cloned();
        if active.as_ref() != self.engine.active_character_id() {
            self.engine.change_active_character(active.clone());
        }
        match active {
            Some(id) => self.subscriptions.watch_chat(id, self.store_tx.clone()),
            None => self.subscriptions.clear_chat(),
        }
    }
}
