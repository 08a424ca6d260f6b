//! The conversation state machine.
//!
//! Per session the engine is either `Idle` or `AwaitingGeneration`; every
//! path out of `AwaitingGeneration` (success, transport failure, malformed
//! response, stale token) resolves back to `Idle` within one turn. The
//! in-memory log is mutated only here, remote snapshots are merged in under
//! an explicit rule, and durability is best-effort: a failed store write is
//! logged and swallowed while the in-memory state stays authoritative for
//! the session.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::api::{GenerationClient, GenerationError};
use crate::auth::OwnerId;
use crate::core::character::{persona_instruction, Character, CharacterId};
use crate::core::generation::{GenerationService, RequestParams};
use crate::core::message::{ChatLog, Message};
use crate::core::session::Session;
use crate::store::{DocPath, PersistentStore};

/// Assistant text shown when the generation request never completed.
pub const FALLBACK_TRANSPORT_TEXT: &str =
    "I couldn't reach the model just now. Give it a moment and send that again.";

/// Assistant text shown when the response arrived in a shape we cannot read.
/// Deliberately distinct from [`FALLBACK_TRANSPORT_TEXT`].
pub const FALLBACK_MALFORMED_TEXT: &str =
    "I got a reply I couldn't make sense of. Could you say that again?";

#[derive(Debug, PartialEq, Eq)]
pub enum TurnError {
    /// A turn is already awaiting generation. The caller drops the input and
    /// lets the current turn finish; this is not surfaced as an error to the
    /// user.
    Busy,

    /// No character is active, so there is no persona to generate with.
    NoActiveCharacter,
}

impl std::fmt::Display for TurnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnError::Busy => write!(f, "a turn is already awaiting generation"),
            TurnError::NoActiveCharacter => write!(f, "no active character"),
        }
    }
}

impl std::error::Error for TurnError {}

pub struct ConversationEngine {
    owner_scope: String,
    store: Arc<dyn PersistentStore>,
    client: Arc<dyn GenerationClient>,
    generation: GenerationService,
    session: Session,
    log: ChatLog,
}

impl ConversationEngine {
    pub fn new(
        owner_scope: String,
        owner: OwnerId,
        store: Arc<dyn PersistentStore>,
        client: Arc<dyn GenerationClient>,
        generation: GenerationService,
    ) -> Self {
        Self {
            owner_scope,
            store,
            client,
            generation,
            session: Session::new(owner),
            log: ChatLog::new(),
        }
    }

    pub fn log(&self) -> &ChatLog {
        &self.log
    }

    pub fn is_busy(&self) -> bool {
        self.session.is_busy()
    }

    pub fn active_character_id(&self) -> Option<&CharacterId> {
        self.session.active_character_id()
    }

    /// Submits a user turn for the given (active) character.
    ///
    /// Appends the user message optimistically, transitions to awaiting
    /// generation, and issues exactly one request carrying the character's
    /// persona instruction. Fails with [`TurnError::Busy`] while a turn is
    /// outstanding, in which case nothing is appended and no second request
    /// is issued.
    pub fn submit_turn(&mut self, character: &Character, user_text: &str) -> Result<u64, TurnError> {
        if self.session.is_busy() {
            return Err(TurnError::Busy);
        }
        if self.session.active_character_id() != Some(&character.id) {
            return Err(TurnError::NoActiveCharacter);
        }

        let token = self.session.begin_turn(character.id.clone());
        self.log.push(Message::user(user_text));
        self.generation.spawn_request(RequestParams {
            client: self.client.clone(),
            persona: persona_instruction(character),
            user_text: user_text.to_string(),
            token,
        });
        Ok(token)
    }

    /// Resolves a generation request.
    ///
    /// A token that no longer matches the pending turn belongs to a
    /// conversation the user has since left; applying it would leak a reply
    /// across conversations, so it is discarded wholesale. Otherwise the
    /// assistant message (or the failure-specific fallback text) is appended,
    /// any snapshot buffered during the turn is applied, and the full log is
    /// written to the store best-effort. There are no automatic retries.
    pub async fn resolve_generation(
        &mut self,
        token: u64,
        outcome: Result<String, GenerationError>,
    ) {
        let Some(pending) = self.session.finish_turn(token) else {
            debug!(token, "discarding generation response for a stale turn");
            return;
        };

        let text = match outcome {
            Ok(text) => text,
            Err(GenerationError::Transport(reason)) => {
                debug!(%reason, "generation transport failure");
                FALLBACK_TRANSPORT_TEXT.to_string()
            }
            Err(GenerationError::Malformed(reason)) => {
                debug!(%reason, "malformed generation response");
                FALLBACK_MALFORMED_TEXT.to_string()
            }
        };
        self.log.push(Message::assistant(text));

        if let Some(snapshot) = pending.buffered_snapshot {
            self.apply_snapshot(&snapshot);
        }

        self.persist_log(&pending.character_id).await;
    }

    /// Merges a remote snapshot of the active chat document.
    ///
    /// While a turn is pending the snapshot is buffered (latest wins) so the
    /// in-flight optimistic user message cannot be clobbered; it is applied
    /// once the turn resolves. While idle, a well-formed snapshot whose
    /// message count is at least the local count replaces the log: remote
    /// wins, which is how history written by another device loads. Shorter
    /// or malformed snapshots leave the log untouched.
    pub fn reconcile_remote(&mut self, snapshot: Value) {
        if self.session.is_busy() {
            self.session.buffer_snapshot(snapshot);
            return;
        }
        self.apply_snapshot(&snapshot);
    }

    /// Switches the active conversation. Resets the in-memory log (the
    /// remote subscription repopulates it) and invalidates any pending turn.
    /// The in-flight request itself is not cancelled; its response dies on
    /// the token check.
    pub fn change_active_character(&mut self, id: Option<CharacterId>) {
        if self.session.active_character_id() == id.as_ref() {
            return;
        }
        self.session.set_active_character(id);
        self.log.clear();
    }

    fn apply_snapshot(&mut self, snapshot: &Value) {
        match ChatLog::from_snapshot(snapshot) {
            Some(remote) if remote.len() >= self.log.len() => {
                self.log = remote;
            }
            Some(_) => debug!("ignoring remote snapshot shorter than local log"),
            None => debug!("discarding chat snapshot that failed the shape check"),
        }
    }

    async fn persist_log(&self, character_id: &CharacterId) {
        let path = DocPath::chat(&self.owner_scope, self.session.owner_id(), character_id);
        if let Err(err) = self
            .store
            .set_doc(&path, self.log.to_document(), true)
            .await
        {
            warn!(%path, "best-effort chat write failed: {err}");
        }
    }
}
