use serde_json::Value;

use crate::auth::OwnerId;
use crate::core::character::CharacterId;

/// An in-flight user turn: the generation token captured at request time, the
/// conversation the response belongs to, and at most one remote snapshot
/// buffered until the turn resolves.
#[derive(Debug)]
pub struct PendingTurn {
    pub token: u64,
    pub character_id: CharacterId,
    pub buffered_snapshot: Option<Value>,
}

/// Transient per-connection state. Created once identity is established,
/// never persisted, destroyed when the client goes away.
pub struct Session {
    owner_id: OwnerId,
    active_character_id: Option<CharacterId>,
    pending_turn: Option<PendingTurn>,
    next_token: u64,
}

impl Session {
    pub fn new(owner_id: OwnerId) -> Self {
        Self {
            owner_id,
            active_character_id: None,
            pending_turn: None,
            next_token: 0,
        }
    }

    pub fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    pub fn active_character_id(&self) -> Option<&CharacterId> {
        self.active_character_id.as_ref()
    }

    /// Switching (or clearing) the active character drops any pending turn,
    /// so a late generation response fails the token check and is discarded
    /// instead of leaking into the new conversation.
    pub fn set_active_character(&mut self, id: Option<CharacterId>) {
        self.active_character_id = id;
        self.pending_turn = None;
    }

    pub fn is_busy(&self) -> bool {
        self.pending_turn.is_some()
    }

    /// Starts a turn and returns the generation token tagged onto the
    /// request. Tokens are monotonically increasing and never reused within
    /// a session.
    pub fn begin_turn(&mut self, character_id: CharacterId) -> u64 {
        self.next_token += 1;
        let token = self.next_token;
        self.pending_turn = Some(PendingTurn {
            token,
            character_id,
            buffered_snapshot: None,
        });
        token
    }

    /// Resolves the pending turn if `token` matches it. A mismatch means the
    /// response belongs to a conversation that is no longer current.
    pub fn finish_turn(&mut self, token: u64) -> Option<PendingTurn> {
        if self.pending_turn.as_ref().map(|p| p.token) == Some(token) {
            self.pending_turn.take()
        } else {
            None
        }
    }

    /// Buffers a remote snapshot behind the pending turn. Only the latest
    /// snapshot is kept; each one is a full-log replacement, so superseding
    /// earlier arrivals is lossless.
    pub fn buffer_snapshot(&mut self, snapshot: Value) {
        if let Some(pending) = self.pending_turn.as_mut() {
            pending.buffered_snapshot = Some(snapshot);
        }
    }
}
