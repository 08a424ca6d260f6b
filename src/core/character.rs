//! Characters and the registry that owns them.
//!
//! A character is the persona a conversation is held with: a name and
//! description (interpolated into the generation instruction), optional
//! avatar/background references the core treats as opaque strings, and a
//! creator-assigned id. Characters are immutable once created; replacing one
//! means creating a new character with a new id. The registry owns the known
//! set, mediates between local creation and eventually persisted copies, and
//! tracks which character is active.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::auth::OwnerId;

/// Creator-assigned character id, unique within one owner's scope and
/// immutable for the character's lifetime. The engine never assumes the
/// store enforces uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterId(String);

impl CharacterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CharacterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub owner_id: OwnerId,
}

impl Character {
    /// Parses a persisted character document, returning `None` when the
    /// document does not have the expected shape.
    pub fn from_document(document: &Value) -> Option<Self> {
        serde_json::from_value(document.clone()).ok()
    }

    pub fn to_document(&self) -> Value {
        // Serialization of a plain struct with string/timestamp fields cannot
        // fail; fall back to an empty object rather than propagating.
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Default::default()))
    }
}

/// User-supplied fields for character creation. Avatar and background are
/// pass-through references (data URIs produced by the embedding layer).
#[derive(Debug, Clone, Default)]
pub struct CharacterDraft {
    pub name: String,
    pub description: String,
    pub avatar_ref: Option<String>,
    pub background_ref: Option<String>,
}

impl CharacterDraft {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            avatar_ref: None,
            background_ref: None,
        }
    }
}

/// Builds the instruction text a generation request carries for a character.
pub fn persona_instruction(character: &Character) -> String {
    format!(
        "You are {}. {}. Stay in character and answer the user's messages as this persona.",
        character.name, character.description
    )
}

#[derive(Debug)]
pub enum RegistryError {
    /// A required creation field was empty after trimming. Reported inline;
    /// the prior active character (if any) stays active.
    Validation(&'static str),

    /// Selection of an id the registry does not know.
    UnknownCharacter(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::Validation(field) => {
                write!(f, "character {field} must not be empty")
            }
            RegistryError::UnknownCharacter(id) => {
                write!(f, "unknown character id: {id}")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Owns the set of known characters and the active selection.
pub struct CharacterRegistry {
    characters: Vec<Character>,
    active: Option<CharacterId>,
    id_counter: u64,
}

impl CharacterRegistry {
    pub fn new() -> Self {
        Self {
            characters: Vec::new(),
            active: None,
            id_counter: 0,
        }
    }

    /// Creates a character from a draft and makes it active.
    ///
    /// Fails with [`RegistryError::Validation`] when the name or description
    /// trims to empty, in which case nothing changes. Persistence is the
    /// caller's concern; creation is complete once the in-memory character is
    /// active, independent of durability.
    pub fn create(
        &mut self,
        owner: &OwnerId,
        draft: CharacterDraft,
    ) -> Result<Character, RegistryError> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(RegistryError::Validation("name"));
        }
        let description = draft.description.trim();
        if description.is_empty() {
            return Err(RegistryError::Validation("description"));
        }

        let character = Character {
            id: self.next_id(),
            name: name.to_string(),
            description: description.to_string(),
            avatar_ref: draft.avatar_ref,
            background_ref: draft.background_ref,
            created_at: Utc::now(),
            owner_id: owner.clone(),
        };
        self.characters.push(character.clone());
        self.active = Some(character.id.clone());
        Ok(character)
    }

    pub fn select_active(&mut self, id: &CharacterId) -> Result<(), RegistryError> {
        if self.characters.iter().any(|c| c.id == *id) {
            self.active = Some(id.clone());
            Ok(())
        } else {
            Err(RegistryError::UnknownCharacter(id.to_string()))
        }
    }

    pub fn clear_active(&mut self) {
        self.active = None;
    }

    pub fn active(&self) -> Option<&Character> {
        let id = self.active.as_ref()?;
        self.characters.iter().find(|c| c.id == *id)
    }

    pub fn active_id(&self) -> Option<&CharacterId> {
        self.active.as_ref()
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    pub fn find(&self, id: &CharacterId) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == *id)
    }

    /// Merges a remote character-list snapshot into the registry.
    ///
    /// Malformed entries are skipped; entries whose id is already known are
    /// left as-is (local copies are authoritative for this session, and
    /// characters are immutable anyway). When nothing is active yet the most
    /// recently created character becomes active as a convenience default;
    /// explicit selection overrides it at any time.
    pub fn apply_remote_list(&mut self, entries: &[Value]) {
        for entry in entries {
            match Character::from_document(entry) {
                Some(character) => {
                    if !self.characters.iter().any(|c| c.id == character.id) {
                        self.characters.push(character);
                    }
                }
                None => debug!("skipping malformed character entry"),
            }
        }

        if self.active.is_none() {
            self.active = self
                .characters
                .iter()
                .max_by_key(|c| c.created_at)
                .map(|c| c.id.clone());
        }
    }

    fn next_id(&mut self) -> CharacterId {
        // Millisecond timestamp for ordering, counter suffix for uniqueness
        // within the process.
        self.id_counter += 1;
        CharacterId::new(format!(
            "{}-{:04}",
            Utc::now().timestamp_millis(),
            self.id_counter
        ))
    }
}

impl Default for CharacterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
