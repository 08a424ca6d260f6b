use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn is_user(self) -> bool {
        self == Role::User
    }

    pub fn is_assistant(self) -> bool {
        self == Role::Assistant
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            _ => Err(format!("invalid message role: {value}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

/// A single conversation entry. Ordering within a log is insertion order;
/// there is no timestamp because remote snapshots may carry coarser time
/// resolution than local appends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    pub fn is_user(&self) -> bool {
        self.role.is_user()
    }

    pub fn is_assistant(&self) -> bool {
        self.role.is_assistant()
    }
}

/// The ordered in-memory message log for one conversation.
///
/// The log is the rendering source of truth for the session. Remote snapshots
/// are merged in through [`ChatLog::from_snapshot`] and the engine's
/// replacement rule, never written blindly over in-flight optimistic appends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatLog {
    messages: Vec<Message>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Parses a chat document snapshot.
    ///
    /// The snapshot must carry a `messages` array whose every element has a
    /// recognized string `role` and a string `text`. Anything else fails the
    /// shape check and the whole snapshot is rejected; a partially valid
    /// snapshot never produces a partially applied log.
    pub fn from_snapshot(snapshot: &Value) -> Option<Self> {
        let raw = snapshot.get("messages")?.as_array()?;
        let mut messages = Vec::with_capacity(raw.len());
        for entry in raw {
            let role = Role::try_from(entry.get("role")?.as_str()?).ok()?;
            let text = entry.get("text")?.as_str()?;
            messages.push(Message::new(role, text));
        }
        Some(Self { messages })
    }

    /// Serializes the full log as the chat document written to the store.
    pub fn to_document(&self) -> Value {
        serde_json::json!({ "messages": self.messages })
    }
}
