pub mod character;
pub mod config;
pub mod engine;
pub mod generation;
pub mod message;
pub mod session;

#[cfg(test)]
pub mod test_helpers;
#[cfg(test)]
mod tests_integration;

pub use character::{Character, CharacterId, CharacterRegistry};
pub use engine::ConversationEngine;
pub use message::{ChatLog, Message, Role};
