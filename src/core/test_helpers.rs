// Test helpers for engine and client tests: a scripted generation client,
// snapshot builders, and a fully wired engine over the in-memory store.

#[cfg(test)]
pub(crate) mod helpers {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use crate::api::{GenerationClient, GenerationError};
    use crate::auth::OwnerId;
    use crate::core::character::{Character, CharacterDraft, CharacterRegistry};
    use crate::core::engine::ConversationEngine;
    use crate::core::generation::GenerationService;
    use crate::store::MemoryStore;

    /// Generation client that replays a scripted sequence of outcomes and
    /// records what it was asked.
    pub struct ScriptedGenerationClient {
        responses: Mutex<VecDeque<Result<String, GenerationError>>>,
        calls: AtomicUsize,
        last_persona: Mutex<Option<String>>,
    }

    impl ScriptedGenerationClient {
        pub fn with_responses(
            responses: Vec<Result<String, GenerationError>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
                last_persona: Mutex::new(None),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_persona(&self) -> Option<String> {
            self.last_persona.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerationClient for ScriptedGenerationClient {
        async fn generate(
            &self,
            persona: Option<&str>,
            _user_text: &str,
        ) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_persona.lock().unwrap() = persona.map(str::to_string);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("scripted reply".to_string()))
        }
    }

    /// Builds a chat document snapshot from (role, text) pairs.
    pub fn chat_snapshot(entries: &[(&str, &str)]) -> Value {
        let messages: Vec<Value> = entries
            .iter()
            .map(|(role, text)| json!({ "role": role, "text": text }))
            .collect();
        json!({ "messages": messages })
    }

    /// Lets tasks spawned on the current-thread test runtime run to
    /// completion before the test continues.
    pub async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    /// A wired-up engine with the character "Mago" active, over a fresh
    /// in-memory store and a scripted client. The generation receiver is
    /// dropped; engine tests resolve turns directly.
    #[allow(clippy::type_complexity)]
    pub fn test_engine(
        responses: Vec<Result<String, GenerationError>>,
    ) -> (
        ConversationEngine,
        Character,
        Arc<MemoryStore>,
        Arc<ScriptedGenerationClient>,
    ) {
        let owner = OwnerId::new("u1");
        let store = Arc::new(MemoryStore::new());
        let client = ScriptedGenerationClient::with_responses(responses);
        let (service, _rx) = GenerationService::new();

        let mut registry = CharacterRegistry::new();
        let mago = registry
            .create(&owner, CharacterDraft::new("Mago", "sábio e irónico"))
            .expect("test character");

        let mut engine = ConversationEngine::new(
            "owner".to_string(),
            owner,
            store.clone(),
            client.clone(),
            service,
        );
        engine.change_active_character(Some(mago.id.clone()));

        (engine, mago, store, client)
    }
}
