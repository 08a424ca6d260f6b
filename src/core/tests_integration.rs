//! End-to-end scenarios through the [`ChatClient`] facade: an in-memory
//! store, a scripted generation backend, and a static identity.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::api::GenerationError;
use crate::auth::{IdentityError, IdentityProvider, OwnerId, StaticIdentity};
use crate::client::ChatClient;
use crate::core::character::{CharacterDraft, CharacterId, RegistryError};
use crate::core::engine::{FALLBACK_MALFORMED_TEXT, FALLBACK_TRANSPORT_TEXT, TurnError};
use crate::core::message::Role;
use crate::core::test_helpers::helpers::{chat_snapshot, settle, ScriptedGenerationClient};
use crate::store::{DocPath, MemoryStore, PersistentStore};

async fn connected_client(
    responses: Vec<Result<String, GenerationError>>,
) -> (ChatClient, Arc<MemoryStore>, Arc<ScriptedGenerationClient>) {
    crate::logging::init();
    let store = Arc::new(MemoryStore::new());
    let generation = ScriptedGenerationClient::with_responses(responses);
    let identity = StaticIdentity::new(OwnerId::new("u1"));

    let client = ChatClient::connect(
        Default::default(),
        store.clone(),
        generation.clone(),
        &identity,
    )
    .await
    .expect("connect");
    (client, store, generation)
}

#[tokio::test]
async fn mago_scenario_happy_path() {
    let (mut client, store, generation) =
        connected_client(vec![Ok("Claro! Em que posso ajudar?".to_string())]).await;

    let mago_id = client
        .create_character(CharacterDraft::new("Mago", "sábio e irónico"))
        .await
        .expect("create Mago");
    assert_eq!(client.active_character().expect("active").name, "Mago");

    client.submit_turn("Olá").expect("submit");
    assert!(client.is_busy());
    settle().await;
    client.pump().await;

    let log = client.log();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].role, Role::User);
    assert_eq!(log[0].text, "Olá");
    assert_eq!(log[1].role, Role::Assistant);
    assert!(!log[1].text.is_empty());
    assert!(!client.is_busy());

    let persona = generation.last_persona().expect("persona sent");
    assert!(persona.contains("You are Mago"));
    assert!(persona.contains("sábio e irónico"));

    // Both the character and the chat log reached the store.
    let owner = OwnerId::new("u1");
    let character_doc = store
        .get_doc(&DocPath::character("owner", &owner, &mago_id))
        .await
        .expect("read")
        .expect("character persisted");
    assert_eq!(character_doc["name"], "Mago");

    let chat_doc = store
        .get_doc(&DocPath::chat("owner", &owner, &mago_id))
        .await
        .expect("read")
        .expect("chat persisted");
    assert_eq!(chat_doc["messages"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn transport_failure_produces_the_transport_fallback() {
    let (mut client, _store, _generation) = connected_client(vec![Err(
        GenerationError::Transport("connection refused".to_string()),
    )])
    .await;

    client
        .create_character(CharacterDraft::new("Mago", "sábio e irónico"))
        .await
        .expect("create");
    client.submit_turn("Olá").expect("submit");
    settle().await;
    client.pump().await;

    let log = client.log();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].text, "Olá");
    assert_eq!(log[1].text, FALLBACK_TRANSPORT_TEXT);
}

#[tokio::test]
async fn malformed_response_produces_a_distinct_fallback() {
    let (mut client, _store, _generation) = connected_client(vec![Err(
        GenerationError::Malformed("missing candidates".to_string()),
    )])
    .await;

    client
        .create_character(CharacterDraft::new("Mago", "sábio e irónico"))
        .await
        .expect("create");
    client.submit_turn("Olá").expect("submit");
    settle().await;
    client.pump().await;

    assert_eq!(client.log()[1].text, FALLBACK_MALFORMED_TEXT);
    assert_ne!(FALLBACK_MALFORMED_TEXT, FALLBACK_TRANSPORT_TEXT);
}

#[tokio::test]
async fn busy_submissions_are_dropped_without_a_second_request() {
    let (mut client, _store, generation) =
        connected_client(vec![Ok("Claro!".to_string())]).await;

    client
        .create_character(CharacterDraft::new("Mago", "sábio e irónico"))
        .await
        .expect("create");
    client.submit_turn("Olá").expect("first submit");
    let err = client.submit_turn("ainda aí?").expect_err("busy");
    assert_eq!(err, TurnError::Busy);

    settle().await;
    client.pump().await;

    assert_eq!(generation.calls(), 1);
    let log = client.log();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].text, "Olá");
}

#[tokio::test]
async fn empty_character_name_is_rejected_and_active_is_kept() {
    let (mut client, _store, _generation) = connected_client(vec![]).await;

    client
        .create_character(CharacterDraft::new("Mago", "sábio e irónico"))
        .await
        .expect("create");

    let err = client
        .create_character(CharacterDraft::new("  ", "descrição válida"))
        .await
        .expect_err("empty name");
    assert!(matches!(err, RegistryError::Validation("name")));
    assert_eq!(client.active_character().expect("still active").name, "Mago");
    assert_eq!(client.characters().len(), 1);
}

#[tokio::test]
async fn persisted_history_loads_on_a_second_device() {
    let store = Arc::new(MemoryStore::new());
    let owner = OwnerId::new("u1");
    let mago_id = CharacterId::new("1000-0001");

    // Another device already created the character and held a conversation.
    store
        .set_doc(
            &DocPath::character("owner", &owner, &mago_id),
            json!({
                "id": mago_id.as_str(),
                "name": "Mago",
                "description": "sábio e irónico",
                "created_at": "2025-06-01T12:00:00Z",
                "owner_id": "u1",
            }),
            false,
        )
        .await
        .expect("seed character");
    store
        .set_doc(
            &DocPath::chat("owner", &owner, &mago_id),
            chat_snapshot(&[("user", "Olá"), ("assistant", "Claro!")]),
            false,
        )
        .await
        .expect("seed chat");

    let generation = ScriptedGenerationClient::with_responses(vec![]);
    let identity = StaticIdentity::new(owner.clone());
    let mut client = ChatClient::connect(
        Default::default(),
        store.clone(),
        generation,
        &identity,
    )
    .await
    .expect("connect");

    client.pump().await;

    // The remote list auto-selected the persisted character and its history
    // replaced the empty local log.
    assert_eq!(client.active_character().expect("auto-selected").name, "Mago");
    let log = client.log();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].text, "Olá");
    assert_eq!(log[1].text, "Claro!");
}

#[tokio::test]
async fn switching_characters_mid_turn_discards_the_stale_reply() {
    let (mut client, _store, _generation) =
        connected_client(vec![Ok("resposta do Mago".to_string())]).await;

    client
        .create_character(CharacterDraft::new("Mago", "sábio e irónico"))
        .await
        .expect("create Mago");
    client.submit_turn("Olá").expect("submit");

    // Creating a second character retargets the conversation while the
    // first request is still in flight.
    client
        .create_character(CharacterDraft::new("Bardo", "alegre e musical"))
        .await
        .expect("create Bardo");
    settle().await;
    client.pump().await;

    assert_eq!(client.active_character().expect("active").name, "Bardo");
    assert!(client.log().is_empty(), "stale reply must not leak");
    assert!(!client.is_busy());
}

#[tokio::test]
async fn reselecting_a_character_restores_its_history() {
    let (mut client, _store, _generation) =
        connected_client(vec![Ok("Claro!".to_string())]).await;

    let mago_id = client
        .create_character(CharacterDraft::new("Mago", "sábio e irónico"))
        .await
        .expect("create Mago");
    client.submit_turn("Olá").expect("submit");
    settle().await;
    client.pump().await;
    assert_eq!(client.log().len(), 2);

    client
        .create_character(CharacterDraft::new("Bardo", "alegre"))
        .await
        .expect("create Bardo");
    assert!(client.log().is_empty());

    client.select_character(&mago_id).expect("reselect");
    client.pump().await;

    // The chat subscription replayed the persisted conversation.
    assert_eq!(client.log().len(), 2);
    assert_eq!(client.log()[0].text, "Olá");
}

struct FailingIdentity;

#[async_trait]
impl IdentityProvider for FailingIdentity {
    async fn resolve_owner(&self, _auth_token: Option<&str>) -> Result<OwnerId, IdentityError> {
        Err(IdentityError::Unavailable("auth backend down".to_string()))
    }
}

#[tokio::test]
async fn connect_fails_closed_when_identity_is_unavailable() {
    let store = Arc::new(MemoryStore::new());
    let generation = ScriptedGenerationClient::with_responses(vec![]);

    let result = ChatClient::connect(
        Default::default(),
        store,
        generation,
        &FailingIdentity,
    )
    .await;
    assert!(matches!(result, Err(IdentityError::Unavailable(_))));
}
