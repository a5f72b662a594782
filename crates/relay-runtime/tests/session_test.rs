// Conversation setup: chat and thread creation, validation, ordering of writes

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{harness, FakeAssistant, Journal, RecordingStore};
use relay_persist::MessageStore;
use relay_runtime::{Relay, RelayConfig, Role, SessionError, TurnRequest, Visibility};

#[tokio::test]
async fn concurrent_first_turns_create_one_chat_and_one_thread() {
    let h = harness(
        |fake| fake.with_thread_delay(Duration::from_millis(20)),
        RelayConfig::default(),
    );
    let relay = Arc::new(h.relay);

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let relay = Arc::clone(&relay);
            tokio::spawn(async move {
                relay
                    .start_turn(TurnRequest::new("user-1", format!("Hello {}", i)).with_chat_id("c1"))
                    .await
            })
        })
        .collect();

    let mut turns = Vec::new();
    for handle in handles {
        turns.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(h.client.threads_created(), 1);
    assert_eq!(h.store.chat_count().await, 1);
    assert_eq!(turns.iter().filter(|t| t.created_chat).count(), 1);
    assert_eq!(turns.iter().filter(|t| t.created_thread).count(), 1);
    assert!(turns.iter().all(|t| t.thread_id == turns[0].thread_id));

    let messages = h.store.get_messages("c1").await.unwrap();
    assert_eq!(messages.len(), 10);
    assert!(messages.iter().all(|m| m.role == Role::User));
}

#[tokio::test]
async fn later_turns_reuse_chat_and_thread() {
    let h = harness(|fake| fake, RelayConfig::default());

    let first = h
        .relay
        .start_turn(TurnRequest::new("u1", "Plan a trip to Kumasi next month").with_chat_id("c1"))
        .await
        .unwrap();
    let second = h
        .relay
        .start_turn(TurnRequest::new("u1", "Make it cheaper").with_chat_id("c1"))
        .await
        .unwrap();

    assert!(first.created_chat && first.created_thread);
    assert!(!second.created_chat && !second.created_thread);
    assert_eq!(first.thread_id, second.thread_id);
    assert_eq!(h.client.threads_created(), 1);

    let chat = h.store.get_chat_by_id("c1").await.unwrap().unwrap();
    assert_eq!(chat.title, "Plan a trip to Kumasi next mon...");
    assert_eq!(chat.owner_id, "u1");
    assert_eq!(chat.visibility, Visibility::Private);
    assert_eq!(chat.thread_id.as_deref(), Some(first.thread_id.as_str()));
}

#[tokio::test]
async fn supplied_thread_is_adopted_without_creating_one() {
    let h = harness(|fake| fake, RelayConfig::default());

    let turn = h
        .relay
        .start_turn(
            TurnRequest::new("u1", "Hi")
                .with_thread_id("thread_existing")
                .with_visibility(Visibility::Public),
        )
        .await
        .unwrap();

    // conversation id falls back to the thread id
    assert_eq!(turn.chat_id, "thread_existing");
    assert_eq!(turn.thread_id, "thread_existing");
    assert_eq!(h.client.threads_created(), 0);

    let chat = h.store.get_chat_by_id("thread_existing").await.unwrap().unwrap();
    assert_eq!(chat.visibility, Visibility::Public);
    assert_eq!(chat.thread_id.as_deref(), Some("thread_existing"));
}

#[tokio::test]
async fn invalid_requests_have_no_side_effects() {
    let h = harness(|fake| fake, RelayConfig::default());

    let err = h
        .relay
        .start_turn(TurnRequest::new("u1", "   ").with_chat_id("c1"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::EmptyMessage));

    let err = h
        .relay
        .start_turn(TurnRequest::new("u1", "Hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::MissingConversationId));
    assert_eq!(err.to_string(), "Missing chatId for the conversation.");

    assert_eq!(h.store.chat_count().await, 0);
    assert_eq!(h.client.threads_created(), 0);
    assert!(h.journal.lock().unwrap().is_empty());
}

#[tokio::test]
async fn user_message_is_persisted_before_remote_message() {
    let h = harness(|fake| fake, RelayConfig::default());

    h.relay
        .start_turn(TurnRequest::new("u1", "Hello").with_chat_id("c1"))
        .await
        .unwrap();

    let journal = h.journal.lock().unwrap().clone();
    assert_eq!(
        journal,
        vec!["save_chat", "create_thread", "save_message:user", "create_message"]
    );
}

#[tokio::test]
async fn relays_sharing_a_store_agree_on_one_thread() {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let client = Arc::new(FakeAssistant::new(Arc::clone(&journal)).with_thread_delay(Duration::from_millis(20)));
    let store = Arc::new(RecordingStore::new(Arc::clone(&journal)));

    let relay = || {
        Relay::builder()
            .client(client.clone())
            .store(store.clone())
            .assistant_id("asst_test")
            .build()
            .unwrap()
    };
    let (relay_a, relay_b) = (relay(), relay());

    let (turn_a, turn_b) = tokio::join!(
        relay_a.start_turn(TurnRequest::new("u1", "Hello from a").with_chat_id("c1")),
        relay_b.start_turn(TurnRequest::new("u1", "Hello from b").with_chat_id("c1")),
    );
    let (turn_a, turn_b) = (turn_a.unwrap(), turn_b.unwrap());

    let stored = store.get_chat_by_id("c1").await.unwrap().unwrap().thread_id;
    assert_eq!(turn_a.thread_id, turn_b.thread_id);
    assert_eq!(stored.as_deref(), Some(turn_a.thread_id.as_str()));
    assert_eq!(store.chat_count().await, 1);
    assert_eq!([turn_a.created_thread, turn_b.created_thread].iter().filter(|c| **c).count(), 1);
}
