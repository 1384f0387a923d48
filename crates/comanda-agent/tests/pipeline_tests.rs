// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end turns over temp SQLite and a scripted backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use comanda_agent::{OrderPipeline, PipelineSettings};
use comanda_context::{ConversationAssembler, DynamicZone, StaticZone};
use comanda_core::{
    BackendReply, ChatTurn, ComandaError, ConversationStore, ConversationSummary, ErrorKind,
    LineItem, Role, Volume,
};
use comanda_extract::TemporalContext;
use comanda_test_utils::{MockProvider, TestHarness};
use serde_json::json;

fn monday() -> TemporalContext {
    TemporalContext::on(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn juice_and_vape_for_tomorrow_afternoon() {
    let provider = MockProvider::new().then_extraction(json!({
        "items": [
            {"productName": "juice", "flavor": "strawberry", "quantity": 1, "volumeMl": 0},
            {"productName": "vape", "flavor": "", "quantity": 1, "volumeMl": 0}
        ],
        "date": "tomorrow",
        "time": "14:00"
    }));
    let harness = TestHarness::builder()
        .with_provider(provider)
        .build()
        .await
        .unwrap();

    let outcome = harness
        .send_at(
            monday(),
            None,
            "I want a strawberry juice and one vape, pick it up tomorrow at 14:00",
        )
        .await
        .unwrap();

    assert_eq!(
        outcome.order.items,
        vec![
            LineItem::new("juice").with_flavor("strawberry"),
            LineItem::new("vape"),
        ]
    );
    assert_eq!(outcome.order.items[0].volume_ml, Volume::Unspecified);
    assert_eq!(outcome.order.date, date(2024, 1, 2));
    assert_eq!(outcome.order.time, "14:00");
    assert!(outcome.assistant_text.is_none());
    assert!(!outcome.conversation_id.is_empty());
}

#[tokio::test]
async fn next_monday_from_a_monday_is_a_week_later() {
    let provider = MockProvider::new().then_extraction(json!({
        "items": [], "date": "next Monday", "time": "14:25"
    }));
    let harness = TestHarness::builder()
        .with_provider(provider)
        .build()
        .await
        .unwrap();

    let outcome = harness
        .send_at(monday(), None, "I'll pick it up next Monday at 14:25")
        .await
        .unwrap();
    assert_eq!(outcome.order.date, date(2024, 1, 8));
    assert_eq!(outcome.order.time, "14:25");
}

#[tokio::test]
async fn request_carries_system_prompt_history_and_function() {
    let provider = MockProvider::new()
        .then_extraction(json!({"items": [{"productName": "vape"}], "date": "", "time": ""}))
        .then_extraction(json!({"items": [{"productName": "vape"}], "date": "tomorrow", "time": "10:00"}));
    let harness = TestHarness::builder()
        .with_provider(provider)
        .with_system_prompt("Only shop orders.")
        .build()
        .await
        .unwrap();

    let first = harness.send_at(monday(), None, "one vape").await.unwrap();
    harness
        .send_at(monday(), Some(&first.conversation_id), "tomorrow at 10")
        .await
        .unwrap();

    let requests = harness.provider.requests().await;
    assert_eq!(requests.len(), 2);

    let second = &requests[1];
    let roles: Vec<Role> = second.messages.iter().map(|t| t.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::User]
    );
    assert_eq!(second.messages[0].content, "Only shop orders.");
    assert_eq!(second.messages[3].content, "tomorrow at 10");
    assert_eq!(
        second.function.as_ref().map(|f| f.name.as_str()),
        Some("getProductsAndDate")
    );
    assert_eq!(second.model, "mock-model");
}

#[tokio::test]
async fn turn_pair_is_persisted_with_raw_payload() {
    let arguments = json!({"items": [{"productName": "vape"}], "date": "2024-01-03", "time": ""});
    let provider = MockProvider::new().then_extraction(arguments.clone());
    let harness = TestHarness::builder()
        .with_provider(provider)
        .build()
        .await
        .unwrap();

    let outcome = harness.send_at(monday(), Some("conv-7"), "one vape").await.unwrap();
    assert_eq!(outcome.conversation_id, "conv-7");

    let history = ConversationStore::list(harness.storage.as_ref(), "conv-7")
        .await
        .unwrap();
    assert_eq!(
        history,
        vec![
            ChatTurn::user("one vape"),
            ChatTurn::assistant(arguments.to_string()),
        ]
    );
}

#[tokio::test]
async fn catalog_hit_and_miss() {
    let provider = MockProvider::new()
        .then_extraction(json!({
            "items": [{"productName": "vape", "flavor": "", "quantity": 1, "volumeMl": 0}],
            "date": "", "time": ""
        }))
        .then_extraction(json!({
            "items": [{"productName": "unknown", "flavor": "", "quantity": 5, "volumeMl": 0}],
            "date": "", "time": ""
        }));
    let harness = TestHarness::builder()
        .with_provider(provider)
        .with_product("vape", "", 1)
        .build()
        .await
        .unwrap();

    let hit = harness.send_at(monday(), None, "one vape").await.unwrap();
    assert_eq!(hit.matched.as_ref(), harness.catalog.first());
    assert_eq!(hit.item_matches.len(), 1);

    let miss = harness.send_at(monday(), None, "five unknowns").await.unwrap();
    assert!(miss.matched.is_none());
    assert!(miss.item_matches[0].product.is_none());
}

#[tokio::test]
async fn catalog_match_ignores_case() {
    let provider = MockProvider::new().then_extraction(json!({
        "items": [{"productName": "Juice", "flavor": "Mango", "quantity": 0}],
        "date": "", "time": ""
    }));
    let harness = TestHarness::builder()
        .with_provider(provider)
        .with_product("JUICE", "mango", 3)
        .build()
        .await
        .unwrap();

    let outcome = harness.send_at(monday(), None, "mango juice").await.unwrap();
    let matched = outcome.matched.expect("juice should match");
    assert_eq!(matched.product_name, "juice");
}

#[tokio::test]
async fn timed_out_backend_is_retried_once() {
    let provider = MockProvider::new()
        .then_delayed(Duration::from_secs(2), BackendReply::Content("late".into()))
        .then_extraction(json!({"items": [{"productName": "vape"}], "date": "", "time": ""}));
    let harness = TestHarness::builder()
        .with_provider(provider)
        .with_backend_timeout(Duration::from_millis(100))
        .build()
        .await
        .unwrap();

    let outcome = harness.send_at(monday(), None, "one vape").await.unwrap();
    assert_eq!(outcome.order.items, vec![LineItem::new("vape")]);
    assert_eq!(harness.provider.call_count(), 2);
}

#[tokio::test]
async fn second_timeout_is_backend_unavailable_and_nothing_is_persisted() {
    let slow = BackendReply::Content("late".into());
    let provider = MockProvider::new()
        .then_delayed(Duration::from_secs(2), slow.clone())
        .then_delayed(Duration::from_secs(2), slow);
    let harness = TestHarness::builder()
        .with_provider(provider)
        .with_backend_timeout(Duration::from_millis(100))
        .build()
        .await
        .unwrap();

    let err = harness
        .send_at(monday(), Some("conv-slow"), "one vape")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
    assert_eq!(harness.provider.call_count(), 2);

    let history = ConversationStore::list(harness.storage.as_ref(), "conv-slow")
        .await
        .unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn backend_failure_is_retried_once() {
    let provider = MockProvider::new()
        .then_error(ComandaError::BackendUnavailable {
            message: "connection reset by peer".into(),
            source: None,
        })
        .then_extraction(json!({"items": [{"productName": "vape"}], "date": "", "time": ""}));
    let harness = TestHarness::builder()
        .with_provider(provider)
        .build()
        .await
        .unwrap();

    let outcome = harness.send_at(monday(), None, "one vape").await.unwrap();
    assert_eq!(outcome.order.items, vec![LineItem::new("vape")]);
    assert_eq!(harness.provider.call_count(), 2);
}

#[tokio::test]
async fn repeated_backend_failure_surfaces_after_two_attempts() {
    let unavailable = || ComandaError::BackendUnavailable {
        message: "HTTP 503".into(),
        source: None,
    };
    let provider = MockProvider::new()
        .then_error(unavailable())
        .then_error(unavailable());
    let harness = TestHarness::builder()
        .with_provider(provider)
        .build()
        .await
        .unwrap();

    let err = harness
        .send_at(monday(), Some("conv-down"), "one vape")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
    assert!(err.to_string().contains("HTTP 503"), "got: {err}");
    assert_eq!(harness.provider.call_count(), 2);

    let history = ConversationStore::list(harness.storage.as_ref(), "conv-down")
        .await
        .unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn config_errors_are_not_retried() {
    let provider =
        MockProvider::new().then_error(ComandaError::Config("missing OpenAI API key".into()));
    let harness = TestHarness::builder()
        .with_provider(provider)
        .build()
        .await
        .unwrap();

    let err = harness.send_at(monday(), None, "one vape").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert_eq!(harness.provider.call_count(), 1);
}

#[tokio::test]
async fn prose_reply_yields_empty_order_with_text() {
    let provider = MockProvider::new()
        .then_reply(BackendReply::Content("Sorry, I can only help with orders.".into()));
    let harness = TestHarness::builder()
        .with_provider(provider)
        .build()
        .await
        .unwrap();

    let outcome = harness
        .send_at(monday(), None, "what's the weather like?")
        .await
        .unwrap();
    assert!(outcome.order.items.is_empty());
    assert_eq!(outcome.order.date, date(2024, 1, 1));
    assert_eq!(
        outcome.assistant_text.as_deref(),
        Some("Sorry, I can only help with orders.")
    );
    assert!(outcome.matched.is_none());
}

#[tokio::test]
async fn blank_message_is_rejected_before_the_backend() {
    let harness = TestHarness::builder().build().await.unwrap();
    let err = harness.send_at(monday(), None, "   ").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(harness.provider.call_count(), 0);
}

struct LockedHistory;

#[async_trait]
impl ConversationStore for LockedHistory {
    async fn append(&self, _: &str, _: &ChatTurn) -> Result<(), ComandaError> {
        Err(ComandaError::Storage {
            source: "database is locked".into(),
        })
    }

    async fn append_pair(&self, _: &str, _: &ChatTurn, _: &ChatTurn) -> Result<(), ComandaError> {
        Err(ComandaError::Storage {
            source: "database is locked".into(),
        })
    }

    async fn list(&self, _: &str) -> Result<Vec<ChatTurn>, ComandaError> {
        Err(ComandaError::Storage {
            source: "database is locked".into(),
        })
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, ComandaError> {
        Ok(Vec::new())
    }
}

fn pipeline_over(
    provider: Arc<MockProvider>,
    history: Arc<dyn ConversationStore>,
    harness: &TestHarness,
) -> OrderPipeline {
    OrderPipeline::new(
        provider,
        history,
        harness.storage.clone(),
        ConversationAssembler::with_zones(StaticZone::from_prompt("orders"), DynamicZone::new(None)),
        PipelineSettings {
            model: "mock-model".into(),
            max_tokens: 64,
            backend_timeout: Duration::from_secs(1),
            catalog_timeout: Duration::from_secs(1),
        },
    )
}

#[tokio::test]
async fn unreadable_history_fails_the_turn() {
    let harness = TestHarness::builder().build().await.unwrap();
    let provider = Arc::new(MockProvider::new());
    let pipeline = pipeline_over(provider.clone(), Arc::new(LockedHistory), &harness);

    let err = pipeline
        .handle_turn_at(monday(), Some("conv-1"), "one vape")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HistoryUnavailable);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn concurrent_turns_in_one_conversation_do_not_interleave() {
    let provider = MockProvider::new()
        .then_delayed(
            Duration::from_millis(50),
            comanda_test_utils::extraction_call(json!({"items": [{"productName": "a"}]})),
        )
        .then_extraction(json!({"items": [{"productName": "b"}]}));
    let harness = Arc::new(
        TestHarness::builder()
            .with_provider(provider)
            .build()
            .await
            .unwrap(),
    );

    let h1 = harness.clone();
    let first = tokio::spawn(async move { h1.send_at(monday(), Some("shared"), "first").await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    let second = harness.send_at(monday(), Some("shared"), "second").await.unwrap();
    let first = first.await.unwrap().unwrap();

    assert_eq!(first.order.items[0].product_name, "a");
    assert_eq!(second.order.items[0].product_name, "b");

    let history = ConversationStore::list(harness.storage.as_ref(), "shared")
        .await
        .unwrap();
    let users: Vec<&str> = history
        .iter()
        .filter(|t| t.role == Role::User)
        .map(|t| t.content.as_str())
        .collect();
    assert_eq!(users, vec!["first", "second"]);
    assert_eq!(history.len(), 4);
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(harness.pipeline.tracked_conversations(), 0);
}

/// In-memory history whose second write fails with a disk error.
#[derive(Default)]
struct FlakyHistory {
    turns: Mutex<Vec<ChatTurn>>,
    writes: AtomicUsize,
}

impl FlakyHistory {
    fn write(&self, turns: &mut Vec<ChatTurn>, turn: &ChatTurn) -> Result<(), ComandaError> {
        if self.writes.fetch_add(1, Ordering::SeqCst) >= 1 {
            return Err(ComandaError::Storage {
                source: "disk I/O error".into(),
            });
        }
        turns.push(turn.clone());
        Ok(())
    }

    fn turns(&self) -> Vec<ChatTurn> {
        self.turns.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConversationStore for FlakyHistory {
    async fn append(&self, _: &str, turn: &ChatTurn) -> Result<(), ComandaError> {
        let mut turns = self.turns.lock().unwrap();
        self.write(&mut turns, turn)
    }

    async fn append_pair(
        &self,
        _: &str,
        user: &ChatTurn,
        assistant: &ChatTurn,
    ) -> Result<(), ComandaError> {
        let mut turns = self.turns.lock().unwrap();
        let mut staged = turns.clone();
        self.write(&mut staged, user)?;
        self.write(&mut staged, assistant)?;
        *turns = staged;
        Ok(())
    }

    async fn list(&self, _: &str) -> Result<Vec<ChatTurn>, ComandaError> {
        Ok(self.turns())
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, ComandaError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn failed_reply_write_leaves_no_orphan_user_turn() {
    let harness = TestHarness::builder().build().await.unwrap();
    let provider = Arc::new(
        MockProvider::new()
            .then_extraction(json!({"items": [{"productName": "vape"}], "date": "", "time": ""})),
    );
    let history = Arc::new(FlakyHistory::default());
    let pipeline = pipeline_over(provider.clone(), history.clone(), &harness);

    let err = pipeline
        .handle_turn_at(monday(), Some("conv-1"), "one vape")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HistoryUnavailable);
    assert_eq!(provider.call_count(), 1);
    assert!(history.turns().is_empty(), "got: {:?}", history.turns());
}

#[tokio::test]
async fn finished_turns_release_their_conversation_locks() {
    let mut provider = MockProvider::new();
    for _ in 0..5 {
        provider = provider.then_extraction(json!({"items": [], "date": "", "time": ""}));
    }
    let harness = TestHarness::builder()
        .with_provider(provider)
        .build()
        .await
        .unwrap();

    for _ in 0..4 {
        harness.send_at(monday(), None, "hello").await.unwrap();
    }
    harness.send_at(monday(), Some("conv-9"), "hello").await.unwrap();
    assert_eq!(harness.pipeline.tracked_conversations(), 0);
}
