//! End-to-end calls from a sending context to the background dispatcher

use crate::integration::test_utils::{spawn_background, ticket, StubGateways};
use groovemate::model::{PageInfo, TicketStatus};
use groovemate::protocol::{
    ArticleQuery, NotePayload, QualityCheckPayload, Request, StatusChange, SuggestionPayload,
    TicketRef,
};
use groovemate::storage::{KeyValueStore, GROOVE_API_KEY, GROQ_API_KEY};
use serde_json::json;
use std::time::Duration;

fn quality(text: &str) -> Request {
    Request::CheckQuality(QualityCheckPayload {
        text: text.to_string(),
    })
}

fn suggestion() -> Request {
    Request::GenerateSuggestion(SuggestionPayload {
        subject: "Login issue".to_string(),
        message: "I cannot sign in".to_string(),
        ..SuggestionPayload::default()
    })
}

#[tokio::test]
async fn test_page_detected_is_acknowledged() {
    let background = spawn_background(&[], StubGateways::default());
    let response = background
        .transport
        .send(Request::PageDetected(PageInfo::not_ticket("https://example.com/")))
        .await
        .unwrap();

    assert!(response.success);
    assert_eq!(response.message_text(), Some("Page detected"));
}

#[tokio::test]
async fn test_status_update_without_key_is_mocked() {
    let background = spawn_background(&[], StubGateways::default());
    let response = background
        .transport
        .send(Request::UpdateStatus(StatusChange {
            ticket_id: "42".to_string(),
            status: TicketStatus::Closed,
        }))
        .await
        .unwrap();

    assert!(response.success);
    assert!(response.demo);
    assert_eq!(response.message_text(), Some("Status updated successfully"));
    assert!(background.gateways.calls().is_empty());
}

#[tokio::test]
async fn test_status_update_upstream_failure_is_queued() {
    let gateways = StubGateways::default();
    gateways.state.lock().ticketing_fails = true;
    let background = spawn_background(&[(GROOVE_API_KEY, "groove-key")], gateways);

    let response = background
        .transport
        .send(Request::UpdateStatus(StatusChange {
            ticket_id: "42".to_string(),
            status: TicketStatus::Spam,
        }))
        .await
        .unwrap();

    assert!(response.success);
    assert!(response.demo);
    assert_eq!(response.message_text(), Some("Status update queued locally"));
    assert_eq!(background.gateways.calls(), vec!["status:42:spam".to_string()]);
}

#[tokio::test]
async fn test_quality_check_reads_embedded_json() {
    let gateways = StubGateways::with_reply(
        "Here is my review:\n{\"score\": 90, \"issues\": [], \"suggestions\": [\"Add a greeting\"]}\nThanks!",
    );
    let background = spawn_background(&[(GROQ_API_KEY, "gsk_test")], gateways);

    let response = background
        .transport
        .send(quality("Thanks for reaching out, your refund is on its way."))
        .await
        .unwrap();

    let result = response.quality_result().unwrap();
    assert_eq!(result.score, 90);
    assert!(result.issues.is_empty());
    assert_eq!(result.suggestions, vec!["Add a greeting".to_string()]);
    assert_eq!(background.gateways.calls(), vec!["chat:llama-3.1-8b-instant".to_string()]);
}

#[tokio::test]
async fn test_quality_check_without_json_falls_back() {
    let gateways = StubGateways::with_reply("Looks fine to me.");
    let background = spawn_background(&[(GROQ_API_KEY, "gsk_test")], gateways);

    let response = background.transport.send(quality("Hello")).await.unwrap();

    let result = response.quality_result().unwrap();
    assert_eq!(result.score, 75);
    assert!(result.issues.is_empty());
    assert_eq!(
        result.suggestions,
        vec!["Could not analyze reply completely".to_string()]
    );
}

#[tokio::test]
async fn test_quality_check_without_key_fails() {
    let background = spawn_background(&[], StubGateways::with_reply("{}"));
    let response = background.transport.send(quality("Hello")).await.unwrap();

    assert!(!response.success);
    assert_eq!(
        response.error_message(),
        Some("Groq API key not configured. Please add it in settings.")
    );
}

#[tokio::test]
async fn test_empty_suggestion_is_failure() {
    for reply in ["", "  \n "] {
        let background =
            spawn_background(&[(GROQ_API_KEY, "gsk_test")], StubGateways::with_reply(reply));
        let response = background.transport.send(suggestion()).await.unwrap();

        assert!(!response.success, "reply {:?} should fail", reply);
        assert_eq!(response.error_message(), Some("Empty response from Groq API"));
    }
}

#[tokio::test]
async fn test_suggestion_uses_balanced_model() {
    let background = spawn_background(
        &[(GROQ_API_KEY, "gsk_test")],
        StubGateways::with_reply("\nHi there, let's get you signed back in.\n"),
    );
    let response = background.transport.send(suggestion()).await.unwrap();

    assert_eq!(
        response.suggestion_text(),
        Some("Hi there, let's get you signed back in.")
    );
    assert_eq!(
        background.gateways.calls(),
        vec!["chat:llama-3.1-70b-versatile".to_string()]
    );
}

#[tokio::test]
async fn test_fetch_ticket_round_trip() {
    let gateways = StubGateways::default();
    gateways
        .state
        .lock()
        .tickets
        .insert("7".to_string(), ticket(7, "cust-1"));
    let background = spawn_background(&[(GROOVE_API_KEY, "groove-key")], gateways);

    let response = background
        .transport
        .send(Request::FetchTicketData(TicketRef {
            ticket_id: "7".to_string(),
        }))
        .await
        .unwrap();

    let fetched = response.ticket_data().unwrap();
    assert_eq!(fetched.number, Some(7));
    assert_eq!(fetched.customer.id, "cust-1");
}

#[tokio::test]
async fn test_add_note_validation_and_key() {
    let background = spawn_background(&[], StubGateways::default());

    let blank = background
        .transport
        .send(Request::AddNote(NotePayload {
            ticket_id: "7".to_string(),
            note_text: "   ".to_string(),
        }))
        .await
        .unwrap();
    assert!(!blank.success);
    assert_eq!(
        blank.error_message(),
        Some("Invalid Groove request: note text is empty")
    );

    let no_key = background
        .transport
        .send(Request::AddNote(NotePayload {
            ticket_id: "7".to_string(),
            note_text: "Called the customer".to_string(),
        }))
        .await
        .unwrap();
    assert!(!no_key.success);
    assert_eq!(
        no_key.error_message(),
        Some("Groove API key not configured. Please add it in settings.")
    );
}

#[tokio::test]
async fn test_article_search_without_key_uses_demo_set() {
    let background = spawn_background(&[], StubGateways::default());
    let response = background
        .transport
        .send(Request::SearchArticles(ArticleQuery {
            query: "password".to_string(),
            limit: None,
        }))
        .await
        .unwrap();

    assert!(response.success);
    assert!(response.demo);
    assert_eq!(response.article_list().map(<[_]>::len), Some(3));
}

#[tokio::test]
async fn test_raw_unknown_operation() {
    let background = spawn_background(&[], StubGateways::default());
    let response = background
        .dispatcher
        .handle_value(json!({ "type": "OPEN_POPUP", "payload": {} }))
        .await;

    assert!(!response.success);
    assert_eq!(response.error_message(), Some("unknown operation"));
}

#[tokio::test]
async fn test_raw_invalid_payload() {
    let background = spawn_background(&[], StubGateways::default());
    let response = background
        .dispatcher
        .handle_value(json!({ "type": "UPDATE_STATUS", "payload": { "ticketId": "1" } }))
        .await;

    assert!(!response.success);
    assert!(response
        .error_message()
        .unwrap()
        .starts_with("invalid payload:"));
}

#[tokio::test]
async fn test_credential_change_is_picked_up() {
    let background = spawn_background(&[], StubGateways::with_reply("{\"score\": 80}"));
    let watcher = background.credentials.spawn_invalidation();

    let before = background.transport.send(quality("Hello")).await.unwrap();
    assert!(!before.success);
    assert!(background.credentials.is_cached());

    background.store.set(GROQ_API_KEY, "gsk_new").unwrap();
    // Let the invalidation task observe the change.
    for _ in 0..50 {
        if !background.credentials.is_cached() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!background.credentials.is_cached());

    let after = background.transport.send(quality("Hello")).await.unwrap();
    assert_eq!(after.quality_result().map(|r| r.score), Some(80));
    assert_eq!(background.gateways.state.lock().keys_seen, vec!["gsk_new".to_string()]);

    watcher.abort();
}
