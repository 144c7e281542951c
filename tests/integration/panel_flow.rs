//! Panel client behavior over a live dispatcher, including its demo fallbacks

use crate::integration::test_utils::{spawn_background, ticket, Background, StubGateways};
use groovemate::config::PageConfig;
use groovemate::error::PanelError;
use groovemate::model::{Article, PageInfo, TicketStatus};
use groovemate::page::MemoryDocument;
use groovemate::panel::{
    DataSource, NoteOutcome, PanelClient, StatusOutcome, SuggestionContext,
};
use groovemate::storage::{GROOVE_API_KEY, GROQ_API_KEY};

fn ticket_page(ticket_id: Option<&str>) -> PageInfo {
    PageInfo {
        is_ticket_page: true,
        ticket_id: ticket_id.map(str::to_string),
        customer_email: Some("jane@example.com".to_string()),
        url: "https://acme.groovehq.com/tickets/12".to_string(),
    }
}

fn panel(background: &Background, ticket_id: Option<&str>) -> PanelClient {
    PanelClient::new(
        background.transport.clone(),
        ticket_page(ticket_id),
        &PageConfig::default(),
    )
}

#[tokio::test]
async fn test_history_by_customer_id_drops_current_ticket() {
    let gateways = StubGateways::default();
    gateways.state.lock().histories.insert(
        "jane@example.com".to_string(),
        vec![ticket(12, "jane@example.com"), ticket(9, "jane@example.com")],
    );
    let background = spawn_background(&[(GROOVE_API_KEY, "groove-key")], gateways);

    let view = panel(&background, Some("12"))
        .load_history(Some("jane@example.com"), Some("12"))
        .await;

    assert_eq!(view.source, DataSource::Api);
    let numbers: Vec<_> = view.tickets.iter().map(|t| t.number).collect();
    assert_eq!(numbers, vec![Some(9)]);
    assert_eq!(
        background.gateways.calls(),
        vec!["history:jane@example.com:10".to_string()]
    );
}

#[tokio::test]
async fn test_history_via_ticket_customer() {
    let gateways = StubGateways::default();
    {
        let mut state = gateways.state.lock();
        state
            .tickets
            .insert("12".to_string(), ticket(12, "cust-77"));
        state
            .histories
            .insert("cust-77".to_string(), vec![ticket(3, "cust-77")]);
    }
    let background = spawn_background(&[(GROOVE_API_KEY, "groove-key")], gateways);

    let view = panel(&background, Some("12"))
        .load_history(Some("0"), Some("12"))
        .await;

    assert_eq!(view.source, DataSource::Api);
    assert_eq!(view.tickets.len(), 1);
    assert_eq!(view.tickets[0].number, Some(3));
    assert_eq!(
        background.gateways.calls(),
        vec!["get_ticket:12".to_string(), "history:cust-77:10".to_string()]
    );
}

#[tokio::test]
async fn test_history_falls_back_to_demo() {
    let background = spawn_background(&[], StubGateways::default());

    let view = panel(&background, Some("13"))
        .load_history(Some("jane@example.com"), Some("13"))
        .await;

    assert_eq!(view.source, DataSource::Demo);
    let numbers: Vec<_> = view.tickets.iter().map(|t| t.number).collect();
    assert_eq!(numbers, vec![Some(15), Some(14), Some(12), Some(11)]);
    assert!(view
        .tickets
        .iter()
        .all(|t| t.status == TicketStatus::Closed));
}

#[tokio::test]
async fn test_article_search_sources() {
    let gateways = StubGateways::default();
    gateways.state.lock().articles = vec![Article {
        id: "kb-1".to_string(),
        title: "Billing cycles".to_string(),
        content: "Invoices go out monthly".to_string(),
        category: "Billing".to_string(),
    }];
    let with_key = spawn_background(&[(GROOVE_API_KEY, "groove-key")], gateways);
    let results = panel(&with_key, Some("12")).search_articles(" billing ").await;
    assert_eq!(results.source, DataSource::Api);
    assert_eq!(results.articles.len(), 1);
    assert_eq!(with_key.gateways.calls(), vec!["articles:billing".to_string()]);

    let without_key = spawn_background(&[], StubGateways::default());
    let results = panel(&without_key, Some("12")).search_articles("billing").await;
    assert_eq!(results.source, DataSource::Demo);
    assert_eq!(results.articles.len(), 3);

    let empty = panel(&without_key, Some("12")).search_articles("   ").await;
    assert!(empty.articles.is_empty());
}

#[tokio::test]
async fn test_note_outcomes() {
    let background = spawn_background(&[(GROOVE_API_KEY, "groove-key")], StubGateways::default());
    let client = panel(&background, Some("12"));

    assert_eq!(client.add_note("Refund approved").await, Ok(NoteOutcome::Added));
    assert_eq!(
        client.add_note("  ").await,
        Err(PanelError::Validation("Please enter a note".to_string()))
    );

    let no_ticket = panel(&background, None);
    assert_eq!(
        no_ticket.add_note("Refund approved").await,
        Err(PanelError::Validation("No ticket is open".to_string()))
    );

    background.gateways.state.lock().ticketing_fails = true;
    assert_eq!(
        client.add_note("Refund approved").await,
        Ok(NoteOutcome::SavedLocally)
    );
}

#[tokio::test]
async fn test_status_outcomes() {
    let background = spawn_background(&[(GROOVE_API_KEY, "groove-key")], StubGateways::default());
    let client = panel(&background, Some("12"));
    assert_eq!(client.update_status(TicketStatus::Closed).await, StatusOutcome::Updated);

    background.gateways.state.lock().ticketing_fails = true;
    assert_eq!(client.update_status(TicketStatus::Active).await, StatusOutcome::Local);

    let keyless = spawn_background(&[], StubGateways::default());
    assert_eq!(
        panel(&keyless, Some("12")).update_status(TicketStatus::Spam).await,
        StatusOutcome::Local
    );
}

#[tokio::test]
async fn test_quality_check_requires_text() {
    let background = spawn_background(&[(GROQ_API_KEY, "gsk_test")], StubGateways::with_reply("{\"score\": 88}"));
    let client = panel(&background, Some("12"));

    assert_eq!(
        client.check_quality(" \n").await,
        Err(PanelError::Validation(
            "Please enter some text to check quality".to_string()
        ))
    );
    assert!(background.gateways.calls().is_empty());

    let result = client.check_quality("Thanks, all sorted!").await.unwrap();
    assert_eq!(result.score, 88);
}

#[tokio::test]
async fn test_suggestion_failure_is_reported() {
    let background = spawn_background(&[], StubGateways::default());
    let client = panel(&background, Some("12"));
    let doc = MemoryDocument::new("https://acme.groovehq.com/tickets/12");

    let err = client
        .generate_suggestion(SuggestionContext::default(), &doc)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        PanelError::Rejected {
            operation: "GENERATE_SUGGESTION",
            message: "Groq API key not configured. Please add it in settings.".to_string(),
        }
    );
}

#[tokio::test]
async fn test_suggestion_reads_body_from_page() {
    let background = spawn_background(&[(GROQ_API_KEY, "gsk_test")], StubGateways::with_reply("Happy to help!"));
    let client = panel(&background, Some("12"));
    let doc = MemoryDocument::new("https://acme.groovehq.com/tickets/12");
    doc.set_text(".message-body", "The export button does nothing");

    let suggestion = client
        .generate_suggestion(
            SuggestionContext {
                subject: Some("Export broken".to_string()),
                ..SuggestionContext::default()
            },
            &doc,
        )
        .await
        .unwrap();

    assert_eq!(suggestion, "Happy to help!");
}
