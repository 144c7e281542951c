//! Locally synthesized stand-in data shown when a backing service is unavailable.

use crate::model::{Article, Customer, Ticket, TicketStatus};
use chrono::{DateTime, Duration, Utc};

pub fn articles(query: &str) -> Vec<Article> {
    let query = query.trim();
    vec![
        Article {
            id: "demo1".to_string(),
            title: format!("Getting Started with {}", query),
            content: "Learn how to get started with this topic. Find step-by-step guides to help you."
                .to_string(),
            category: "Getting Started".to_string(),
        },
        Article {
            id: "demo2".to_string(),
            title: format!("FAQ - {}", query),
            content: "Frequently asked questions about this topic and common solutions.".to_string(),
            category: "FAQ".to_string(),
        },
        Article {
            id: "demo3".to_string(),
            title: format!("Troubleshooting {}", query),
            content: "Having issues? Try these troubleshooting steps to resolve your problem."
                .to_string(),
            category: "Troubleshooting".to_string(),
        },
    ]
}

const HISTORY: [(u64, &str, i64); 5] = [
    (15, "Previous Order Tracking Issue", 3),
    (14, "Payment Inquiry", 7),
    (13, "Shipping Information Request", 14),
    (12, "Account Setup Help", 21),
    (11, "Product Return Request", 30),
];

/// Closed past tickets dated relative to `now`, newest first.
pub fn history(now: DateTime<Utc>) -> Vec<Ticket> {
    HISTORY
        .iter()
        .map(|&(number, subject, days_ago)| Ticket {
            id: number.to_string(),
            number: Some(number),
            subject: subject.to_string(),
            status: TicketStatus::Closed,
            customer: Customer::default(),
            messages: Vec::new(),
            created_at: Some(now - Duration::days(days_ago)),
            updated_at: Some(now - Duration::days(days_ago - 1)),
        })
        .collect()
}
