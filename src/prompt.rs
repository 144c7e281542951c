//! Prompts sent to the generation service.

use crate::gateway::ChatMessage;
use crate::protocol::SuggestionPayload;

pub const DEFAULT_CUSTOMER: &str = "Customer";
pub const DEFAULT_PRIORITY: &str = "Normal";
pub const DEFAULT_CATEGORY: &str = "General Support";
pub const DEFAULT_STYLE: &str = "professional and friendly";

const QUALITY_SYSTEM: &str =
    "You are a customer support quality analyst. Return only valid JSON with no extra text.";

const SUGGESTION_SYSTEM: &str = "You are a professional customer support agent. Create unique, \
personalized responses tailored to the specific customer issue. Never use generic templates. \
Always reference the customer's specific problem and provide relevant solutions.";

pub fn quality_check(reply: &str) -> Vec<ChatMessage> {
    let prompt = format!(
        r#"Analyze this customer support reply and provide feedback in JSON format.

Reply: "{reply}"

Check for:
1. Clarity (is it easy to understand?)
2. Completeness (does it answer the question?)
3. Empathy (does it show understanding?)
4. Grammar and spelling
5. Professional tone

Return ONLY valid JSON in this exact format:
{{
  "score": 85,
  "issues": ["Issue 1", "Issue 2"],
  "suggestions": ["Suggestion 1", "Suggestion 2"]
}}

Score should be 0-100. If no issues, return empty arrays."#
    );

    vec![ChatMessage::system(QUALITY_SYSTEM), ChatMessage::user(prompt)]
}

fn or_default<'a>(value: &'a Option<String>, default: &'a str) -> &'a str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
}

pub fn suggestion(payload: &SuggestionPayload) -> Vec<ChatMessage> {
    let customer = or_default(&payload.customer_name, DEFAULT_CUSTOMER);
    let priority = or_default(&payload.priority, DEFAULT_PRIORITY);
    let category = or_default(&payload.category, DEFAULT_CATEGORY);
    let style = or_default(&payload.style, DEFAULT_STYLE);

    let mut context = format!("CUSTOMER: {}\n", customer);
    if let Some(email) = payload.customer_email.as_deref().filter(|e| !e.trim().is_empty()) {
        context.push_str(&format!("EMAIL: {}\n", email.trim()));
    }
    context.push_str(&format!(
        "PRIORITY: {}\nCATEGORY: {}\nSUBJECT: {}\nISSUE: {}",
        priority, category, payload.subject, payload.message
    ));

    let prompt = format!(
        "You are an expert customer support representative. Write a personalized response to \
this customer support ticket.

{context}

REQUIREMENTS:
1. Address the customer by their name ({customer})
2. Acknowledge THEIR SPECIFIC ISSUE, not a generic problem
3. Show empathy and understanding
4. Provide clear, actionable next steps
5. Maintain a {style} tone
6. Keep it concise (2-4 sentences)
7. NO generic templates or placeholders
8. NO \"Dear valued customer\" - be personal!
9. Reference specific details from their issue

WRITE ONLY THE RESPONSE, NO INTRODUCTION:"
    );

    vec![ChatMessage::system(SUGGESTION_SYSTEM), ChatMessage::user(prompt)]
}
