//! Reply quality results and the parse-or-default contract.
//!
//! The generation service answers in free text that usually, but not always, embeds a JSON
//! object. Parsing never fails: anything that cannot be read yields
//! [`QualityCheckResult::fallback`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Advisory attached to the fallback result.
pub const FALLBACK_SUGGESTION: &str = "Could not analyze reply completely";

/// Score assigned when the reply could not be analyzed.
pub const FALLBACK_SCORE: u8 = 75;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityCheckResult {
    pub score: u8,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

#[derive(Deserialize)]
struct RawQuality {
    score: f64,
    #[serde(default)]
    issues: Vec<String>,
    #[serde(default)]
    suggestions: Vec<String>,
}

fn json_object_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    // Greedy: first '{' through last '}'.
    PATTERN
        .get_or_init(|| Regex::new(r"\{[\s\S]*\}").ok())
        .as_ref()
}

impl QualityCheckResult {
    pub fn fallback() -> Self {
        Self {
            score: FALLBACK_SCORE,
            issues: Vec::new(),
            suggestions: vec![FALLBACK_SUGGESTION.to_string()],
        }
    }

    /// Extract the first brace-delimited substring of `reply` and parse it, or fall back.
    pub fn parse_or_default(reply: &str) -> Self {
        let Some(candidate) = json_object_pattern().and_then(|p| p.find(reply)) else {
            debug!("Quality reply contains no JSON object");
            return Self::fallback();
        };

        match serde_json::from_str::<RawQuality>(candidate.as_str()) {
            Ok(raw) if raw.score.is_finite() => Self {
                score: raw.score.round().clamp(0.0, 100.0) as u8,
                issues: raw.issues,
                suggestions: raw.suggestions,
            },
            Ok(_) => {
                warn!("Quality reply carried a non-finite score");
                Self::fallback()
            }
            Err(e) => {
                warn!(error = %e, "Quality reply JSON could not be parsed");
                Self::fallback()
            }
        }
    }
}
