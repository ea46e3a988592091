//! Pain-point screening.
//!
//! The analyzer is the cheap first gate of the synthesis pipeline: every
//! fetched content item passes through it, and only items containing a
//! strong, monetizable problem continue to the (more expensive) generator.
//!
//! Detection is best-effort. A completion that fails in transport
//! or comes back malformed is logged and treated as "not significant" — it
//! must never abort the surrounding pipeline. This is the opposite of the
//! generator's contract, where a failure after a confirmed pain point is a
//! real error.

use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::completion::{CompletionModel, CompletionRequest};
use crate::models::PainPointAnalysis;

/// Relevance scores at or below this are discarded.
const RELEVANCE_THRESHOLD: u8 = 7;

const ANALYSIS_PROMPT: &str = r#"You are an expert at identifying business pain points in social media discussions.

Analyze the following content and determine whether it contains a genuine pain point that could be solved by a SaaS product.

A valid pain point is:
- A real problem or frustration expressed by users
- Something that causes inefficiency, wasted time, or money
- A gap in existing solutions
- A repetitive manual task that could be automated

Respond with a strict JSON object:
{
  "has_pain_point": boolean,
  "explanation": "brief explanation of the pain point if found",
  "relevance": number (1-10, how strong the pain point is)
}

Think step by step:
1. What problem is being discussed?
2. Is this a real, actionable problem or just venting?
3. Do existing solutions already solve it completely?
4. Would a SaaS solution make sense here?
5. How urgent does this seem?

Content:"#;

pub struct PainPointAnalyzer {
    completion: Arc<dyn CompletionModel>,
    request: CompletionRequest,
}

impl PainPointAnalyzer {
    pub fn new(completion: Arc<dyn CompletionModel>, model: &str) -> Self {
        Self {
            completion,
            request: CompletionRequest {
                model: model.to_string(),
                // Deterministic screening; creativity belongs to the generator.
                temperature: 0.0,
            },
        }
    }

    /// Screen one content item.
    ///
    /// Returns `Some` only for analyses whose relevance is strictly greater
    /// than the acceptance threshold. Transport failures, malformed
    /// completions, and weak signals all collapse to `None`.
    pub async fn analyze(&self, content: &str) -> Option<PainPointAnalysis> {
        let context = Value::String(content.to_string());

        let raw = match self
            .completion
            .generate_json(ANALYSIS_PROMPT, &context, &self.request)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "pain point analysis failed, treating as not significant");
                return None;
            }
        };

        let analysis: PainPointAnalysis = match serde_json::from_value(raw) {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(error = %e, "malformed analysis payload, treating as not significant");
                return None;
            }
        };

        match analysis.relevance {
            Some(r) if r > RELEVANCE_THRESHOLD => Some(analysis),
            _ => None,
        }
    }
}
