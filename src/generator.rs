//! Idea synthesis.
//!
//! Given a content item whose pain point already passed the analyzer, the
//! generator asks the completion service to either mint a NEW idea or
//! IMPROVE one of the topic's recent ideas, and post-processes the model's
//! chosen target against the existing-ideas projection.
//!
//! Target resolution: the model names its target and the name must match
//! an existing idea exactly (case-sensitive). A
//! non-matching name downgrades the action to NEW rather than trusting the
//! model. Model-returned numeric ids are never trusted directly.
//!
//! Unlike the analyzer, failures here propagate: once a pain point was
//! confirmed significant, a failed synthesis is a real error for that
//! content item, not a silent skip.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use crate::completion::{CompletionModel, CompletionRequest};
use crate::models::{ExistingIdea, IdeaAction, IdeaResult, MvpPlan, PainPointAnalysis};

/// Original content is truncated to this many characters before being
/// embedded in the prompt.
const MAX_CONTENT_CHARS: usize = 1000;

pub struct IdeaGenerator {
    completion: Arc<dyn CompletionModel>,
    request: CompletionRequest,
}

/// Shape of the model's JSON response before target resolution.
#[derive(Debug, Deserialize)]
struct RawIdeaResult {
    action: String,
    #[serde(default)]
    target_idea_name: Option<String>,
    name: String,
    pitch: String,
    key_pain_insight: String,
    score: i64,
    #[serde(default)]
    pain_points: Vec<String>,
    #[serde(default)]
    insights: Vec<String>,
    #[serde(default)]
    competitors: Vec<String>,
    mvp: MvpPlan,
}

impl IdeaGenerator {
    pub fn new(completion: Arc<dyn CompletionModel>, model: &str) -> Self {
        Self {
            completion,
            request: CompletionRequest {
                model: model.to_string(),
                temperature: 0.7,
            },
        }
    }

    /// Synthesize or refine an idea from a confirmed pain point.
    pub async fn generate(
        &self,
        topic_name: &str,
        existing_ideas: &[ExistingIdea],
        content_text: &str,
        analysis: &PainPointAnalysis,
    ) -> Result<IdeaResult> {
        let prompt = build_prompt(topic_name, existing_ideas);

        let context = serde_json::json!({
            "pain_point": analysis.explanation,
            "relevance_score": analysis.relevance,
            "original_content": truncate_chars(content_text, MAX_CONTENT_CHARS),
        });

        let raw_value = self
            .completion
            .generate_json(&prompt, &context, &self.request)
            .await
            .context("idea generation completion failed")?;

        let raw: RawIdeaResult = serde_json::from_value(raw_value)
            .context("idea generation returned a malformed payload")?;

        Ok(resolve_target(raw, existing_ideas))
    }
}

/// Map the model's chosen action and target name onto a typed result.
///
/// IMPROVE survives only when the target name matches an existing idea
/// exactly; otherwise the action degrades to NEW with no target.
fn resolve_target(raw: RawIdeaResult, existing_ideas: &[ExistingIdea]) -> IdeaResult {
    let (action, target_idea_id) = if raw.action == "IMPROVE" {
        let matched = raw
            .target_idea_name
            .as_deref()
            .and_then(|target| existing_ideas.iter().find(|idea| idea.name == target));

        match matched {
            Some(idea) => (IdeaAction::Improve, Some(idea.id)),
            None => {
                warn!(
                    target = raw.target_idea_name.as_deref().unwrap_or("<none>"),
                    "IMPROVE target not found among existing ideas, creating new idea instead"
                );
                (IdeaAction::New, None)
            }
        }
    } else {
        (IdeaAction::New, None)
    };

    IdeaResult {
        action,
        target_idea_id,
        name: raw.name,
        pitch: raw.pitch,
        key_pain_insight: raw.key_pain_insight,
        score: raw.score,
        pain_points: raw.pain_points,
        insights: raw.insights,
        competitors: raw.competitors,
        mvp: raw.mvp,
    }
}

fn build_prompt(topic_name: &str, existing_ideas: &[ExistingIdea]) -> String {
    let existing_list = if existing_ideas.is_empty() {
        "No existing ideas yet.".to_string()
    } else {
        existing_ideas
            .iter()
            .enumerate()
            .map(|(i, idea)| format!("{}. {}: {}", i + 1, idea.name, idea.pitch))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You are an expert SaaS product strategist and market analyst.

TOPIC: {topic_name}

CONTEXT - Existing ideas in this topic:
{existing_list}

TASK: Based on the pain point identified, either generate a NEW SaaS idea or suggest improvements to an EXISTING idea.

Analyze step by step:

1. PAIN POINT ANALYSIS
   - What is the core problem, who experiences it, and how often?

2. SOLUTION ASSESSMENT
   - Does this pain point match any existing idea above?
   - If yes, how should that idea improve? (Use the EXACT name from the list above)
   - If no, what new solution would address it?

3. MARKET EVALUATION
   - Novelty, market size, and willingness to pay.

4. FEASIBILITY
   - MVP complexity, initial investment, and time to market.

5. COMPETITIVE LANDSCAPE
   - Specific existing solutions and the gaps they leave.

6. MVP DEFINITION
   - Minimal scope to validate the idea, essential components, realistic timeline.

Respond with a strict JSON object:
{{
  "action": "NEW" | "IMPROVE",
  "target_idea_name": "EXACT name of the existing idea if improving (must match the list above), null otherwise",
  "name": "short, catchy product name (if IMPROVE, use target_idea_name)",
  "pitch": "one sentence value proposition",
  "key_pain_insight": "the core insight about the pain point",
  "score": number (0-100, weighing novelty, market size, feasibility, investment needs),
  "pain_points": ["specific pain points"],
  "insights": ["key user observations"],
  "competitors": ["specific competitors"],
  "mvp": {{
    "scope": "minimal scope to validate the idea",
    "components": ["essential components"],
    "estimated_time": "realistic implementation estimate"
  }}
}}

PAIN POINT DATA:"#
    )
}

/// Truncate on a char boundary; byte-index slicing would panic on
/// multi-byte content.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct FixedCompletion(Result<Value, String>);

    #[async_trait]
    impl CompletionModel for FixedCompletion {
        async fn generate_json(
            &self,
            _prompt: &str,
            _context: &Value,
            _request: &CompletionRequest,
        ) -> Result<Value> {
            match &self.0 {
                Ok(v) => Ok(v.clone()),
                Err(e) => Err(anyhow::anyhow!("{}", e)),
            }
        }
    }

    fn generator_with(outcome: Result<Value, String>) -> IdeaGenerator {
        IdeaGenerator::new(Arc::new(FixedCompletion(outcome)), "test-model")
    }

    fn existing() -> Vec<ExistingIdea> {
        vec![
            ExistingIdea {
                id: 11,
                name: "InvoiceChaser".to_string(),
                pitch: "Automated invoice follow-ups".to_string(),
            },
            ExistingIdea {
                id: 12,
                name: "StandupBot".to_string(),
                pitch: "Async standups".to_string(),
            },
        ]
    }

    fn model_response(action: &str, target: Option<&str>) -> Value {
        json!({
            "action": action,
            "target_idea_name": target,
            "name": "InvoiceChaser",
            "pitch": "Automated invoice follow-ups, now with reminders",
            "key_pain_insight": "Freelancers hate chasing payments",
            "score": 72,
            "pain_points": ["late payments"],
            "insights": ["recurring complaint"],
            "competitors": ["spreadsheets"],
            "mvp": {
                "scope": "email reminder loop",
                "components": ["scheduler", "templates"],
                "estimated_time": "3 weeks"
            }
        })
    }

    #[tokio::test]
    async fn improve_with_exact_match_resolves_target_id() {
        let generator = generator_with(Ok(model_response("IMPROVE", Some("InvoiceChaser"))));
        let analysis = PainPointAnalysis {
            has_pain_point: true,
            explanation: Some("late payments".to_string()),
            relevance: Some(9),
        };

        let result = generator
            .generate("freelancing", &existing(), "content", &analysis)
            .await
            .unwrap();
        assert_eq!(result.action, IdeaAction::Improve);
        assert_eq!(result.target_idea_id, Some(11));
    }

    #[tokio::test]
    async fn improve_with_unknown_target_degrades_to_new() {
        let generator = generator_with(Ok(model_response("IMPROVE", Some("PaymentPal"))));
        let analysis = PainPointAnalysis::default();

        let result = generator
            .generate("freelancing", &existing(), "content", &analysis)
            .await
            .unwrap();
        assert_eq!(result.action, IdeaAction::New);
        assert_eq!(result.target_idea_id, None);
    }

    #[tokio::test]
    async fn target_matching_is_case_sensitive() {
        let generator = generator_with(Ok(model_response("IMPROVE", Some("invoicechaser"))));
        let result = generator
            .generate("freelancing", &existing(), "content", &PainPointAnalysis::default())
            .await
            .unwrap();
        assert_eq!(result.action, IdeaAction::New);
        assert!(result.target_idea_id.is_none());
    }

    #[tokio::test]
    async fn new_action_never_carries_a_target() {
        let generator = generator_with(Ok(model_response("NEW", Some("InvoiceChaser"))));
        let result = generator
            .generate("freelancing", &existing(), "content", &PainPointAnalysis::default())
            .await
            .unwrap();
        assert_eq!(result.action, IdeaAction::New);
        assert!(result.target_idea_id.is_none());
    }

    #[tokio::test]
    async fn malformed_payload_propagates_error() {
        // The completion client collapses unparsable bodies to {}, which is
        // missing every required field.
        let generator = generator_with(Ok(json!({})));
        let err = generator
            .generate("freelancing", &[], "content", &PainPointAnalysis::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }

    #[tokio::test]
    async fn transport_failure_propagates_error() {
        let generator = generator_with(Err("gateway timeout".to_string()));
        assert!(generator
            .generate("freelancing", &[], "content", &PainPointAnalysis::default())
            .await
            .is_err());
    }

    #[test]
    fn prompt_lists_existing_ideas_numbered() {
        let prompt = build_prompt("freelancing", &existing());
        assert!(prompt.contains("1. InvoiceChaser: Automated invoice follow-ups"));
        assert!(prompt.contains("2. StandupBot: Async standups"));
    }

    #[test]
    fn prompt_marks_empty_idea_list() {
        let prompt = build_prompt("freelancing", &[]);
        assert!(prompt.contains("No existing ideas yet."));
    }

    #[test]
    fn truncation_is_char_boundary_safe() {
        let text = "é".repeat(1200);
        let truncated = truncate_chars(&text, MAX_CONTENT_CHARS);
        assert_eq!(truncated.chars().count(), 1000);
    }
}
