//! Core data models used throughout Idea Radar.
//!
//! These types represent the topics, content items, analyses, and ideas that
//! flow through the synthesis and digest pipelines.

use serde::{Deserialize, Serialize};

/// A subscriber-facing category with associated search keywords.
///
/// Owned by the persistence store; read-only to both pipelines.
#[derive(Debug, Clone)]
pub struct Topic {
    pub id: i64,
    pub name: String,
    /// Comma-separated search terms / source identifiers.
    pub keywords: String,
}

impl Topic {
    /// Split the comma-separated keyword list into trimmed, non-empty terms.
    pub fn keyword_set(&self) -> Vec<String> {
        self.keywords
            .split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect()
    }
}

/// An ephemeral unit of fetched content produced by a content source.
///
/// Created by an adapter call, consumed within one pipeline iteration,
/// never persisted verbatim.
#[derive(Debug, Clone)]
pub struct ContentItem {
    pub id: String,
    pub text: String,
    pub url: String,
    pub source_type: String,
    pub metadata: serde_json::Value,
}

/// Result of running the pain-point analyzer over one content item.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PainPointAnalysis {
    #[serde(default)]
    pub has_pain_point: bool,
    #[serde(default)]
    pub explanation: Option<String>,
    /// 1–10 strength of the pain point, as judged by the model.
    #[serde(default)]
    pub relevance: Option<u8>,
}

/// Minimal projection of an idea offered to the generator as a refinement
/// target. Restricted to ideas created in a trailing window so prompts stay
/// bounded and stale merges are avoided.
#[derive(Debug, Clone)]
pub struct ExistingIdea {
    pub id: i64,
    pub name: String,
    pub pitch: String,
}

/// Whether the generator minted a new idea or refined an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdeaAction {
    New,
    Improve,
}

/// Minimum-viable-product sketch attached to every generated idea.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MvpPlan {
    pub scope: String,
    #[serde(default)]
    pub components: Vec<String>,
    pub estimated_time: String,
}

/// The generator's output before persistence.
///
/// `target_idea_id` is only set for [`IdeaAction::Improve`] and only after
/// the model-returned name was resolved against the existing-ideas
/// projection by exact match.
#[derive(Debug, Clone)]
pub struct IdeaResult {
    pub action: IdeaAction,
    pub target_idea_id: Option<i64>,
    pub name: String,
    pub pitch: String,
    pub key_pain_insight: String,
    /// 0–100 composite of novelty, market size, and feasibility.
    pub score: i64,
    pub pain_points: Vec<String>,
    pub insights: Vec<String>,
    pub competitors: Vec<String>,
    pub mvp: MvpPlan,
}

/// A persisted idea joined with its topic, as read by the digest job.
#[derive(Debug, Clone)]
pub struct DigestIdea {
    pub id: i64,
    pub topic_id: i64,
    pub topic_name: String,
    pub name: String,
    pub pitch: String,
    pub key_pain_insight: String,
    pub score: i64,
}

/// A digest subscription together with its linked topic ids.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: i64,
    pub owner_id: String,
    pub email: String,
    pub topic_ids: Vec<i64>,
}
