//! Content source adapter contract.
//!
//! A [`ContentSource`] is a pluggable fetcher for one external content
//! source (Reddit today; other social or forum APIs later). The synthesis
//! orchestrator treats every adapter uniformly: it asks for content per
//! topic and isolates adapter failures at its own loop level.
//!
//! # Contract
//!
//! - "No results" is an empty list, never an error.
//! - `Err` is reserved for transport-level failure; the caller records it
//!   and moves to the next adapter.
//! - Each implementation owns its own rate/volume limiting (per-keyword
//!   caps, recency windows, minimum content length). The orchestrator is
//!   unaware of source-specific limits.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ContentItem, Topic};

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Short source label used in logs and error entries (e.g. `"reddit"`).
    fn name(&self) -> &str;

    /// Fetch content items relevant to a topic.
    async fn fetch_content(&self, topic: &Topic) -> Result<Vec<ContentItem>>;
}
