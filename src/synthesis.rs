//! Idea synthesis orchestration.
//!
//! Coordinates the full pipeline per run: topic enumeration → adapter
//! fan-out → pain-point analysis → idea generation → persistence. Runs
//! strictly sequentially — topics, adapters, and content items are
//! processed one at a time, which bounds load on the completion service and
//! keeps the idea/source insert pair free of interleaving writes.
//!
//! # Error Isolation
//!
//! Failures are caught at three layers and recorded as text in the run
//! summary: a content-item failure moves on to the next item, an
//! adapter failure to the next adapter, a topic failure to the next topic.
//! [`SynthesisOrchestrator::run`] never fails; even an unreachable store
//! before topic enumeration comes back as a summary with one error entry,
//! so a fire-and-forget scheduled trigger can always consume the result.

use chrono::{Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::analyzer::PainPointAnalyzer;
use crate::generator::IdeaGenerator;
use crate::models::{ContentItem, ExistingIdea, IdeaAction, Topic};
use crate::source::ContentSource;
use crate::store::IdeaStore;
use crate::throttle::Throttle;

/// Aggregate outcome of one synthesis run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SynthesisReport {
    pub topics_processed: u64,
    pub ideas_created: u64,
    pub ideas_updated: u64,
    pub sources_logged: u64,
    pub errors: Vec<String>,
}

pub struct SynthesisOrchestrator {
    store: Arc<dyn IdeaStore>,
    sources: Vec<Arc<dyn ContentSource>>,
    analyzer: PainPointAnalyzer,
    generator: IdeaGenerator,
    throttle: Throttle,
    existing_ideas_window: ChronoDuration,
}

impl SynthesisOrchestrator {
    pub fn new(
        store: Arc<dyn IdeaStore>,
        sources: Vec<Arc<dyn ContentSource>>,
        analyzer: PainPointAnalyzer,
        generator: IdeaGenerator,
        throttle: Throttle,
        existing_ideas_window_days: i64,
    ) -> Self {
        Self {
            store,
            sources,
            analyzer,
            generator,
            throttle,
            existing_ideas_window: ChronoDuration::days(existing_ideas_window_days),
        }
    }

    /// Execute one synthesis run. Always returns a summary, never fails.
    pub async fn run(&self) -> SynthesisReport {
        info!("starting idea synthesis run");
        let mut report = SynthesisReport::default();

        let topics = match self.store.list_topics().await {
            Ok(topics) => topics,
            Err(e) => {
                error!(error = %e, "failed to enumerate topics, aborting run");
                report.errors.push(format!("failed to fetch topics: {e:#}"));
                return report;
            }
        };

        if topics.is_empty() {
            info!("no topics registered, nothing to do");
            return report;
        }

        for topic in &topics {
            match self.process_topic(topic, &mut report).await {
                Ok(()) => report.topics_processed += 1,
                Err(e) => {
                    error!(topic = %topic.name, error = %e, "topic processing failed");
                    report.errors.push(format!("topic {}: {e:#}", topic.name));
                }
            }
        }

        info!(
            topics = report.topics_processed,
            created = report.ideas_created,
            updated = report.ideas_updated,
            sources = report.sources_logged,
            errors = report.errors.len(),
            "synthesis run complete"
        );
        report
    }

    async fn process_topic(&self, topic: &Topic, report: &mut SynthesisReport) -> anyhow::Result<()> {
        info!(topic = %topic.name, "processing topic");

        // One projection per topic; ideas created mid-run are deliberately
        // not offered as refinement targets until the next run.
        let since = Utc::now() - self.existing_ideas_window;
        let existing_ideas = self.store.recent_ideas(topic.id, since).await?;

        for source in &self.sources {
            let items = match source.fetch_content(topic).await {
                Ok(items) => items,
                Err(e) => {
                    error!(source = source.name(), error = %e, "adapter fetch failed");
                    report.errors.push(format!("{}: {e:#}", source.name()));
                    continue;
                }
            };

            for item in &items {
                match self.process_item(topic, item, &existing_ideas, report).await {
                    Ok(()) => self.throttle.wait().await,
                    Err(e) => {
                        error!(source = source.name(), item = %item.id, error = %e, "item processing failed");
                        report
                            .errors
                            .push(format!("{} {}: {e:#}", source.name(), item.id));
                    }
                }
            }
        }

        Ok(())
    }

    async fn process_item(
        &self,
        topic: &Topic,
        item: &ContentItem,
        existing_ideas: &[ExistingIdea],
        report: &mut SynthesisReport,
    ) -> anyhow::Result<()> {
        let Some(analysis) = self.analyzer.analyze(&item.text).await else {
            return Ok(());
        };

        info!(
            item = %item.id,
            explanation = analysis.explanation.as_deref().unwrap_or(""),
            "significant pain point found"
        );

        let idea = self
            .generator
            .generate(&topic.name, existing_ideas, &item.text, &analysis)
            .await?;

        let idea_id = match idea.action {
            IdeaAction::New => {
                let idea_id = self.store.insert_idea(topic.id, &idea).await?;
                report.ideas_created += 1;
                info!(idea = %idea.name, id = idea_id, "created new idea");
                idea_id
            }
            IdeaAction::Improve => {
                let Some(target_id) = idea.target_idea_id else {
                    // The generator downgrades unmatched targets to NEW, so
                    // this should not happen; guarded anyway.
                    warn!(idea = %idea.name, "IMPROVE without resolved target, skipping");
                    return Ok(());
                };
                self.store.update_idea(target_id, &idea).await?;
                report.ideas_updated += 1;
                info!(idea = %idea.name, id = target_id, "refined existing idea");
                target_id
            }
        };

        // Refinement is itself evidence: every contributing item gets a
        // source row. A failed source insert never rolls back the idea.
        match self
            .store
            .insert_idea_source(idea_id, &item.source_type, &item.url)
            .await
        {
            Ok(()) => report.sources_logged += 1,
            Err(e) => {
                warn!(idea = idea_id, error = %e, "idea persisted but source insert failed");
                report
                    .errors
                    .push(format!("source insert for idea {idea_id}: {e:#}"));
            }
        }

        Ok(())
    }
}
