//! Daily digest aggregation.
//!
//! A separate batch job, independent of synthesis: reads the ideas created
//! today and all subscriber preferences, assembles one digest per
//! subscriber, and dispatches it through the [`EmailSender`] collaborator.
//! Reads everything up front (two queries, no per-subscriber fan-out) and
//! writes nothing but outbound emails.
//!
//! Mirrors the synthesis job's resilience contract: per-subscriber failures
//! are caught and recorded, and [`DigestOrchestrator::run`] never fails.

use chrono::{Local, TimeZone, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::email::{digest_subject, render_digest, EmailSender};
use crate::models::{DigestIdea, Subscription};
use crate::store::IdeaStore;

/// Aggregate outcome of one digest run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DigestReport {
    pub emails_sent: u64,
    pub emails_skipped: u64,
    pub errors: Vec<String>,
}

/// Ideas for one topic, as displayed in a digest section.
#[derive(Debug, Clone)]
pub struct IdeaGroup {
    pub topic_id: i64,
    pub topic_name: String,
    pub ideas: Vec<DigestIdea>,
}

impl IdeaGroup {
    pub fn summed_score(&self) -> i64 {
        self.ideas.iter().map(|i| i.score).sum()
    }
}

pub struct DigestOrchestrator {
    store: Arc<dyn IdeaStore>,
    sender: Arc<dyn EmailSender>,
    app_url: String,
}

impl DigestOrchestrator {
    pub fn new(store: Arc<dyn IdeaStore>, sender: Arc<dyn EmailSender>, app_url: &str) -> Self {
        Self {
            store,
            sender,
            app_url: app_url.to_string(),
        }
    }

    /// Execute one digest run. Always returns a summary, never fails.
    pub async fn run(&self) -> DigestReport {
        info!("starting daily digest run");
        let mut report = DigestReport::default();

        let today_ideas = match self.store.ideas_since(start_of_today()).await {
            Ok(ideas) => ideas,
            Err(e) => {
                error!(error = %e, "failed to fetch today's ideas");
                report.errors.push(format!("failed to fetch ideas: {e:#}"));
                return report;
            }
        };

        // Fast path: without fresh ideas there is nothing to send, and the
        // subscription query is not even issued.
        if today_ideas.is_empty() {
            info!("no ideas created today, skipping digest");
            return report;
        }

        let subscriptions = match self.store.subscriptions_with_topics().await {
            Ok(subscriptions) => subscriptions,
            Err(e) => {
                error!(error = %e, "failed to fetch subscriptions");
                report
                    .errors
                    .push(format!("failed to fetch subscriptions: {e:#}"));
                return report;
            }
        };

        if subscriptions.is_empty() {
            info!("no subscriptions, skipping digest");
            return report;
        }

        let ideas_by_topic = index_by_topic(today_ideas);

        for subscription in &subscriptions {
            self.process_subscription(subscription, &ideas_by_topic, &mut report)
                .await;
        }

        info!(
            sent = report.emails_sent,
            skipped = report.emails_skipped,
            errors = report.errors.len(),
            "digest run complete"
        );
        report
    }

    async fn process_subscription(
        &self,
        subscription: &Subscription,
        ideas_by_topic: &HashMap<i64, Vec<DigestIdea>>,
        report: &mut DigestReport,
    ) {
        if subscription.topic_ids.is_empty() {
            info!(subscription = subscription.id, "no topic preferences, skipping");
            report.emails_skipped += 1;
            return;
        }

        let groups = build_groups(&subscription.topic_ids, ideas_by_topic);
        if groups.is_empty() {
            info!(email = %subscription.email, "no relevant ideas today, skipping");
            report.emails_skipped += 1;
            return;
        }

        let idea_count: usize = groups.iter().map(|g| g.ideas.len()).sum();
        let html = render_digest(subscription.id, &groups, &self.app_url);
        let subject = digest_subject(idea_count);

        let outcome = self.sender.send(&subscription.email, &subject, &html).await;
        if outcome.success {
            info!(email = %subscription.email, ideas = idea_count, "digest sent");
            report.emails_sent += 1;
        } else {
            let reason = outcome.error.unwrap_or_else(|| "unknown error".to_string());
            error!(email = %subscription.email, error = %reason, "digest send failed");
            report
                .errors
                .push(format!("{}: {}", subscription.email, reason));
        }
    }
}

/// Start of the current day in local time, for the "created today" window.
fn start_of_today() -> chrono::DateTime<Utc> {
    let midnight = Local::now().date_naive().and_hms_opt(0, 0, 0).unwrap();
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .unwrap_or_else(Local::now)
        .with_timezone(&Utc)
}

/// Index today's ideas by topic id for O(1) lookup per subscriber.
///
/// Within each topic the score-descending order of the source query is
/// preserved.
fn index_by_topic(ideas: Vec<DigestIdea>) -> HashMap<i64, Vec<DigestIdea>> {
    let mut map: HashMap<i64, Vec<DigestIdea>> = HashMap::new();
    for idea in ideas {
        map.entry(idea.topic_id).or_default().push(idea);
    }
    map
}

/// Assemble a subscriber's digest groups.
///
/// Groups are created in the order the subscriber's topics are listed, then
/// stably sorted by descending summed score so the most impactful topic
/// leads the digest. Ties keep their insertion order.
fn build_groups(
    topic_ids: &[i64],
    ideas_by_topic: &HashMap<i64, Vec<DigestIdea>>,
) -> Vec<IdeaGroup> {
    let mut groups: Vec<IdeaGroup> = Vec::new();

    for topic_id in topic_ids {
        let Some(ideas) = ideas_by_topic.get(topic_id) else {
            continue;
        };
        if ideas.is_empty() {
            continue;
        }
        groups.push(IdeaGroup {
            topic_id: *topic_id,
            topic_name: ideas[0].topic_name.clone(),
            ideas: ideas.clone(),
        });
    }

    // Vec::sort_by_key is stable, which makes tie order deterministic.
    groups.sort_by_key(|g| std::cmp::Reverse(g.summed_score()));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idea(topic_id: i64, topic_name: &str, name: &str, score: i64) -> DigestIdea {
        DigestIdea {
            id: 0,
            topic_id,
            topic_name: topic_name.to_string(),
            name: name.to_string(),
            pitch: "pitch".to_string(),
            key_pain_insight: "insight".to_string(),
            score,
        }
    }

    #[test]
    fn groups_sorted_by_summed_score_descending() {
        let ideas = vec![
            idea(1, "devops", "A", 90),
            idea(2, "fintech", "B", 60),
            idea(2, "fintech", "C", 50),
            idea(1, "devops", "D", 10),
        ];
        let map = index_by_topic(ideas);

        let groups = build_groups(&[1, 2], &map);
        // fintech sums to 110, devops to 100.
        assert_eq!(groups[0].topic_name, "fintech");
        assert_eq!(groups[1].topic_name, "devops");
    }

    #[test]
    fn score_order_within_group_preserved() {
        let ideas = vec![
            idea(1, "devops", "High", 90),
            idea(1, "devops", "Mid", 50),
            idea(1, "devops", "Low", 10),
        ];
        let map = index_by_topic(ideas);

        let groups = build_groups(&[1], &map);
        let names: Vec<&str> = groups[0].ideas.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["High", "Mid", "Low"]);
    }

    #[test]
    fn tied_sums_keep_insertion_order() {
        let ideas = vec![
            idea(1, "devops", "A", 50),
            idea(2, "fintech", "B", 50),
            idea(3, "legal", "C", 50),
        ];
        let map = index_by_topic(ideas);

        let groups = build_groups(&[3, 1, 2], &map);
        let order: Vec<i64> = groups.iter().map(|g| g.topic_id).collect();
        // All sums tie at 50; the subscriber's topic listing order holds.
        assert_eq!(order, vec![3, 1, 2]);

        // Re-running the grouping yields the identical ordering.
        let again: Vec<i64> = build_groups(&[3, 1, 2], &map)
            .iter()
            .map(|g| g.topic_id)
            .collect();
        assert_eq!(order, again);
    }

    #[test]
    fn topics_without_todays_ideas_are_dropped() {
        let ideas = vec![idea(3, "legal", "A", 40)];
        let map = index_by_topic(ideas);

        // Subscribed to topics 1 and 2; today's ideas only exist in topic 3.
        let groups = build_groups(&[1, 2], &map);
        assert!(groups.is_empty());
    }
}
