//! Persistence surface for the synthesis and digest pipelines.
//!
//! Both orchestrators receive an [`IdeaStore`] rather than a raw pool so
//! tests can substitute in-memory fakes. [`SqliteStore`] is the production
//! implementation; every method is a single-row or single-relation
//! statement, no multi-statement transactions (see the crate docs on the
//! best-effort idea/source pairing).

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::models::{DigestIdea, ExistingIdea, IdeaResult, Subscription, Topic};

/// Minimum storage surface the pipelines need.
#[async_trait]
pub trait IdeaStore: Send + Sync {
    /// All topics, in id order.
    async fn list_topics(&self) -> Result<Vec<Topic>>;

    /// Ideas created for a topic since `since`, newest first — the
    /// refinement-target projection offered to the generator.
    async fn recent_ideas(&self, topic_id: i64, since: DateTime<Utc>) -> Result<Vec<ExistingIdea>>;

    /// Insert a freshly generated idea; returns the new row id.
    async fn insert_idea(&self, topic_id: i64, idea: &IdeaResult) -> Result<i64>;

    /// Refine an existing idea. Only pitch, key insight, score, and the MVP
    /// sketch are mutable; name and id never change.
    async fn update_idea(&self, idea_id: i64, idea: &IdeaResult) -> Result<()>;

    /// Append one source row to an idea's audit trail.
    async fn insert_idea_source(&self, idea_id: i64, source_type: &str, url: &str) -> Result<()>;

    /// Ideas created at or after `cutoff`, topic joined, score descending.
    async fn ideas_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<DigestIdea>>;

    /// All subscriptions with their linked topic ids, in one pass.
    async fn subscriptions_with_topics(&self) -> Result<Vec<Subscription>>;

    /// Delete a subscription. Idempotent — a missing id is not an error.
    async fn delete_subscription(&self, subscription_id: i64) -> Result<()>;

    /// Register a topic (admin CLI).
    async fn insert_topic(&self, name: &str, keywords: &str) -> Result<i64>;
}

/// SQLite-backed store used by the `radar` binary.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl IdeaStore for SqliteStore {
    async fn list_topics(&self) -> Result<Vec<Topic>> {
        let rows = sqlx::query("SELECT id, name, keywords FROM topics ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| Topic {
                id: row.get("id"),
                name: row.get("name"),
                keywords: row.get("keywords"),
            })
            .collect())
    }

    async fn recent_ideas(&self, topic_id: i64, since: DateTime<Utc>) -> Result<Vec<ExistingIdea>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, pitch FROM ideas
            WHERE topic_id = ? AND created_at >= ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(topic_id)
        .bind(since.timestamp())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ExistingIdea {
                id: row.get("id"),
                name: row.get("name"),
                pitch: row.get("pitch"),
            })
            .collect())
    }

    async fn insert_idea(&self, topic_id: i64, idea: &IdeaResult) -> Result<i64> {
        let mvp_json = serde_json::to_string(&idea.mvp)?;
        let result = sqlx::query(
            r#"
            INSERT INTO ideas (topic_id, name, pitch, key_pain_insight, score, mvp_json, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(topic_id)
        .bind(&idea.name)
        .bind(&idea.pitch)
        .bind(&idea.key_pain_insight)
        .bind(idea.score)
        .bind(mvp_json)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn update_idea(&self, idea_id: i64, idea: &IdeaResult) -> Result<()> {
        let mvp_json = serde_json::to_string(&idea.mvp)?;
        sqlx::query(
            r#"
            UPDATE ideas
            SET pitch = ?, key_pain_insight = ?, score = ?, mvp_json = ?
            WHERE id = ?
            "#,
        )
        .bind(&idea.pitch)
        .bind(&idea.key_pain_insight)
        .bind(idea.score)
        .bind(mvp_json)
        .bind(idea_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_idea_source(&self, idea_id: i64, source_type: &str, url: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO idea_sources (idea_id, source_type, url, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(idea_id)
        .bind(source_type)
        .bind(url)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn ideas_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<DigestIdea>> {
        let rows = sqlx::query(
            r#"
            SELECT i.id, i.topic_id, t.name AS topic_name, i.name, i.pitch,
                   i.key_pain_insight, i.score
            FROM ideas i
            JOIN topics t ON t.id = i.topic_id
            WHERE i.created_at >= ?
            ORDER BY i.score DESC, i.id
            "#,
        )
        .bind(cutoff.timestamp())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| DigestIdea {
                id: row.get("id"),
                topic_id: row.get("topic_id"),
                topic_name: row.get("topic_name"),
                name: row.get("name"),
                pitch: row.get("pitch"),
                key_pain_insight: row.get("key_pain_insight"),
                score: row.get("score"),
            })
            .collect())
    }

    async fn subscriptions_with_topics(&self) -> Result<Vec<Subscription>> {
        let rows = sqlx::query(
            r#"
            SELECT s.id, s.owner_id, s.email, st.topic_id
            FROM subscriptions s
            LEFT JOIN subscription_topics st ON st.subscription_id = s.id
            ORDER BY s.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut subscriptions: Vec<Subscription> = Vec::new();
        for row in rows {
            let id: i64 = row.get("id");
            let topic_id: Option<i64> = row.get("topic_id");

            match subscriptions.last_mut() {
                Some(last) if last.id == id => {
                    if let Some(tid) = topic_id {
                        last.topic_ids.push(tid);
                    }
                }
                _ => subscriptions.push(Subscription {
                    id,
                    owner_id: row.get("owner_id"),
                    email: row.get("email"),
                    topic_ids: topic_id.into_iter().collect(),
                }),
            }
        }

        Ok(subscriptions)
    }

    async fn delete_subscription(&self, subscription_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM subscriptions WHERE id = ?")
            .bind(subscription_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn insert_topic(&self, name: &str, keywords: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO topics (name, keywords) VALUES (?, ?)")
            .bind(name)
            .bind(keywords)
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }
}
