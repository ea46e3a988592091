//! Reddit content source.
//!
//! Treats a topic's keywords as subreddit names and pulls recent posts from
//! each via the Reddit OAuth API. Volume limiting lives here, not in the
//! orchestrator: posts are filtered to a recency window, capped per
//! subreddit, and near-empty posts are dropped.
//!
//! # Environment Variables
//!
//! Credentials are read from environment variables (script-app password
//! grant):
//! - `REDDIT_CLIENT_ID` — required
//! - `REDDIT_CLIENT_SECRET` — required
//! - `REDDIT_USERNAME` — required
//! - `REDDIT_PASSWORD` — required
//!
//! # Configuration
//!
//! ```toml
//! [sources.reddit]
//! user_agent = "idea-radar/0.3"
//! posts_per_keyword = 20
//! recency_days = 30
//! min_content_len = 50
//! ```
//!
//! # Failure Isolation
//!
//! A failing subreddit is logged and skipped; the adapter still returns
//! what the other subreddits produced. Only a failure to authenticate (no
//! token, no items yet) surfaces as an adapter-level error.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::RedditSourceConfig;
use crate::models::{ContentItem, Topic};
use crate::source::ContentSource;

pub struct RedditSource {
    config: RedditSourceConfig,
    client: reqwest::Client,
    /// OAuth token, fetched lazily on first use and reused afterwards.
    token: Mutex<Option<String>>,
}

impl RedditSource {
    pub fn new(config: &RedditSourceConfig) -> Result<Self> {
        for var in [
            "REDDIT_CLIENT_ID",
            "REDDIT_CLIENT_SECRET",
            "REDDIT_USERNAME",
            "REDDIT_PASSWORD",
        ] {
            if std::env::var(var).is_err() {
                bail!("{} environment variable not set", var);
            }
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            config: config.clone(),
            client,
            token: Mutex::new(None),
        })
    }

    /// Password-grant token request for a Reddit script app.
    async fn authenticate(&self) -> Result<String> {
        let client_id = std::env::var("REDDIT_CLIENT_ID")?;
        let client_secret = std::env::var("REDDIT_CLIENT_SECRET")?;
        let username = std::env::var("REDDIT_USERNAME")?;
        let password = std::env::var("REDDIT_PASSWORD")?;

        let response = self
            .client
            .post("https://www.reddit.com/api/v1/access_token")
            .basic_auth(&client_id, Some(&client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", username.as_str()),
                ("password", password.as_str()),
            ])
            .send()
            .await
            .context("Reddit token request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Reddit token request error {}: {}", status, body_text);
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Reddit token response was not valid JSON")?;

        Ok(token.access_token)
    }

    async fn token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(ref token) = *guard {
            return Ok(token.clone());
        }
        let token = self.authenticate().await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    /// Fetch, filter, and cap the newest posts from one subreddit.
    async fn fetch_subreddit(&self, token: &str, subreddit: &str) -> Result<Vec<ContentItem>> {
        let response = self
            .client
            .get(format!(
                "https://oauth.reddit.com/r/{}/new?limit=100",
                subreddit
            ))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("r/{} listing error {}: {}", subreddit, status, body_text);
        }

        let listing: Listing = response.json().await?;

        let cutoff = (Utc::now() - ChronoDuration::days(self.config.recency_days)).timestamp();
        let mut items = Vec::new();

        for child in listing.data.children {
            if items.len() >= self.config.posts_per_keyword {
                break;
            }

            let post = child.data;
            if (post.created_utc as i64) < cutoff {
                continue;
            }

            let text = format!("{}\n\n{}", post.title, post.selftext);
            if text.trim().len() < self.config.min_content_len {
                continue;
            }

            items.push(ContentItem {
                id: post.id,
                text,
                url: format!("https://reddit.com{}", post.permalink),
                source_type: "reddit".to_string(),
                metadata: serde_json::json!({
                    "subreddit": subreddit,
                    "author": post.author,
                    "score": post.score,
                    "created_utc": post.created_utc,
                }),
            });
        }

        Ok(items)
    }
}

#[async_trait]
impl ContentSource for RedditSource {
    fn name(&self) -> &str {
        "reddit"
    }

    async fn fetch_content(&self, topic: &Topic) -> Result<Vec<ContentItem>> {
        let subreddits = topic.keyword_set();
        if subreddits.is_empty() {
            info!(topic = %topic.name, "no subreddits configured for topic");
            return Ok(vec![]);
        }

        let token = self.token().await?;
        let mut content = Vec::new();

        for subreddit in &subreddits {
            match self.fetch_subreddit(&token, subreddit).await {
                Ok(items) => {
                    info!(subreddit = %subreddit, count = items.len(), "fetched posts");
                    content.extend(items);
                }
                Err(e) => {
                    warn!(subreddit = %subreddit, error = %e, "subreddit fetch failed, skipping");
                }
            }
        }

        info!(topic = %topic.name, total = content.len(), "reddit fetch complete");
        Ok(content)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Deserialize)]
struct ListingChild {
    data: Post,
}

#[derive(Deserialize)]
struct Post {
    id: String,
    title: String,
    #[serde(default)]
    selftext: String,
    permalink: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    created_utc: f64,
}
