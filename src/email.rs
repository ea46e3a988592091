//! Email dispatch and digest rendering.
//!
//! [`EmailSender`] is the outbound contract the digest job depends on: it
//! never fails — delivery problems are reported through [`SendOutcome`] so
//! the caller can record them and keep processing subscribers.
//! [`ResendSender`] is the production implementation on top of the Resend
//! HTTP API; tests substitute recording fakes.

use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

use crate::digest::IdeaGroup;

/// Result value of a send attempt. Failures are data, not errors.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl SendOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> SendOutcome;
}

/// Email sender backed by the Resend API.
///
/// Requires the `RESEND_API_KEY` environment variable.
pub struct ResendSender {
    client: reqwest::Client,
    from: String,
}

impl ResendSender {
    pub fn new(from: &str) -> anyhow::Result<Self> {
        if std::env::var("RESEND_API_KEY").is_err() {
            anyhow::bail!("RESEND_API_KEY environment variable not set");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            from: from.to_string(),
        })
    }
}

#[async_trait]
impl EmailSender for ResendSender {
    async fn send(&self, to: &str, subject: &str, html: &str) -> SendOutcome {
        let api_key = std::env::var("RESEND_API_KEY").unwrap_or_default();
        let body = serde_json::json!({
            "from": self.from,
            "to": [to],
            "subject": subject,
            "html": html,
        });

        let response = self
            .client
            .post("https://api.resend.com/emails")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => SendOutcome::ok(),
            Ok(response) => {
                let status = response.status();
                let body_text = response.text().await.unwrap_or_default();
                warn!(%status, "email send rejected");
                SendOutcome::failed(format!("Resend API error {}: {}", status, body_text))
            }
            Err(e) => {
                warn!(error = %e, "email send failed");
                SendOutcome::failed(e.to_string())
            }
        }
    }
}

/// Digest subject line, with singular/plural handling.
pub fn digest_subject(idea_count: usize) -> String {
    format!(
        "Your Daily Idea Digest - {} New {}",
        idea_count,
        if idea_count == 1 { "Idea" } else { "Ideas" }
    )
}

/// Render the per-subscriber digest as a self-contained HTML document.
///
/// One section per topic group, in the order the caller sorted them;
/// unsubscribe link at the bottom driven by the idempotent unsubscribe
/// endpoint.
pub fn render_digest(subscription_id: i64, groups: &[IdeaGroup], app_url: &str) -> String {
    let mut sections = String::new();

    for group in groups {
        sections.push_str(&format!(
            "<h2 style=\"color:#1f2937;border-bottom:1px solid #e5e7eb;padding-bottom:4px;\">{}</h2>\n",
            escape_html(&group.topic_name)
        ));
        for idea in &group.ideas {
            sections.push_str(&format!(
                concat!(
                    "<div style=\"margin:12px 0;padding:12px;border:1px solid #e5e7eb;border-radius:8px;\">\n",
                    "<h3 style=\"margin:0 0 4px;\">{} <span style=\"color:#6b7280;font-weight:normal;\">({}/100)</span></h3>\n",
                    "<p style=\"margin:0 0 6px;\">{}</p>\n",
                    "<p style=\"margin:0;color:#6b7280;font-size:14px;\">{}</p>\n",
                    "</div>\n",
                ),
                escape_html(&idea.name),
                idea.score,
                escape_html(&idea.pitch),
                escape_html(&idea.key_pain_insight),
            ));
        }
    }

    format!(
        concat!(
            "<!DOCTYPE html>\n<html>\n<body style=\"font-family:-apple-system,Segoe UI,Roboto,Arial,sans-serif;",
            "max-width:600px;margin:0 auto;padding:24px;color:#111827;\">\n",
            "<h1 style=\"font-size:22px;\">Your Daily Idea Digest</h1>\n",
            "{}",
            "<p style=\"margin-top:24px;font-size:12px;color:#9ca3af;\">",
            "<a href=\"{}/ideas\" style=\"color:#6b7280;\">Browse all ideas</a> · ",
            "<a href=\"{}/subscriptions/{}\" style=\"color:#6b7280;\">Unsubscribe</a>",
            "</p>\n</body>\n</html>\n",
        ),
        sections, app_url, app_url, subscription_id
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DigestIdea;

    fn idea(name: &str, score: i64) -> DigestIdea {
        DigestIdea {
            id: 1,
            topic_id: 1,
            topic_name: "devops".to_string(),
            name: name.to_string(),
            pitch: "pitch".to_string(),
            key_pain_insight: "insight".to_string(),
            score,
        }
    }

    #[test]
    fn subject_pluralizes() {
        assert_eq!(digest_subject(1), "Your Daily Idea Digest - 1 New Idea");
        assert_eq!(digest_subject(3), "Your Daily Idea Digest - 3 New Ideas");
    }

    #[test]
    fn digest_contains_topics_ideas_and_unsubscribe_link() {
        let groups = vec![IdeaGroup {
            topic_id: 1,
            topic_name: "devops".to_string(),
            ideas: vec![idea("PipelinePal", 81)],
        }];
        let html = render_digest(42, &groups, "https://radar.example.com");
        assert!(html.contains("devops"));
        assert!(html.contains("PipelinePal"));
        assert!(html.contains("(81/100)"));
        assert!(html.contains("https://radar.example.com/subscriptions/42"));
    }

    #[test]
    fn idea_text_is_html_escaped() {
        let groups = vec![IdeaGroup {
            topic_id: 1,
            topic_name: "a & b".to_string(),
            ideas: vec![idea("<script>", 10)],
        }];
        let html = render_digest(1, &groups, "https://radar.example.com");
        assert!(html.contains("a &amp; b"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }
}
