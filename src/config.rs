use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub email: EmailConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Fast, cheap model used for per-item pain-point screening.
    #[serde(default = "default_analyzer_model")]
    pub analyzer_model: String,
    /// More capable model used for idea synthesis.
    #[serde(default = "default_generator_model")]
    pub generator_model: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            analyzer_model: default_analyzer_model(),
            generator_model: default_generator_model(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}
fn default_analyzer_model() -> String {
    "google/gemini-2.5-flash-lite".to_string()
}
fn default_generator_model() -> String {
    "google/gemini-2.5-flash".to_string()
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Delay between processed content items, protecting the completion
    /// service and content sources from burst load.
    #[serde(default = "default_processing_delay_ms")]
    pub processing_delay_ms: u64,
    /// Trailing window of ideas offered to the generator as refinement
    /// targets.
    #[serde(default = "default_existing_ideas_window_days")]
    pub existing_ideas_window_days: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            processing_delay_ms: default_processing_delay_ms(),
            existing_ideas_window_days: default_existing_ideas_window_days(),
        }
    }
}

fn default_processing_delay_ms() -> u64 {
    1000
}
fn default_existing_ideas_window_days() -> i64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    /// `"disabled"` or `"resend"`.
    #[serde(default = "default_email_provider")]
    pub provider: String,
    #[serde(default)]
    pub from: Option<String>,
    /// Base URL embedded in digest links (unsubscribe, idea browser).
    #[serde(default = "default_app_url")]
    pub app_url: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            provider: default_email_provider(),
            from: None,
            app_url: default_app_url(),
        }
    }
}

impl EmailConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_email_provider() -> String {
    "disabled".to_string()
}
fn default_app_url() -> String {
    "http://localhost:7410".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SourcesConfig {
    pub reddit: Option<RedditSourceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedditSourceConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Cap on posts taken per subreddit, keeping well inside rate limits.
    #[serde(default = "default_posts_per_keyword")]
    pub posts_per_keyword: usize,
    /// Posts older than this many days are discarded.
    #[serde(default = "default_recency_days")]
    pub recency_days: i64,
    /// Posts with less text than this are discarded as near-empty.
    #[serde(default = "default_min_content_len")]
    pub min_content_len: usize,
}

fn default_user_agent() -> String {
    "idea-radar/0.3".to_string()
}
fn default_posts_per_keyword() -> usize {
    20
}
fn default_recency_days() -> i64 {
    30
}
fn default_min_content_len() -> usize {
    50
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.pipeline.existing_ideas_window_days < 1 {
        anyhow::bail!("pipeline.existing_ideas_window_days must be >= 1");
    }

    if config.llm.timeout_secs == 0 {
        anyhow::bail!("llm.timeout_secs must be > 0");
    }

    match config.email.provider.as_str() {
        "disabled" => {}
        "resend" => {
            if config.email.from.is_none() {
                anyhow::bail!("email.from must be specified when provider is 'resend'");
            }
        }
        other => anyhow::bail!(
            "Unknown email provider: '{}'. Must be disabled or resend.",
            other
        ),
    }

    if let Some(ref reddit) = config.sources.reddit {
        if reddit.posts_per_keyword == 0 {
            anyhow::bail!("sources.reddit.posts_per_keyword must be > 0");
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let f = write_config(
            r#"[db]
path = "radar.sqlite"

[server]
bind = "127.0.0.1:7410"
"#,
        );
        let config = load_config(f.path()).unwrap();
        assert_eq!(config.pipeline.processing_delay_ms, 1000);
        assert_eq!(config.pipeline.existing_ideas_window_days, 30);
        assert!(!config.email.is_enabled());
        assert!(config.sources.reddit.is_none());
    }

    #[test]
    fn resend_requires_from_address() {
        let f = write_config(
            r#"[db]
path = "radar.sqlite"

[server]
bind = "127.0.0.1:7410"

[email]
provider = "resend"
"#,
        );
        let err = load_config(f.path()).unwrap_err();
        assert!(err.to_string().contains("email.from"));
    }

    #[test]
    fn unknown_email_provider_rejected() {
        let f = write_config(
            r#"[db]
path = "radar.sqlite"

[server]
bind = "127.0.0.1:7410"

[email]
provider = "pigeon"
"#,
        );
        assert!(load_config(f.path()).is_err());
    }
}
