//! Wiring for the two batch jobs.
//!
//! Builds each orchestrator with its production collaborators (OpenRouter
//! completion client, Reddit source, Resend sender, SQLite store) from
//! configuration. Used by both the CLI commands and the trigger server so
//! the composition lives in one place.

use anyhow::{bail, Result};
use std::sync::Arc;

use crate::analyzer::PainPointAnalyzer;
use crate::completion::OpenRouterClient;
use crate::config::Config;
use crate::connector_reddit::RedditSource;
use crate::digest::DigestOrchestrator;
use crate::email::ResendSender;
use crate::generator::IdeaGenerator;
use crate::source::ContentSource;
use crate::store::IdeaStore;
use crate::synthesis::SynthesisOrchestrator;
use crate::throttle::Throttle;

pub fn build_synthesis(
    config: &Config,
    store: Arc<dyn IdeaStore>,
) -> Result<SynthesisOrchestrator> {
    let completion = Arc::new(OpenRouterClient::new(&config.llm)?);

    let mut sources: Vec<Arc<dyn ContentSource>> = Vec::new();
    if let Some(ref reddit) = config.sources.reddit {
        sources.push(Arc::new(RedditSource::new(reddit)?));
    }
    if sources.is_empty() {
        bail!("no content sources configured; add a [sources.reddit] section");
    }

    let analyzer = PainPointAnalyzer::new(completion.clone(), &config.llm.analyzer_model);
    let generator = IdeaGenerator::new(completion, &config.llm.generator_model);

    Ok(SynthesisOrchestrator::new(
        store,
        sources,
        analyzer,
        generator,
        Throttle::from_millis(config.pipeline.processing_delay_ms),
        config.pipeline.existing_ideas_window_days,
    ))
}

pub fn build_digest(config: &Config, store: Arc<dyn IdeaStore>) -> Result<DigestOrchestrator> {
    if !config.email.is_enabled() {
        bail!("email is disabled; set email.provider = \"resend\" to send digests");
    }
    let from = config
        .email
        .from
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("email.from not configured"))?;

    let sender = Arc::new(ResendSender::new(from)?);
    Ok(DigestOrchestrator::new(store, sender, &config.email.app_url))
}
