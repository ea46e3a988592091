//! # Idea Radar
//!
//! A pipeline that mines external content sources for monetizable pain
//! points and turns them into scored product ideas, plus a daily digest
//! job that mails new ideas to subscribers.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────────────┐   ┌──────────┐
//! │  Sources    │──▶│  Synthesis pipeline      │──▶│  SQLite   │
//! │  (Reddit)   │   │ Analyze → Generate → Save│   │ ideas+src │
//! └─────────────┘   └──────────────────────────┘   └────┬─────┘
//!                          ▲ LLM (OpenRouter)           │
//!                                                       ▼
//!                                              ┌────────────────┐
//!                                              │  Digest job    │
//!                                              │ group + email  │
//!                                              └────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! radar init                          # create database
//! radar topic add devops --keywords "kubernetes,sre"
//! radar run                           # one synthesis pass
//! radar digest                        # one digest pass
//! radar serve                         # scheduler-facing trigger server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data contracts |
//! | [`store`] | Persistence surface (`IdeaStore`) over SQLite |
//! | [`completion`] | Completion service abstraction (OpenRouter) |
//! | [`source`] | Content source adapter contract |
//! | [`connector_reddit`] | Reddit content source |
//! | [`analyzer`] | Pain-point screening |
//! | [`generator`] | Idea synthesis |
//! | [`synthesis`] | Synthesis orchestrator |
//! | [`digest`] | Digest orchestrator |
//! | [`email`] | Email sender + digest rendering |
//! | [`throttle`] | Fixed-interval rate limiter |
//! | [`jobs`] | Production wiring for both pipelines |
//! | [`server`] | Trigger HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//!
//! ## Consistency note
//!
//! Both pipelines perform only single-row writes, no multi-statement
//! transactions. The "every idea has at least one source" invariant is
//! therefore best-effort: a crash between the idea insert and the source
//! insert leaves an idea with zero sources.

pub mod analyzer;
pub mod completion;
pub mod config;
pub mod connector_reddit;
pub mod db;
pub mod digest;
pub mod email;
pub mod generator;
pub mod jobs;
pub mod migrate;
pub mod models;
pub mod server;
pub mod source;
pub mod store;
pub mod synthesis;
pub mod throttle;
