//! # Memesmith - Meme Template Matching and Captioning
//!
//! Memesmith turns a short post into ranked meme template suggestions with
//! captions, and renders those captions onto the template image. It provides:
//!
//! - **Matching**: a staged generation cascade that always yields 1-3 candidates
//! - **Catalog**: a TTL-cached remote template list with per-template layout semantics
//! - **Layout**: word wrapping and outlined meme text over an abstract drawing surface
//! - **Rendering**: full-size renders, thumbnails and a load-failure placeholder
//! - **Server**: a JSON HTTP API over all of the above
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use memesmith::{
//!     catalog::{CatalogCache, HttpTemplateSource},
//!     config::Config,
//!     generation::OpenAiGenerator,
//!     matching::{MatchOrchestrator, MatchRequest},
//! };
//!
//! # async fn example() -> Result<(), memesmith::MemeError> {
//! let config = Config::from_env()?;
//!
//! let catalog = Arc::new(CatalogCache::new(
//!     HttpTemplateSource::new(reqwest::Client::new(), config.catalog_url.clone()),
//!     config.catalog_ttl,
//! ));
//! let generator = Arc::new(OpenAiGenerator::new(config.generation.clone())?);
//! let orchestrator = MatchOrchestrator::new(generator, catalog);
//!
//! let result = orchestrator
//!     .match_tweet(&MatchRequest::new("I waited 3 hours for the bus"))
//!     .await?;
//! for candidate in &result.candidates {
//!     println!("{}: {} / {}", candidate.template_name, candidate.primary_top_text, candidate.primary_bottom_text);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`catalog`] | Templates, layout formats, the TTL cache and its remote source |
//! | [`generation`] | Text-generation client, prompts and JSON extraction |
//! | [`matching`] | Candidate types, normalization, fallback and the cascade |
//! | [`layout`] | Word wrap, sizing and outlined text drawing |
//! | [`render`] | Template download, full renders and thumbnails |
//! | [`caption`] | Remote captioning through imgflip |
//! | [`server`] | HTTP API |
//! | [`config`] | Environment configuration |
//! | [`error`] | Error types |

pub mod caption;
pub mod catalog;
pub mod config;
pub mod error;
pub mod generation;
pub mod layout;
pub mod matching;
pub mod render;
pub mod server;

// Re-exports for convenience
pub use error::MemeError;
pub use matching::{MatchCandidate, MatchOrchestrator, MatchRequest, MatchResult};
