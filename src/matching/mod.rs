//! # Matching
//!
//! Turns a short text into ranked meme template suggestions.
//!
//! ## Pipeline
//!
//! ```text
//! MatchRequest ──► MatchOrchestrator ──► generation stages ──► normalize ──► MatchResult
//!                        │                                        ▲
//!                        └──────── every stage empty ──► fallback ┘
//! ```
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`orchestrator`] | The staged cascade |
//! | [`normalize`] | Raw JSON candidate → [`MatchCandidate`] |
//! | [`fallback`] | Popular-template selection when generation fails |

pub mod fallback;
pub mod normalize;
pub mod orchestrator;

pub use fallback::FallbackSelector;
pub use normalize::normalize_candidate;
pub use orchestrator::{MatchOrchestrator, OrchestratorOptions};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::catalog::{LayoutKind, SlotPosition};

/// Maximum tweet length accepted by the pipeline, in characters.
pub const MAX_TWEET_CHARS: usize = 500;

/// Number of candidates a match returns at most.
pub const MAX_CANDIDATES: usize = 3;

/// One caption placed in one box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSlot {
    pub position: SlotPosition,
    pub text: String,
}

impl TextSlot {
    pub fn new(position: SlotPosition, text: impl Into<String>) -> Self {
        Self {
            position,
            text: text.into(),
        }
    }
}

/// One proposed template with its captions.
///
/// After normalization `text_slots` is never empty, and its `top`/`bottom`
/// entries (when present) equal `primary_top_text`/`primary_bottom_text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCandidate {
    pub template_id: String,
    pub template_name: String,
    pub reasoning: String,
    pub layout_kind: LayoutKind,
    pub text_slots: Vec<TextSlot>,
    pub primary_top_text: String,
    pub primary_bottom_text: String,
}

impl MatchCandidate {
    /// First slot at the given position.
    pub fn slot(&self, position: SlotPosition) -> Option<&TextSlot> {
        self.text_slots.iter().find(|s| s.position == position)
    }
}

/// Outcome of one match invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    /// 1 to 3 candidates, best first.
    pub candidates: Vec<MatchCandidate>,
    /// True when the candidates were matched against text other than the original.
    pub was_rewritten: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewritten_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advisory_message: Option<String>,
}

/// What to match.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest {
    pub tweet: String,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub exclude_ids: HashSet<String>,
}

impl MatchRequest {
    pub fn new(tweet: impl Into<String>) -> Self {
        Self {
            tweet: tweet.into(),
            ..Default::default()
        }
    }

    pub fn feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }

    pub fn exclude(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.exclude_ids.extend(ids.into_iter().map(Into::into));
        self
    }
}

/// A meme-ready restatement of the input produced by the rewrite stage.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Premise {
    pub setup: String,
    pub punchline: String,
    pub tone: String,
    pub tags: Vec<String>,
}

impl Premise {
    /// The premise as a single line of text.
    pub fn text(&self) -> String {
        if self.punchline.is_empty() {
            self.setup.clone()
        } else {
            format!("{} / {}", self.setup, self.punchline)
        }
    }
}
