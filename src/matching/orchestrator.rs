//! The matching cascade.
//!
//! Stages run strictly in order. Each stage is tried only if every earlier
//! one produced zero usable candidates, and exactly one stage supplies the
//! result; nothing is merged across stages.
//!
//! | # | Stage | Text | Window | `was_rewritten` |
//! |---|-------|------|--------|-----------------|
//! | 1 | premise rewrite | original | - | (enrichment only) |
//! | 2 | primary | original + premise | 150 | premise used and differs |
//! | 3 | compact | original + premise | 90 | same as 2 |
//! | 4 | original retry (only if 1 changed the text) | original | 120 | false |
//! | 5 | simplify, then retry | simplified | 120 | true |
//! | 6 | fallback | - | - | true, with advisory |
//!
//! A generation error, a timeout and an unparseable response all mean "this
//! stage produced nothing"; none of them reaches the caller. The only error
//! [`MatchOrchestrator::match_tweet`] returns for valid input is a catalog
//! failure.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::Instrument;
use uuid::Uuid;

use super::{
    FallbackSelector, MAX_CANDIDATES, MAX_TWEET_CHARS, MatchCandidate, MatchRequest, MatchResult,
    Premise, normalize_candidate,
};
use crate::catalog::{CatalogCache, TemplateCatalog, describe};
use crate::error::MemeError;
use crate::generation::prompt::{self, MatchPrompt};
use crate::generation::{Generator, extract_json, extract_object};

/// Shown with fallback results.
pub const FALLBACK_ADVISORY: &str = "We couldn't find a tailored match right now, \
     so here are popular templates that fit most posts.";

/// Tunables for the cascade.
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Templates described in the primary prompt.
    pub primary_window: usize,
    /// Templates described in the compact retry.
    pub compact_window: usize,
    /// Templates described in the original-text and simplified retries.
    pub retry_window: usize,
    /// Maximum length of simplified text, in characters.
    pub simplify_max_chars: usize,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            primary_window: 150,
            compact_window: 90,
            retry_window: 120,
            simplify_max_chars: 100,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Primary,
    Compact,
    Original,
    Simplified,
}

impl Stage {
    fn name(self) -> &'static str {
        match self {
            Stage::Primary => "primary",
            Stage::Compact => "compact",
            Stage::Original => "original",
            Stage::Simplified => "simplified",
        }
    }
}

/// One match attempt's inputs.
struct Attempt<'a> {
    stage: Stage,
    text: &'a str,
    premise: Option<&'a Premise>,
    window: usize,
}

/// Coordinates generation stages, normalization and fallback.
pub struct MatchOrchestrator {
    generator: Arc<dyn Generator>,
    catalog: Arc<CatalogCache>,
    fallback: FallbackSelector,
    options: OrchestratorOptions,
    rng: Mutex<StdRng>,
}

impl MatchOrchestrator {
    pub fn new(generator: Arc<dyn Generator>, catalog: Arc<CatalogCache>) -> Self {
        Self {
            generator,
            catalog,
            fallback: FallbackSelector::default(),
            options: OrchestratorOptions::default(),
            rng: Mutex::new(StdRng::seed_from_u64(rand::random())),
        }
    }

    pub fn with_options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackSelector) -> Self {
        self.fallback = fallback;
        self
    }

    /// Pin the RNG used for catalog sampling and fallback selection.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Match a tweet to ranked template suggestions.
    ///
    /// Returns `InvalidInput` for an empty or over-long tweet and `Catalog`
    /// when there are no templates to match against. Otherwise always
    /// returns a result with 1 to 3 candidates.
    pub async fn match_tweet(&self, request: &MatchRequest) -> Result<MatchResult, MemeError> {
        let tweet = request.tweet.trim();
        if tweet.is_empty() {
            return Err(MemeError::InvalidInput("Tweet cannot be empty".to_string()));
        }
        let length = tweet.chars().count();
        if length > MAX_TWEET_CHARS {
            return Err(MemeError::InvalidInput(format!(
                "Tweet is {} characters; the limit is {}",
                length, MAX_TWEET_CHARS
            )));
        }

        let span = tracing::info_span!("match", request_id = %Uuid::new_v4());
        async {
            let catalog = self.catalog.get_templates().await?;
            Ok::<_, MemeError>(self.cascade(&catalog, tweet, request).await)
        }
        .instrument(span)
        .await
    }

    async fn cascade(
        &self,
        catalog: &TemplateCatalog,
        tweet: &str,
        request: &MatchRequest,
    ) -> MatchResult {
        let feedback = request
            .feedback
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty());
        let exclude = &request.exclude_ids;

        let premise = self.rewrite_premise(tweet).await;
        let premise_text = premise.as_ref().map(Premise::text);
        let rewritten = premise_text.as_deref().is_some_and(|p| p != tweet);
        let working = premise_text.as_deref().unwrap_or(tweet);

        for (stage, window) in [
            (Stage::Primary, self.options.primary_window),
            (Stage::Compact, self.options.compact_window),
        ] {
            let attempt = Attempt {
                stage,
                text: tweet,
                premise: premise.as_ref(),
                window,
            };
            let candidates = self.attempt(catalog, &attempt, feedback, exclude).await;
            if !candidates.is_empty() {
                return MatchResult {
                    candidates,
                    was_rewritten: rewritten,
                    rewritten_text: rewritten.then(|| working.to_string()),
                    advisory_message: None,
                };
            }
        }

        if rewritten {
            let attempt = Attempt {
                stage: Stage::Original,
                text: tweet,
                premise: None,
                window: self.options.retry_window,
            };
            let candidates = self.attempt(catalog, &attempt, feedback, exclude).await;
            if !candidates.is_empty() {
                return MatchResult {
                    candidates,
                    was_rewritten: false,
                    rewritten_text: None,
                    advisory_message: None,
                };
            }
        }

        if let Some(simplified) = self.simplify(working).await {
            let attempt = Attempt {
                stage: Stage::Simplified,
                text: &simplified,
                premise: None,
                window: self.options.retry_window,
            };
            let candidates = self.attempt(catalog, &attempt, feedback, exclude).await;
            if !candidates.is_empty() {
                return MatchResult {
                    candidates,
                    was_rewritten: true,
                    rewritten_text: Some(simplified),
                    advisory_message: None,
                };
            }
        }

        tracing::warn!("all generation stages failed; using fallback templates");
        let candidates = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            self.fallback
                .select(catalog, exclude, MAX_CANDIDATES, Some(tweet), &mut *rng)
        };
        MatchResult {
            candidates,
            was_rewritten: true,
            rewritten_text: None,
            advisory_message: Some(FALLBACK_ADVISORY.to_string()),
        }
    }

    /// Stage 1: best-effort premise rewrite. Any failure yields `None`.
    async fn rewrite_premise(&self, tweet: &str) -> Option<Premise> {
        let response = match self.generator.complete(&prompt::rewrite_prompt(tweet)).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "premise rewrite failed");
                return None;
            }
        };
        let map = match extract_object(&response) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(error = %e, "premise rewrite returned unusable output");
                return None;
            }
        };

        let setup = string_field(&map, &["setup"])?;
        let premise = Premise {
            setup,
            punchline: string_field(&map, &["punchline"]).unwrap_or_default(),
            tone: string_field(&map, &["tone"]).unwrap_or_default(),
            tags: tags_field(&map),
        };
        tracing::info!(premise = %premise.text(), "premise rewrite succeeded");
        Some(premise)
    }

    /// Ask for a compressed version of `text`, at most `simplify_max_chars` long.
    async fn simplify(&self, text: &str) -> Option<String> {
        let max = self.options.simplify_max_chars;
        let response = match self.generator.complete(&prompt::simplify_prompt(text, max)).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "simplify failed");
                return None;
            }
        };
        let map = match extract_object(&response) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(error = %e, "simplify returned unusable output");
                return None;
            }
        };
        let simplified = string_field(&map, &["simplified", "text", "simplifiedText"])?;
        Some(match simplified.char_indices().nth(max) {
            Some((idx, _)) => simplified[..idx].trim_end().to_string(),
            None => simplified,
        })
    }

    /// One match attempt. Errors and bad output come back as an empty list.
    async fn attempt(
        &self,
        catalog: &TemplateCatalog,
        attempt: &Attempt<'_>,
        feedback: Option<&str>,
        exclude: &HashSet<String>,
    ) -> Vec<MatchCandidate> {
        let stage = attempt.stage.name();
        let excerpt = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            describe::catalog_excerpt(catalog, attempt.window, exclude, &mut *rng)
        };
        let input = MatchPrompt {
            text: attempt.text,
            premise: attempt.premise,
            feedback,
            exclude,
            catalog_excerpt: &excerpt,
        };
        let prompt = match attempt.stage {
            Stage::Compact => prompt::compact_match_prompt(&input),
            _ => prompt::match_prompt(&input),
        };

        let response = match self.generator.complete(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(stage, error = %e, "match stage failed");
                return Vec::new();
            }
        };
        let value = match extract_json(&response) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(stage, error = %e, "match stage returned unusable output");
                return Vec::new();
            }
        };

        let candidates = collect_candidates(&value, catalog, exclude);
        if candidates.is_empty() {
            tracing::warn!(stage, "match stage produced no usable candidates");
        } else {
            tracing::info!(stage, count = candidates.len(), "match stage succeeded");
        }
        candidates
    }
}

/// Normalize every candidate in a parsed response.
///
/// Accepts a bare array, an object wrapping one (`candidates`, `matches`,
/// `results`), or a single candidate object. Unresolvable, excluded and
/// repeated templates are dropped; at most three survive.
fn collect_candidates(
    value: &Value,
    catalog: &TemplateCatalog,
    exclude: &HashSet<String>,
) -> Vec<MatchCandidate> {
    let items: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => ["candidates", "matches", "results"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .map(|items| items.iter().collect())
            .unwrap_or_else(|| vec![value]),
        _ => Vec::new(),
    };

    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter_map(|item| normalize_candidate(item, catalog))
        .filter(|c| !exclude.contains(&c.template_id))
        .filter(|c| seen.insert(c.template_id.clone()))
        .take(MAX_CANDIDATES)
        .collect()
}

fn string_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| map.get(*key).and_then(Value::as_str))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// `tags` as an array of strings or a comma-separated string.
fn tags_field(map: &Map<String, Value>) -> Vec<String> {
    match map.get("tags") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::template;
    use crate::catalog::{Template, TemplateSource};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::time::Duration;

    struct FixedSource(Vec<Template>);

    #[async_trait]
    impl TemplateSource for FixedSource {
        async fn fetch(&self) -> Result<Vec<Template>, MemeError> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl TemplateSource for FailingSource {
        async fn fetch(&self) -> Result<Vec<Template>, MemeError> {
            Err(MemeError::Catalog("offline".to_string()))
        }
    }

    /// Replays canned responses in order and records every prompt.
    struct Scripted {
        responses: Mutex<VecDeque<Result<String, String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(responses: Vec<Result<&str, &str>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(
                    responses
                        .into_iter()
                        .map(|r| r.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Generator for Scripted {
        async fn complete(&self, prompt: &str) -> Result<String, MemeError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match self.responses.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(text),
                Some(Err(e)) => Err(MemeError::Transport(e)),
                None => Err(MemeError::Transport("script exhausted".to_string())),
            }
        }
    }

    fn templates() -> Vec<Template> {
        let mut templates = vec![
            template("181913649", "Drake Hotline Bling", 2),
            template("87743020", "Two Buttons", 3),
            template("112126428", "Distracted Boyfriend", 3),
            template("129242436", "Change My Mind", 2),
            template("4087833", "Waiting Skeleton", 2),
            template("89370399", "Roll Safe Think About It", 2),
        ];
        for i in 0..40 {
            templates.push(template(&format!("p{}", i), &format!("Popular {}", i), 2));
        }
        templates
    }

    fn orchestrator(generator: Arc<Scripted>) -> MatchOrchestrator {
        let cache = CatalogCache::new(FixedSource(templates()), Duration::from_secs(3600));
        MatchOrchestrator::new(generator, Arc::new(cache)).with_seed(42)
    }

    const PREMISE: &str = r#"{"setup": "Waiting for the bus", "punchline": "3 hours later", "tone": "weary", "tags": ["bus"]}"#;
    const SKELETON: &str = r#"[{"templateId": "4087833", "textSlots": [{"top": "WAITING"}, {"bottom": "LATER"}]}]"#;

    #[tokio::test]
    async fn test_primary_stage_with_premise() {
        let generator = Scripted::new(vec![Ok(PREMISE), Ok(SKELETON)]);
        let result = orchestrator(generator.clone())
            .match_tweet(&MatchRequest::new("I waited 3 hours for the bus"))
            .await
            .unwrap();

        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.candidates[0].template_id, "4087833");
        assert!(result.was_rewritten);
        assert_eq!(
            result.rewritten_text.as_deref(),
            Some("Waiting for the bus / 3 hours later")
        );
        assert!(result.advisory_message.is_none());
        assert_eq!(generator.prompts().len(), 2);
        assert!(generator.prompts()[1].contains("Setup: Waiting for the bus"));
    }

    #[tokio::test]
    async fn test_failed_rewrite_is_not_fatal() {
        let generator = Scripted::new(vec![Err("boom"), Ok(SKELETON)]);
        let result = orchestrator(generator)
            .match_tweet(&MatchRequest::new("bus"))
            .await
            .unwrap();
        assert!(!result.was_rewritten);
        assert!(result.rewritten_text.is_none());
        assert_eq!(result.candidates[0].template_id, "4087833");
    }

    #[tokio::test]
    async fn test_compact_retry_after_garbage() {
        let generator = Scripted::new(vec![Ok(PREMISE), Ok("I'm sorry, I can't do that"), Ok(SKELETON)]);
        let result = orchestrator(generator.clone())
            .match_tweet(&MatchRequest::new("bus"))
            .await
            .unwrap();
        assert_eq!(result.candidates[0].template_id, "4087833");
        assert!(result.was_rewritten);
        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[2].len() < prompts[1].len());
    }

    #[tokio::test]
    async fn test_original_text_retry_clears_rewrite_flag() {
        let generator = Scripted::new(vec![
            Ok(PREMISE),
            Ok(r#"[{"templateId": "does-not-exist"}]"#),
            Err("timeout"),
            Ok(SKELETON),
        ]);
        let result = orchestrator(generator.clone())
            .match_tweet(&MatchRequest::new("I waited 3 hours for the bus"))
            .await
            .unwrap();
        assert!(!result.was_rewritten);
        assert!(result.rewritten_text.is_none());
        assert!(!generator.prompts()[3].contains("## Premise"));
    }

    #[tokio::test]
    async fn test_original_retry_skipped_when_rewrite_failed() {
        let generator = Scripted::new(vec![
            Err("down"),
            Err("down"),
            Err("down"),
            Ok(r#"{"simplified": "bus late"}"#),
            Ok(SKELETON),
        ]);
        let result = orchestrator(generator.clone())
            .match_tweet(&MatchRequest::new("the bus was very late again today"))
            .await
            .unwrap();
        assert!(result.was_rewritten);
        assert_eq!(result.rewritten_text.as_deref(), Some("bus late"));
        // rewrite, primary, compact, simplify, simplified retry
        assert_eq!(generator.prompts().len(), 5);
    }

    #[tokio::test]
    async fn test_everything_fails_uses_fallback() {
        let generator = Scripted::new(vec![]);
        let result = orchestrator(generator)
            .match_tweet(&MatchRequest::new("anything at all"))
            .await
            .unwrap();
        assert_eq!(result.candidates.len(), 3);
        assert!(result.was_rewritten);
        assert_eq!(result.advisory_message.as_deref(), Some(FALLBACK_ADVISORY));
    }

    #[tokio::test]
    async fn test_excluded_and_duplicate_candidates_dropped() {
        let response = r#"[
            {"templateId": "61579x"},
            {"templateId": "4087833"},
            {"templateId": "181913649"},
            {"templateId": "181913649"},
            {"templateId": "87743020"},
            {"templateId": "p1"}
        ]"#;
        let generator = Scripted::new(vec![Err("no rewrite"), Ok(response)]);
        let request = MatchRequest::new("text").exclude(["4087833"]);
        let result = orchestrator(generator).match_tweet(&request).await.unwrap();
        let ids: Vec<&str> = result.candidates.iter().map(|c| c.template_id.as_str()).collect();
        assert_eq!(ids, vec!["181913649", "87743020", "p1"]);
    }

    #[tokio::test]
    async fn test_wrapped_candidates_object() {
        let generator = Scripted::new(vec![
            Err("no rewrite"),
            Ok(r#"```json
{"candidates": [{"templateId": "p3", "primaryTopText": "hi"}]}
```"#),
        ]);
        let result = orchestrator(generator)
            .match_tweet(&MatchRequest::new("text"))
            .await
            .unwrap();
        assert_eq!(result.candidates[0].template_id, "p3");
        assert_eq!(result.candidates[0].primary_top_text, "hi");
    }

    #[tokio::test]
    async fn test_invalid_input() {
        let o = orchestrator(Scripted::new(vec![]));
        assert!(matches!(
            o.match_tweet(&MatchRequest::new("   ")).await,
            Err(MemeError::InvalidInput(_))
        ));
        assert!(matches!(
            o.match_tweet(&MatchRequest::new("x".repeat(501))).await,
            Err(MemeError::InvalidInput(_))
        ));
        assert!(o.match_tweet(&MatchRequest::new("x".repeat(500))).await.is_ok());
    }

    #[tokio::test]
    async fn test_catalog_failure_is_surfaced() {
        let cache = CatalogCache::new(FailingSource, Duration::from_secs(3600));
        let o = MatchOrchestrator::new(Scripted::new(vec![]), Arc::new(cache));
        assert!(matches!(
            o.match_tweet(&MatchRequest::new("hello")).await,
            Err(MemeError::Catalog(_))
        ));
    }

    #[test]
    fn test_tags_field_forms() {
        let map = extract_object(r#"{"tags": "a, b ,,c"}"#).unwrap();
        assert_eq!(tags_field(&map), vec!["a", "b", "c"]);
        let map = extract_object(r#"{"tags": ["x", 1, " y "]}"#).unwrap();
        assert_eq!(tags_field(&map), vec!["x", "y"]);
    }
}
