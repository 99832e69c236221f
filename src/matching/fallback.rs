//! Fallback template selection.
//!
//! Used when every generation stage came back empty. There is no signal to
//! rank by, so this picks uniformly at random from a pool of broadly
//! applicable templates:
//!
//! 1. the preferred list, minus excluded ids
//! 2. if that's fewer than `count`: widened with the first 80 catalog templates, minus excluded ids
//! 3. if still fewer than `count`: excluded templates from the first 80 are allowed back in
//!
//! Randomness comes from the caller's RNG so tests can pin it with a seed.

use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;

use super::{MatchCandidate, TextSlot};
use crate::catalog::{SlotPosition, Template, TemplateCatalog, format};

/// Broadly applicable templates tried first (imgflip ids).
pub const PREFERRED_TEMPLATE_IDS: &[&str] = &[
    "181913649", // Drake Hotline Bling
    "87743020",  // Two Buttons
    "112126428", // Distracted Boyfriend
    "129242436", // Change My Mind
    "4087833",   // Waiting Skeleton
    "89370399",  // Roll Safe Think About It
];

/// How many popular catalog templates the widened pool draws from.
pub const WIDENED_POOL_SIZE: usize = 80;

/// Longest primary caption taken from the seed text, in characters.
pub const SEED_TEXT_LIMIT: usize = 50;

/// Bottom caption used for every fallback candidate.
pub const SECONDARY_LINE: &str = "AND THAT'S JUST HOW IT GOES";

const GENERIC_PRIMARY_LINE: &str = "WHEN IT HAPPENS AGAIN";

const FALLBACK_REASONING: &str =
    "A popular, broadly applicable template, shown because no tailored match was available.";

/// Picks safe default templates.
#[derive(Debug, Clone)]
pub struct FallbackSelector {
    preferred: Vec<String>,
}

impl Default for FallbackSelector {
    fn default() -> Self {
        Self::new(PREFERRED_TEMPLATE_IDS.iter().map(|id| id.to_string()))
    }
}

impl FallbackSelector {
    pub fn new(preferred: impl IntoIterator<Item = String>) -> Self {
        Self {
            preferred: preferred.into_iter().collect(),
        }
    }

    /// Select up to `count` distinct templates and caption them from `seed_text`.
    pub fn select<R: Rng + ?Sized>(
        &self,
        catalog: &TemplateCatalog,
        exclude: &HashSet<String>,
        count: usize,
        seed_text: Option<&str>,
        rng: &mut R,
    ) -> Vec<MatchCandidate> {
        let mut pool = self.pool(catalog, exclude, count);
        pool.shuffle(rng);
        pool.truncate(count);

        let primary = seed_text
            .map(|s| truncate_chars(s.trim(), SEED_TEXT_LIMIT))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| GENERIC_PRIMARY_LINE.to_string());

        pool.into_iter()
            .map(|template| caption(template, &primary))
            .collect()
    }

    fn pool<'a>(
        &self,
        catalog: &'a TemplateCatalog,
        exclude: &HashSet<String>,
        count: usize,
    ) -> Vec<&'a Template> {
        let mut seen = HashSet::new();
        let mut pool: Vec<&Template> = self
            .preferred
            .iter()
            .filter(|id| !exclude.contains(*id))
            .filter_map(|id| catalog.get(id))
            .filter(|t| seen.insert(t.id.clone()))
            .collect();
        if pool.len() >= count {
            return pool;
        }

        let popular = || catalog.templates().iter().take(WIDENED_POOL_SIZE);

        pool.extend(
            popular()
                .filter(|t| !exclude.contains(&t.id))
                .filter(|t| seen.insert(t.id.clone())),
        );
        if pool.len() >= count {
            return pool;
        }

        tracing::debug!("exclusions leave too few fallback templates; allowing excluded ids");
        pool.extend(popular().filter(|t| seen.insert(t.id.clone())));
        pool
    }
}

fn caption(template: &Template, primary: &str) -> MatchCandidate {
    let info = format::format_info(template);
    MatchCandidate {
        template_id: template.id.clone(),
        template_name: template.name.clone(),
        reasoning: FALLBACK_REASONING.to_string(),
        layout_kind: info.layout_kind,
        text_slots: vec![
            TextSlot::new(SlotPosition::Top, primary),
            TextSlot::new(SlotPosition::Bottom, SECONDARY_LINE),
        ],
        primary_top_text: primary.to_string(),
        primary_bottom_text: SECONDARY_LINE.to_string(),
    }
}

/// First `max` characters of `s`, trailing whitespace removed.
fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].trim_end().to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::template;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn catalog() -> TemplateCatalog {
        let mut templates = vec![
            template("181913649", "Drake Hotline Bling", 2),
            template("87743020", "Two Buttons", 3),
            template("112126428", "Distracted Boyfriend", 3),
            template("129242436", "Change My Mind", 2),
            template("4087833", "Waiting Skeleton", 2),
            template("89370399", "Roll Safe Think About It", 2),
        ];
        for i in 0..100 {
            templates.push(template(&format!("p{}", i), &format!("Popular {}", i), 2));
        }
        TemplateCatalog::new(templates)
    }

    fn ids(candidates: &[MatchCandidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.template_id.as_str()).collect()
    }

    #[test]
    fn test_picks_from_preferred_list() {
        let mut rng = StdRng::seed_from_u64(3);
        let picked = FallbackSelector::default().select(&catalog(), &HashSet::new(), 3, None, &mut rng);
        assert_eq!(picked.len(), 3);
        for id in ids(&picked) {
            assert!(PREFERRED_TEMPLATE_IDS.contains(&id));
        }
    }

    #[test]
    fn test_same_seed_same_selection() {
        let selector = FallbackSelector::default();
        let a = selector.select(&catalog(), &HashSet::new(), 3, None, &mut StdRng::seed_from_u64(11));
        let b = selector.select(&catalog(), &HashSet::new(), 3, None, &mut StdRng::seed_from_u64(11));
        assert_eq!(a, b);
    }

    #[test]
    fn test_exclusions_widen_pool() {
        let exclude: HashSet<String> = PREFERRED_TEMPLATE_IDS[..5].iter().map(|s| s.to_string()).collect();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let picked = FallbackSelector::default().select(&catalog(), &exclude, 3, None, &mut rng);
            assert_eq!(picked.len(), 3);
            let picked_ids = ids(&picked);
            assert!(picked_ids.iter().all(|id| !exclude.contains(*id)));
            let unique: HashSet<&&str> = picked_ids.iter().collect();
            assert_eq!(unique.len(), 3);
        }
    }

    #[test]
    fn test_excluded_allowed_only_when_pool_too_small() {
        let small = TemplateCatalog::new(vec![
            template("1", "One", 2),
            template("2", "Two", 2),
            template("3", "Three", 2),
        ]);
        let exclude: HashSet<String> = ["1".to_string(), "2".to_string()].into();
        let mut rng = StdRng::seed_from_u64(5);
        let picked = FallbackSelector::default().select(&small, &exclude, 3, None, &mut rng);
        let mut picked_ids = ids(&picked);
        picked_ids.sort_unstable();
        assert_eq!(picked_ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_captions_from_seed_text() {
        let seed = "I waited for the bus for three whole hours this morning in the rain";
        let mut rng = StdRng::seed_from_u64(1);
        let picked = FallbackSelector::default().select(&catalog(), &HashSet::new(), 3, Some(seed), &mut rng);
        for c in &picked {
            assert!(c.primary_top_text.chars().count() <= SEED_TEXT_LIMIT);
            assert!(seed.starts_with(&c.primary_top_text));
            assert_eq!(c.primary_bottom_text, SECONDARY_LINE);
            assert_eq!(c.slot(SlotPosition::Top).unwrap().text, c.primary_top_text);
            assert_eq!(c.slot(SlotPosition::Bottom).unwrap().text, c.primary_bottom_text);
        }
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo w");
        assert_eq!(truncate_chars("short", 50), "short");
        assert_eq!(truncate_chars("ab cd", 3), "ab");
    }
}
