//! Catalog excerpts for generation prompts.
//!
//! A prompt can only carry a window of the catalog. The window is filled in
//! this order:
//!
//! 1. every curated template (always, even past the budget)
//! 2. the most popular remaining templates, half of what's left
//! 3. a uniform random sample of the rest, for variety
//!
//! Excluded template ids are never described.

use rand::Rng;
use rand::seq::index;
use std::collections::HashSet;

use super::{Template, TemplateCatalog, format};

/// One prompt line: `id | name | boxes | layout | position: purpose; ...`.
pub fn describe_template(template: &Template) -> String {
    let info = format::format_info(template);
    let slots = info
        .text_slots
        .iter()
        .map(|slot| format!("{}: {}", slot.position, slot.purpose))
        .collect::<Vec<_>>()
        .join("; ");
    format!(
        "{} | {} | {} boxes | {} | {}",
        template.id, template.name, info.box_count, info.layout_kind, slots
    )
}

/// Pick the templates a prompt should describe.
///
/// The result is curated templates first, then the popular slice, then the
/// random sample (sample kept in catalog order).
pub fn select_window<'a, R: Rng + ?Sized>(
    catalog: &'a TemplateCatalog,
    max_templates: usize,
    exclude: &HashSet<String>,
    rng: &mut R,
) -> Vec<&'a Template> {
    let mut window: Vec<&Template> = catalog
        .curated()
        .filter(|t| !exclude.contains(&t.id))
        .collect();

    let remaining = max_templates.saturating_sub(window.len());
    if remaining == 0 {
        return window;
    }

    let rest: Vec<&Template> = catalog
        .templates()
        .iter()
        .filter(|t| !format::is_curated(&t.id) && !exclude.contains(&t.id))
        .collect();

    let popular = remaining.div_ceil(2).min(rest.len());
    window.extend(&rest[..popular]);

    let tail = &rest[popular..];
    let sample_size = (remaining - popular).min(tail.len());
    let mut picked = index::sample(rng, tail.len(), sample_size).into_vec();
    picked.sort_unstable();
    window.extend(picked.into_iter().map(|i| tail[i]));

    window
}

/// Render a window as newline-separated description lines.
pub fn catalog_excerpt<R: Rng + ?Sized>(
    catalog: &TemplateCatalog,
    max_templates: usize,
    exclude: &HashSet<String>,
    rng: &mut R,
) -> String {
    select_window(catalog, max_templates, exclude, rng)
        .into_iter()
        .map(describe_template)
        .collect::<Vec<_>>()
        .join("\n")
}
