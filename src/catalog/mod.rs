//! # Template Catalog
//!
//! Read-only, indexed view of the available meme templates.
//!
//! A [`TemplateCatalog`] is built once per successful fetch and shared
//! behind an `Arc` by everything that needs template data. It never changes
//! after construction; a refetch builds a new catalog and swaps it in
//! wholesale (see [`cache::CatalogCache`]).
//!
//! ## Submodules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`format`] | Curated and computed layout metadata |
//! | [`cache`] | TTL cache around a [`source::TemplateSource`] |
//! | [`source`] | Remote catalog fetch |
//! | [`describe`] | Prompt excerpts describing a slice of the catalog |

pub mod cache;
pub mod describe;
pub mod format;
pub mod source;

pub use cache::{CatalogCache, Clock, SystemClock};
pub use format::{FormatInfo, LayoutKind, SlotPosition, TextSlotSpec};
pub use source::{HttpTemplateSource, TemplateSource};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A meme image plus its fixed number of caption boxes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    pub image_url: String,
    pub width: u32,
    pub height: u32,
    pub native_box_count: u32,
}

/// Indexed, immutable set of templates from one fetch.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: Vec<Template>,
    index: HashMap<String, usize>,
    fetched_at: DateTime<Utc>,
}

impl TemplateCatalog {
    /// Build a catalog stamped with the current time.
    pub fn new(templates: Vec<Template>) -> Self {
        Self::with_fetched_at(templates, Utc::now())
    }

    /// Build a catalog with an explicit fetch timestamp.
    ///
    /// Templates keep their source order, which is treated as popularity
    /// order. If an id appears twice, lookups resolve to the first one.
    pub fn with_fetched_at(templates: Vec<Template>, fetched_at: DateTime<Utc>) -> Self {
        let mut index = HashMap::with_capacity(templates.len());
        for (i, template) in templates.iter().enumerate() {
            index.entry(template.id.clone()).or_insert(i);
        }
        Self {
            templates,
            index,
            fetched_at,
        }
    }

    /// All templates in popularity order.
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.index.get(id).map(|&i| &self.templates[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Format metadata for a template id, if it resolves.
    pub fn format_info(&self, id: &str) -> Option<FormatInfo> {
        self.get(id).map(format::format_info)
    }

    /// Templates with a curated format entry, in catalog order.
    pub fn curated(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter().filter(|t| format::is_curated(&t.id))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}
