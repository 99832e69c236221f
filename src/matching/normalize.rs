//! Normalize raw candidate objects from model output.
//!
//! Input is one JSON value of unknown shape. Output is a [`MatchCandidate`]
//! whose captions are internally consistent, or `None` when the template id
//! does not resolve (the caller drops that candidate).
//!
//! Order of operations:
//!
//! 1. resolve `templateId` against the catalog
//! 2. take `layoutKind`/slot positions from the candidate, else from the template's format
//! 3. reconcile `textSlots` with `primaryTopText`/`primaryBottomText`
//!
//! Normalizing a serialized, already-normalized candidate returns it unchanged.

use serde_json::{Map, Value};

use super::{MatchCandidate, TextSlot};
use crate::catalog::{FormatInfo, LayoutKind, SlotPosition, TemplateCatalog};

/// Normalize one raw candidate. Returns `None` if its template can't be resolved.
pub fn normalize_candidate(raw: &Value, catalog: &TemplateCatalog) -> Option<MatchCandidate> {
    let obj = raw.as_object()?;

    let template_id = id_field(obj, &["templateId", "template_id", "id"])?;
    let Some(template) = catalog.get(&template_id) else {
        tracing::debug!(template_id = %template_id, "dropping candidate with unknown template");
        return None;
    };
    let format = crate::catalog::format::format_info(template);

    let layout_kind = text_field(obj, &["layoutKind", "layout_kind", "layout"])
        .and_then(|s| LayoutKind::parse(&s))
        .unwrap_or(format.layout_kind);

    let slots = parse_slots(
        obj.get("textSlots").or_else(|| obj.get("text_slots")),
        &format,
    );
    let top = text_field(obj, &["primaryTopText", "topText", "top_text"]);
    let bottom = text_field(obj, &["primaryBottomText", "bottomText", "bottom_text"]);
    let (text_slots, primary_top_text, primary_bottom_text) = reconcile(slots, top, bottom);

    Some(MatchCandidate {
        template_id: template.id.clone(),
        template_name: template.name.clone(),
        reasoning: text_field(obj, &["reasoning", "reason"]).unwrap_or_default(),
        layout_kind,
        text_slots,
        primary_top_text,
        primary_bottom_text,
    })
}

/// Make slots and primary texts agree.
///
/// - no slots: synthesize `top` and `bottom` from the primary texts
/// - a `top`/`bottom` slot exists: an empty slot takes the primary text, then
///   the primary text takes the slot's
/// - no `top` slot: a missing primary top comes from the first slot
/// - no `bottom` slot: a missing primary bottom comes from the last slot when
///   there are at least two
fn reconcile(
    mut slots: Vec<TextSlot>,
    top: Option<String>,
    bottom: Option<String>,
) -> (Vec<TextSlot>, String, String) {
    let top = top.filter(|t| !t.is_empty());
    let bottom = bottom.filter(|t| !t.is_empty());

    if slots.is_empty() {
        let top = top.unwrap_or_default();
        let bottom = bottom.unwrap_or_default();
        let slots = vec![
            TextSlot::new(SlotPosition::Top, top.clone()),
            TextSlot::new(SlotPosition::Bottom, bottom.clone()),
        ];
        return (slots, top, bottom);
    }

    let top_text = match backfill_slot(&mut slots, SlotPosition::Top, top.as_deref()) {
        Some(text) => text,
        None => top.unwrap_or_else(|| slots[0].text.clone()),
    };

    let bottom_text = match backfill_slot(&mut slots, SlotPosition::Bottom, bottom.as_deref()) {
        Some(text) => text,
        None => bottom.unwrap_or_else(|| {
            if slots.len() >= 2 {
                slots[slots.len() - 1].text.clone()
            } else {
                String::new()
            }
        }),
    };

    (slots, top_text, bottom_text)
}

/// Fill an empty slot at `position` from `primary`; return the slot's final text.
fn backfill_slot(
    slots: &mut [TextSlot],
    position: SlotPosition,
    primary: Option<&str>,
) -> Option<String> {
    let slot = slots.iter_mut().find(|s| s.position == position)?;
    if slot.text.is_empty() {
        if let Some(text) = primary {
            slot.text = text.to_string();
        }
    }
    Some(slot.text.clone())
}

/// Parse `textSlots` in either `{position, text}` or `{"top": "..."}` form.
///
/// Slots without a recognizable position borrow the format's position at the
/// same index; if the format has no slot there, they are dropped. Only the
/// first slot at each position is kept.
fn parse_slots(value: Option<&Value>, format: &FormatInfo) -> Vec<TextSlot> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut seen: Vec<SlotPosition> = Vec::with_capacity(items.len());
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let (position, text) = match item {
                Value::Object(map) => match map.get("text").and_then(Value::as_str) {
                    Some(text) => {
                        let position = map
                            .get("position")
                            .and_then(Value::as_str)
                            .and_then(SlotPosition::parse);
                        (position, text)
                    }
                    None => shorthand_slot(map)?,
                },
                Value::String(text) => (None, text.as_str()),
                _ => return None,
            };
            let position = position.or_else(|| format.position_at(i))?;
            if seen.contains(&position) {
                return None;
            }
            seen.push(position);
            Some(TextSlot::new(position, text.trim()))
        })
        .collect()
}

/// `{"top": "WAITING"}` → `(Some(Top), "WAITING")`.
fn shorthand_slot(map: &Map<String, Value>) -> Option<(Option<SlotPosition>, &str)> {
    map.iter().find_map(|(key, value)| {
        let position = SlotPosition::parse(key)?;
        value.as_str().map(|text| (Some(position), text))
    })
}

/// First string field among `keys`, trimmed.
fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_str))
        .map(|s| s.trim().to_string())
}

/// First id-like field among `keys`; numbers are accepted and stringified.
fn id_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| match obj.get(*key)? {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|id| !id.is_empty())
}
