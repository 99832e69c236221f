//! # Format Metadata
//!
//! Layout semantics for meme templates: how many caption boxes a template
//! has, where they sit, and what each one is for.
//!
//! Well-known templates have hand-written entries in [`CURATED`]. Everything
//! else gets a default computed from the template's native box count.
//!
//! | Boxes | Layout | Slots |
//! |-------|--------|-------|
//! | 0-2 | `top-bottom` | top (setup), bottom (punchline) |
//! | 3 | `label` | left, right, center |
//! | 4+ | `multi-panel` | panel1..panel4 |

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Template;

/// Overall arrangement of a template's caption boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutKind {
    TopBottom,
    MultiPanel,
    Reaction,
    Comparison,
    Label,
}

impl LayoutKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LayoutKind::TopBottom => "top-bottom",
            LayoutKind::MultiPanel => "multi-panel",
            LayoutKind::Reaction => "reaction",
            LayoutKind::Comparison => "comparison",
            LayoutKind::Label => "label",
        }
    }

    /// Parse a layout name leniently ("top-bottom", "Top_Bottom", "topbottom").
    pub fn parse(s: &str) -> Option<Self> {
        match squash(s).as_str() {
            "topbottom" => Some(LayoutKind::TopBottom),
            "multipanel" | "panels" => Some(LayoutKind::MultiPanel),
            "reaction" => Some(LayoutKind::Reaction),
            "comparison" | "compare" => Some(LayoutKind::Comparison),
            "label" | "labels" | "labeled" => Some(LayoutKind::Label),
            _ => None,
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a caption box sits on the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotPosition {
    Top,
    Bottom,
    Left,
    Right,
    Center,
    Panel1,
    Panel2,
    Panel3,
    Panel4,
}

impl SlotPosition {
    pub const ALL: [SlotPosition; 9] = [
        SlotPosition::Top,
        SlotPosition::Bottom,
        SlotPosition::Left,
        SlotPosition::Right,
        SlotPosition::Center,
        SlotPosition::Panel1,
        SlotPosition::Panel2,
        SlotPosition::Panel3,
        SlotPosition::Panel4,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SlotPosition::Top => "top",
            SlotPosition::Bottom => "bottom",
            SlotPosition::Left => "left",
            SlotPosition::Right => "right",
            SlotPosition::Center => "center",
            SlotPosition::Panel1 => "panel1",
            SlotPosition::Panel2 => "panel2",
            SlotPosition::Panel3 => "panel3",
            SlotPosition::Panel4 => "panel4",
        }
    }

    /// Parse a position name leniently ("Panel 2", "middle", "TOP").
    pub fn parse(s: &str) -> Option<Self> {
        match squash(s).as_str() {
            "top" => Some(SlotPosition::Top),
            "bottom" => Some(SlotPosition::Bottom),
            "left" => Some(SlotPosition::Left),
            "right" => Some(SlotPosition::Right),
            "center" | "centre" | "middle" => Some(SlotPosition::Center),
            "panel1" => Some(SlotPosition::Panel1),
            "panel2" => Some(SlotPosition::Panel2),
            "panel3" => Some(SlotPosition::Panel3),
            "panel4" => Some(SlotPosition::Panel4),
            _ => None,
        }
    }

    /// Panel position for a zero-based index, if there is one.
    pub fn panel(index: usize) -> Option<Self> {
        match index {
            0 => Some(SlotPosition::Panel1),
            1 => Some(SlotPosition::Panel2),
            2 => Some(SlotPosition::Panel3),
            3 => Some(SlotPosition::Panel4),
            _ => None,
        }
    }
}

impl fmt::Display for SlotPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One caption box and its narrative purpose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSlotSpec {
    pub position: SlotPosition,
    pub purpose: String,
}

/// Derived layout semantics for a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatInfo {
    pub box_count: u32,
    pub layout_kind: LayoutKind,
    pub text_slots: Vec<TextSlotSpec>,
}

impl FormatInfo {
    fn from_slots(layout_kind: LayoutKind, slots: &[(SlotPosition, &str)]) -> Self {
        Self {
            box_count: slots.len() as u32,
            layout_kind,
            text_slots: slots
                .iter()
                .map(|(position, purpose)| TextSlotSpec {
                    position: *position,
                    purpose: (*purpose).to_string(),
                })
                .collect(),
        }
    }

    /// Position of the format slot at `index`, if the format has that many slots.
    pub fn position_at(&self, index: usize) -> Option<SlotPosition> {
        self.text_slots.get(index).map(|slot| slot.position)
    }
}

/// A hand-written format entry keyed by template id.
pub struct CuratedFormat {
    pub id: &'static str,
    pub layout_kind: LayoutKind,
    pub slots: &'static [(SlotPosition, &'static str)],
}

use LayoutKind as L;
use SlotPosition as P;

/// Curated formats for widely used templates (imgflip ids).
pub const CURATED: &[CuratedFormat] = &[
    CuratedFormat {
        id: "181913649",
        layout_kind: L::Comparison,
        slots: &[
            (P::Top, "the rejected, disliked option"),
            (P::Bottom, "the preferred, approved option"),
        ],
    },
    CuratedFormat {
        id: "112126428",
        layout_kind: L::Label,
        slots: &[
            (P::Left, "the tempting new thing"),
            (P::Center, "the person being tempted"),
            (P::Right, "the neglected current thing"),
        ],
    },
    CuratedFormat {
        id: "87743020",
        layout_kind: L::Label,
        slots: &[
            (P::Left, "first option on the button"),
            (P::Right, "second, conflicting option"),
            (P::Bottom, "the person sweating over the choice"),
        ],
    },
    CuratedFormat {
        id: "129242436",
        layout_kind: L::Label,
        slots: &[
            (P::Top, "context for the hot take"),
            (P::Bottom, "the controversial opinion on the sign"),
        ],
    },
    CuratedFormat {
        id: "124822590",
        layout_kind: L::Label,
        slots: &[
            (P::Left, "the sensible road straight ahead"),
            (P::Right, "the tempting exit"),
            (P::Bottom, "the driver swerving toward the exit"),
        ],
    },
    CuratedFormat {
        id: "93895088",
        layout_kind: L::MultiPanel,
        slots: &[
            (P::Panel1, "the ordinary idea"),
            (P::Panel2, "a slightly smarter idea"),
            (P::Panel3, "an enlightened idea"),
            (P::Panel4, "the absurd galaxy-brain idea"),
        ],
    },
    CuratedFormat {
        id: "4087833",
        layout_kind: L::TopBottom,
        slots: &[
            (P::Top, "what is being waited for"),
            (P::Bottom, "how absurdly long the wait has been"),
        ],
    },
    CuratedFormat {
        id: "61579",
        layout_kind: L::TopBottom,
        slots: &[
            (P::Top, "ONE DOES NOT SIMPLY"),
            (P::Bottom, "the deceptively hard task"),
        ],
    },
    CuratedFormat {
        id: "438680",
        layout_kind: L::Label,
        slots: &[
            (P::Top, "Robin's bad take"),
            (P::Bottom, "Batman's slap-back retort"),
        ],
    },
    CuratedFormat {
        id: "102156234",
        layout_kind: L::TopBottom,
        slots: &[
            (P::Top, "the statement being mocked"),
            (P::Bottom, "the same statement in mocking alternating caps"),
        ],
    },
    CuratedFormat {
        id: "89370399",
        layout_kind: L::TopBottom,
        slots: &[
            (P::Top, "the flawed but clever premise"),
            (P::Bottom, "the smug conclusion"),
        ],
    },
    CuratedFormat {
        id: "61544",
        layout_kind: L::TopBottom,
        slots: &[
            (P::Top, "the situation"),
            (P::Bottom, "the small victory"),
        ],
    },
    CuratedFormat {
        id: "97984",
        layout_kind: L::Reaction,
        slots: &[
            (P::Top, "the disaster in the background"),
            (P::Bottom, "the smug bystander's comment"),
        ],
    },
    CuratedFormat {
        id: "188390779",
        layout_kind: L::Comparison,
        slots: &[
            (P::Left, "the furious accusation"),
            (P::Right, "the unbothered reply"),
        ],
    },
    CuratedFormat {
        id: "131940431",
        layout_kind: L::MultiPanel,
        slots: &[
            (P::Panel1, "step one of the plan"),
            (P::Panel2, "step two of the plan"),
            (P::Panel3, "the unexpected consequence"),
            (P::Panel4, "realizing the consequence"),
        ],
    },
    CuratedFormat {
        id: "100777631",
        layout_kind: L::Label,
        slots: &[
            (P::Left, "the confused person"),
            (P::Right, "the thing being misidentified"),
            (P::Bottom, "the wrong guess, phrased as 'is this ...?'"),
        ],
    },
    CuratedFormat {
        id: "55311130",
        layout_kind: L::Reaction,
        slots: &[
            (P::Top, "the chaotic situation"),
            (P::Bottom, "the calm denial"),
        ],
    },
    CuratedFormat {
        id: "155067746",
        layout_kind: L::Reaction,
        slots: &[
            (P::Top, "the action taken"),
            (P::Center, "the obvious consequence"),
            (P::Bottom, "the shocked reaction"),
        ],
    },
];

/// Look up a curated format by template id.
pub fn curated(id: &str) -> Option<FormatInfo> {
    CURATED
        .iter()
        .find(|entry| entry.id == id)
        .map(|entry| FormatInfo::from_slots(entry.layout_kind, entry.slots))
}

/// True when the template id has a curated entry.
pub fn is_curated(id: &str) -> bool {
    CURATED.iter().any(|entry| entry.id == id)
}

/// Computed format for templates without a curated entry.
pub fn default_for(box_count: u32) -> FormatInfo {
    match box_count {
        0..=2 => FormatInfo::from_slots(
            L::TopBottom,
            &[(P::Top, "setup"), (P::Bottom, "punchline")],
        ),
        3 => FormatInfo::from_slots(
            L::Label,
            &[
                (P::Left, "first label"),
                (P::Right, "second label"),
                (P::Center, "the subject"),
            ],
        ),
        _ => FormatInfo::from_slots(
            L::MultiPanel,
            &[
                (P::Panel1, "first panel"),
                (P::Panel2, "second panel"),
                (P::Panel3, "third panel"),
                (P::Panel4, "final panel"),
            ],
        ),
    }
}

/// Format for a template: curated entry if one exists, else the computed default.
pub fn format_info(template: &Template) -> FormatInfo {
    curated(&template.id).unwrap_or_else(|| default_for(template.native_box_count))
}

/// Lowercase and drop everything that isn't alphanumeric.
fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
