//! crates/memory_wall_core/src/board.rs
//!
//! The thought board: randomized bubble placement and the hover/tap disclosure
//! state machine.
//!
//! Placements are recomputed on every layout and never persisted. The random
//! source is always passed in so layouts can be reproduced with a seeded rng.

use rand::Rng;
use serde::Serialize;
use std::ops::Range;

use crate::domain::Thought;

/// Diameter range of a bubble, in pixels.
pub const DIAMETER: Range<f64> = 50.0..55.0;

/// Position range of a bubble's centre, in percent of the viewport on each axis.
pub const POSITION: Range<f64> = 0.0..90.0;

/// Viewports narrower than this use tap-to-toggle disclosure.
pub const DEFAULT_NARROW_BREAKPOINT: u32 = 768;

pub const PALETTE: [&str; 20] = [
    "#FFFFE0", "#FFFACD", "#FAFAD2", "#FFEFD5", "#FFE4B5", "#FFD700", "#FFF8DC", "#FDF5E6",
    "#FFFAF0", "#FFFFFF", "#FFB6C1", "#FFCCCB", "#FAD6D0", "#F7A7B3", "#FFDDEE", "#F4C2C2",
    "#F7B7A3", "#FFC0CB", "#FF9AA2", "#F1B6D4",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub diameter: f64,
    pub top_pct: f64,
    pub left_pct: f64,
    pub color: &'static str,
}

impl Placement {
    /// Draws one placement. Positions are independent; overlap is expected.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            diameter: rng.gen_range(DIAMETER),
            top_pct: rng.gen_range(POSITION),
            left_pct: rng.gen_range(POSITION),
            color: PALETTE[rng.gen_range(0..PALETTE.len())],
        }
    }

    pub fn within_bounds(&self) -> bool {
        DIAMETER.contains(&self.diameter)
            && POSITION.contains(&self.top_pct)
            && POSITION.contains(&self.left_pct)
            && PALETTE.contains(&self.color)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bubble {
    pub id: String,
    pub teaser: String,
    pub placement: Placement,
}

/// The bubble label before disclosure: the first word followed by an ellipsis.
pub fn teaser(text: &str) -> String {
    let first = text.split_whitespace().next().unwrap_or("");
    format!("{}...", first)
}

/// Lays out one bubble per thought.
pub fn layout<R: Rng + ?Sized>(thoughts: &[Thought], rng: &mut R) -> Vec<Bubble> {
    thoughts
        .iter()
        .map(|t| Bubble {
            id: t.id.clone(),
            teaser: teaser(&t.thought),
            placement: Placement::random(rng),
        })
        .collect()
}

/// Full content revealed for one bubble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detail {
    pub id: String,
    pub thought: String,
    pub name: String,
    /// Present only when the thought allows comments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<String>>,
}

impl From<&Thought> for Detail {
    fn from(t: &Thought) -> Self {
        let comments = t
            .allow_comments
            .then(|| t.comments.values().map(|c| c.text.clone()).collect());
        Self {
            id: t.id.clone(),
            thought: t.thought.clone(),
            name: t.name.clone(),
            comments,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisclosureMode {
    /// Wide viewports: pointer hover opens, leaving closes; several may be open.
    Hover,
    /// Narrow viewports: taps toggle, at most one open.
    Toggle,
}

impl DisclosureMode {
    pub fn for_width(width: u32, breakpoint: u32) -> Self {
        if width < breakpoint {
            DisclosureMode::Toggle
        } else {
            DisclosureMode::Hover
        }
    }
}

/// Which bubbles currently show their detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disclosure {
    mode: DisclosureMode,
    open: Vec<String>,
}

impl Disclosure {
    pub fn new(mode: DisclosureMode) -> Self {
        Self {
            mode,
            open: Vec::new(),
        }
    }

    pub fn mode(&self) -> DisclosureMode {
        self.mode
    }

    pub fn open_ids(&self) -> &[String] {
        &self.open
    }

    pub fn is_open(&self, id: &str) -> bool {
        self.open.iter().any(|o| o == id)
    }

    /// Switching modes closes everything.
    pub fn set_mode(&mut self, mode: DisclosureMode) -> bool {
        if self.mode == mode {
            return false;
        }
        self.mode = mode;
        self.open.clear();
        true
    }

    pub fn hover_enter(&mut self, id: &str) -> bool {
        if self.mode != DisclosureMode::Hover || self.is_open(id) {
            return false;
        }
        self.open.push(id.to_string());
        true
    }

    pub fn hover_leave(&mut self, id: &str) -> bool {
        if self.mode != DisclosureMode::Hover {
            return false;
        }
        let before = self.open.len();
        self.open.retain(|o| o != id);
        before != self.open.len()
    }

    /// Toggles `id`; opening it closes whichever bubble was open before.
    pub fn tap(&mut self, id: &str) -> bool {
        if self.mode != DisclosureMode::Toggle {
            return false;
        }
        if self.is_open(id) {
            self.open.clear();
        } else {
            self.open.clear();
            self.open.push(id.to_string());
        }
        true
    }
}

/// A loaded board: the thoughts, their bubbles and the disclosure state.
#[derive(Debug, Clone)]
pub struct Board {
    thoughts: Vec<Thought>,
    bubbles: Vec<Bubble>,
    disclosure: Disclosure,
}

impl Board {
    pub fn new<R: Rng + ?Sized>(thoughts: Vec<Thought>, mode: DisclosureMode, rng: &mut R) -> Self {
        let bubbles = layout(&thoughts, rng);
        Self {
            thoughts,
            bubbles,
            disclosure: Disclosure::new(mode),
        }
    }

    pub fn empty(mode: DisclosureMode) -> Self {
        Self {
            thoughts: Vec::new(),
            bubbles: Vec::new(),
            disclosure: Disclosure::new(mode),
        }
    }

    pub fn bubbles(&self) -> &[Bubble] {
        &self.bubbles
    }

    pub fn disclosure(&self) -> &Disclosure {
        &self.disclosure
    }

    fn contains(&self, id: &str) -> bool {
        self.thoughts.iter().any(|t| t.id == id)
    }

    pub fn set_mode(&mut self, mode: DisclosureMode) -> bool {
        self.disclosure.set_mode(mode)
    }

    pub fn hover_enter(&mut self, id: &str) -> bool {
        self.contains(id) && self.disclosure.hover_enter(id)
    }

    pub fn hover_leave(&mut self, id: &str) -> bool {
        self.disclosure.hover_leave(id)
    }

    pub fn tap(&mut self, id: &str) -> bool {
        self.contains(id) && self.disclosure.tap(id)
    }

    /// Details of every open bubble, in the order they were opened.
    pub fn open_details(&self) -> Vec<Detail> {
        self.disclosure
            .open_ids()
            .iter()
            .filter_map(|id| self.thoughts.iter().find(|t| &t.id == id))
            .map(Detail::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Comment;
    use chrono::Utc;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::BTreeMap;

    fn thought(id: &str, text: &str) -> Thought {
        Thought {
            id: id.into(),
            name: "Anonymous".into(),
            email: String::new(),
            user_id: String::new(),
            thought: text.into(),
            timestamp: Utc::now(),
            allow_comments: false,
            comments: BTreeMap::new(),
        }
    }

    #[test]
    fn teaser_is_first_word() {
        assert_eq!(teaser("Best four years ever"), "Best...");
        assert_eq!(teaser("  leading\tspace"), "leading...");
        assert_eq!(teaser("single"), "single...");
        assert_eq!(teaser(""), "...");
    }

    #[test]
    fn every_thought_gets_a_bubble_within_bounds() {
        let thoughts: Vec<Thought> = (0..200)
            .map(|i| thought(&format!("t{}", i), "hello there"))
            .collect();
        let mut rng = StdRng::seed_from_u64(7);
        let bubbles = layout(&thoughts, &mut rng);
        assert_eq!(bubbles.len(), 200);
        assert!(bubbles.iter().all(|b| b.placement.within_bounds()));
    }

    #[test]
    fn empty_collection_gives_empty_board() {
        let mut rng = StdRng::seed_from_u64(1);
        let board = Board::new(vec![], DisclosureMode::Hover, &mut rng);
        assert!(board.bubbles().is_empty());
        assert!(board.open_details().is_empty());
    }

    #[test]
    fn seeded_layout_is_reproducible() {
        let thoughts = vec![thought("a", "one"), thought("b", "two")];
        let first = layout(&thoughts, &mut StdRng::seed_from_u64(42));
        let second = layout(&thoughts, &mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);
    }

    #[test]
    fn narrow_viewport_opens_one_at_a_time() {
        let mode = DisclosureMode::for_width(375, DEFAULT_NARROW_BREAKPOINT);
        assert_eq!(mode, DisclosureMode::Toggle);
        let mut board = Board::new(
            vec![thought("b1", "first"), thought("b2", "second")],
            mode,
            &mut StdRng::seed_from_u64(3),
        );

        assert!(board.tap("b1"));
        assert_eq!(board.disclosure().open_ids(), ["b1".to_string()]);
        assert!(board.tap("b2"));
        assert_eq!(board.disclosure().open_ids(), ["b2".to_string()]);
        assert!(board.tap("b2"));
        assert!(board.disclosure().open_ids().is_empty());

        // Hover does nothing on narrow viewports.
        assert!(!board.hover_enter("b1"));
    }

    #[test]
    fn wide_viewport_hover_may_overlap() {
        let mode = DisclosureMode::for_width(1280, DEFAULT_NARROW_BREAKPOINT);
        assert_eq!(mode, DisclosureMode::Hover);
        let mut board = Board::new(
            vec![thought("b1", "first"), thought("b2", "second")],
            mode,
            &mut StdRng::seed_from_u64(3),
        );

        assert!(board.hover_enter("b1"));
        assert!(board.hover_enter("b2"));
        assert_eq!(board.open_details().len(), 2);
        assert!(board.hover_leave("b1"));
        assert_eq!(board.disclosure().open_ids(), ["b2".to_string()]);
        assert!(!board.tap("b2"));
    }

    #[test]
    fn unknown_bubbles_are_ignored() {
        let mut board = Board::new(
            vec![thought("b1", "first")],
            DisclosureMode::Toggle,
            &mut StdRng::seed_from_u64(3),
        );
        assert!(!board.tap("nope"));
        assert!(board.disclosure().open_ids().is_empty());
    }

    #[test]
    fn switching_mode_closes_everything() {
        let mut disclosure = Disclosure::new(DisclosureMode::Hover);
        disclosure.hover_enter("a");
        assert!(disclosure.set_mode(DisclosureMode::Toggle));
        assert!(disclosure.open_ids().is_empty());
        assert!(!disclosure.set_mode(DisclosureMode::Toggle));
    }

    #[test]
    fn detail_shows_comments_only_when_allowed() {
        let mut t = thought("c", "with comments");
        t.comments
            .insert("k1".into(), Comment { text: "nice".into() });
        assert_eq!(Detail::from(&t).comments, None);

        t.allow_comments = true;
        assert_eq!(Detail::from(&t).comments, Some(vec!["nice".to_string()]));
    }
}
