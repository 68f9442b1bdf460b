//! services/api/src/web/board.rs
//!
//! The thought board page session: a one-shot fetch of every thought, a random
//! layout, and disclosure driven by hover or tap events.

use crate::web::protocol::{BoardMessage, ServerMessage};
use memory_wall_core::board::{Board, DisclosureMode};
use memory_wall_core::domain::{Thought, THOUGHTS};
use memory_wall_core::ports::{DocumentStore, PortResult};
use rand::Rng;
use tracing::{error, warn};

/// Reads the whole `thoughts` collection. Malformed documents are skipped.
pub async fn load_thoughts(store: &dyn DocumentStore) -> PortResult<Vec<Thought>> {
    let documents = store.list_documents(THOUGHTS).await?;
    Ok(documents
        .into_iter()
        .filter_map(|doc| {
            let id = doc.id.clone();
            Thought::from_document(doc)
                .map_err(|e| warn!("Skipping thought {}: {:?}", id, e))
                .ok()
        })
        .collect())
}

pub struct BoardPage {
    board: Board,
    breakpoint: u32,
}

impl BoardPage {
    /// Builds the page from a finished fetch. A failed fetch leaves the board empty
    /// and yields a notice for the client.
    pub fn from_fetch<R: Rng + ?Sized>(
        fetched: PortResult<Vec<Thought>>,
        mode: DisclosureMode,
        breakpoint: u32,
        rng: &mut R,
    ) -> (Self, Option<ServerMessage>) {
        match fetched {
            Ok(thoughts) => (
                Self {
                    board: Board::new(thoughts, mode, rng),
                    breakpoint,
                },
                None,
            ),
            Err(e) => {
                error!("Error fetching thoughts: {:?}", e);
                (
                    Self {
                        board: Board::empty(mode),
                        breakpoint,
                    },
                    Some(ServerMessage::Notice {
                        message: format!("Error fetching thoughts: {}", e),
                    }),
                )
            }
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn layout(&self) -> ServerMessage {
        ServerMessage::Layout {
            bubbles: self.board.bubbles().to_vec(),
            mode: self.board.disclosure().mode(),
        }
    }

    fn disclosure(&self) -> ServerMessage {
        ServerMessage::Disclosure {
            open: self.board.open_details(),
        }
    }

    /// Applies one interaction and returns the frames to send, if anything changed.
    pub fn handle(&mut self, message: BoardMessage) -> Vec<ServerMessage> {
        let changed = match message {
            BoardMessage::Viewport { width } => {
                let mode = DisclosureMode::for_width(width, self.breakpoint);
                if self.board.set_mode(mode) {
                    return vec![self.layout(), self.disclosure()];
                }
                false
            }
            BoardMessage::HoverEnter { id } => self.board.hover_enter(&id),
            BoardMessage::HoverLeave { id } => self.board.hover_leave(&id),
            BoardMessage::Tap { id } => self.board.tap(&id),
        };

        if changed {
            vec![self.disclosure()]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use memory_wall_core::board::DEFAULT_NARROW_BREAKPOINT;
    use memory_wall_core::ports::PortError;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::BTreeMap;

    fn thought(id: &str) -> Thought {
        Thought {
            id: id.into(),
            name: "Alice".into(),
            email: String::new(),
            user_id: String::new(),
            thought: format!("thought {}", id),
            timestamp: Utc::now(),
            allow_comments: false,
            comments: BTreeMap::new(),
        }
    }

    fn page(thoughts: Vec<Thought>, mode: DisclosureMode) -> BoardPage {
        let (page, notice) = BoardPage::from_fetch(
            Ok(thoughts),
            mode,
            DEFAULT_NARROW_BREAKPOINT,
            &mut StdRng::seed_from_u64(11),
        );
        assert!(notice.is_none());
        page
    }

    #[test]
    fn failed_fetch_is_an_empty_board_with_notice() {
        let (page, notice) = BoardPage::from_fetch(
            Err(PortError::Unexpected("offline".into())),
            DisclosureMode::Hover,
            DEFAULT_NARROW_BREAKPOINT,
            &mut StdRng::seed_from_u64(1),
        );
        assert!(page.board().bubbles().is_empty());
        assert!(matches!(notice, Some(ServerMessage::Notice { .. })));
    }

    #[test]
    fn taps_on_narrow_viewports_keep_one_detail_open() {
        let mut page = page(vec![thought("b1"), thought("b2")], DisclosureMode::Toggle);

        let frames = page.handle(BoardMessage::Tap { id: "b1".into() });
        assert!(matches!(&frames[..], [ServerMessage::Disclosure { open }] if open.len() == 1 && open[0].id == "b1"));

        let frames = page.handle(BoardMessage::Tap { id: "b2".into() });
        assert!(matches!(&frames[..], [ServerMessage::Disclosure { open }] if open.len() == 1 && open[0].id == "b2"));
    }

    #[test]
    fn resizing_across_the_breakpoint_resends_layout() {
        let mut page = page(vec![thought("b1")], DisclosureMode::Hover);
        page.handle(BoardMessage::HoverEnter { id: "b1".into() });

        let frames = page.handle(BoardMessage::Viewport { width: 400 });
        assert!(matches!(
            &frames[..],
            [ServerMessage::Layout { mode: DisclosureMode::Toggle, .. }, ServerMessage::Disclosure { open }] if open.is_empty()
        ));
        assert!(page.handle(BoardMessage::Viewport { width: 500 }).is_empty());
    }

    #[test]
    fn hover_on_unknown_bubble_sends_nothing() {
        let mut page = page(vec![thought("b1")], DisclosureMode::Hover);
        assert!(page.handle(BoardMessage::HoverEnter { id: "zz".into() }).is_empty());
    }
}
