//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser and the two page
//! sessions: the introduction (submission flow) and the thought board.

use memory_wall_core::board::{Bubble, Detail, DisclosureMode};
use memory_wall_core::flow::{StepCapability, SubmissionFlow};
use serde::{Deserialize, Serialize};

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Messages accepted on `/ws/introduction`.
#[derive(Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntroductionMessage {
    /// The "Next" button.
    Next,
    /// The "Previous" button.
    Previous,
    /// A raw key press; Enter and Space advance through the narrative.
    Key { key: String },
    /// Leave the introduction for the board.
    Skip,
    /// The text box contents as typed so far.
    Draft { text: String },
    Submit { text: String },
}

/// Messages accepted on `/ws/board`.
#[derive(Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoardMessage {
    /// Reports the viewport width; decides hover or tap disclosure.
    Viewport { width: u32 },
    HoverEnter { id: String },
    HoverLeave { id: String },
    Tap { id: String },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The introduction step to render.
    Step {
        index: usize,
        total: usize,
        text: String,
        prompt: Option<String>,
        capability: StepCapability,
        /// Show the text box and submit button.
        input_visible: bool,
        /// Show the static "not authorized" notice instead of the text box.
        not_authorized: bool,
        can_go_back: bool,
        can_go_forward: bool,
    },

    /// The thought was stored.
    Submitted,

    /// The page is over; the client should go to `to`.
    Navigate { to: String },

    /// The session no longer admits this page.
    Redirect { to: String },

    /// A new decorative background image.
    Backdrop { index: usize, image: String },

    /// Every bubble of the board with its placement.
    Layout {
        bubbles: Vec<Bubble>,
        mode: DisclosureMode,
    },

    /// Details of every bubble currently disclosed.
    Disclosure { open: Vec<Detail> },

    /// A non-fatal notification (toast).
    Notice { message: String },

    /// Reports an error to the client, which should display an error message.
    Error { message: String },
}

impl ServerMessage {
    /// The current step of a flow as seen by the client.
    pub fn step(flow: &SubmissionFlow) -> Self {
        let step = flow.current_step();
        ServerMessage::Step {
            index: flow.current_index(),
            total: flow.script().len(),
            text: step.text.clone(),
            prompt: step.prompt.clone(),
            capability: step.capability,
            input_visible: flow.input_visible(),
            not_authorized: flow.shows_not_authorized(),
            can_go_back: flow.can_retreat(),
            can_go_forward: flow.can_advance(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_messages_are_tagged() {
        let msg: IntroductionMessage =
            serde_json::from_value(json!({"type": "submit", "text": "hi"})).unwrap();
        assert_eq!(msg, IntroductionMessage::Submit { text: "hi".into() });

        let msg: BoardMessage =
            serde_json::from_value(json!({"type": "hover_enter", "id": "t1"})).unwrap();
        assert_eq!(msg, BoardMessage::HoverEnter { id: "t1".into() });
    }

    #[test]
    fn server_messages_are_tagged() {
        let value = serde_json::to_value(ServerMessage::Navigate {
            to: "/landing".into(),
        })
        .unwrap();
        assert_eq!(value, json!({"type": "navigate", "to": "/landing"}));
    }
}
