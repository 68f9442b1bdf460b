//! services/api/src/web/introduction.rs
//!
//! The introduction page session: drives a `SubmissionFlow` from client messages
//! and writes the one thought it may produce.

use crate::web::{
    protocol::{IntroductionMessage, ServerMessage},
    state::AppState,
};
use chrono::Utc;
use memory_wall_core::domain::{Principal, ANONYMOUS, THOUGHTS};
use memory_wall_core::flow::{Script, SubmissionFlow};
use memory_wall_core::gate::{GateDecision, BOARD_PATH};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// What the socket loop should do after a reply has been sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Stay,
    /// Send the client to `to` once `after` has elapsed, then close the page.
    Leave { to: &'static str, after: Duration },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub messages: Vec<ServerMessage>,
    pub transition: Transition,
}

impl Reply {
    fn stay(messages: Vec<ServerMessage>) -> Self {
        Self {
            messages,
            transition: Transition::Stay,
        }
    }
}

pub struct IntroductionPage {
    app_state: Arc<AppState>,
    principal: Principal,
    author_name: String,
    flow: SubmissionFlow,
}

impl IntroductionPage {
    /// Opens the page for an admitted session. View-only sessions get a flow that
    /// can never submit.
    pub async fn open(
        app_state: Arc<AppState>,
        principal: Principal,
        decision: GateDecision,
    ) -> Self {
        let author_name = match app_state.ensure_profile(&principal).await {
            Ok(profile) => profile.display_name().to_string(),
            Err(e) => {
                error!("Failed to load profile for {}: {:?}", principal.user_id, e);
                ANONYMOUS.to_string()
            }
        };
        let flow = SubmissionFlow::new(Script::reunion(), decision.can_write());
        info!(
            "Introduction opened for {} (can submit: {})",
            principal.user_id,
            flow.is_authorized()
        );

        Self {
            app_state,
            principal,
            author_name,
            flow,
        }
    }

    pub fn flow(&self) -> &SubmissionFlow {
        &self.flow
    }

    pub fn author_name(&self) -> &str {
        &self.author_name
    }

    /// The first frame sent after the socket opens.
    pub fn opening(&self) -> Vec<ServerMessage> {
        vec![ServerMessage::step(&self.flow)]
    }

    pub async fn handle(&mut self, message: IntroductionMessage) -> Reply {
        match message {
            IntroductionMessage::Next => self.moved(|flow| flow.advance()),
            IntroductionMessage::Previous => self.moved(|flow| flow.retreat()),
            IntroductionMessage::Key { key } => self.moved(|flow| flow.key_press(&key)),
            IntroductionMessage::Skip => {
                Reply {
                    messages: Vec::new(),
                    transition: Transition::Leave {
                        to: self.flow.skip(),
                        after: Duration::ZERO,
                    },
                }
            }
            IntroductionMessage::Draft { text } => {
                if self.flow.input_visible() {
                    self.flow.set_draft(&text);
                }
                Reply::stay(Vec::new())
            }
            IntroductionMessage::Submit { text } => self.submit(&text).await,
        }
    }

    fn moved(&mut self, step: impl FnOnce(&mut SubmissionFlow) -> bool) -> Reply {
        if step(&mut self.flow) {
            Reply::stay(vec![ServerMessage::step(&self.flow)])
        } else {
            Reply::stay(Vec::new())
        }
    }

    async fn submit(&mut self, text: &str) -> Reply {
        let record = match self
            .flow
            .submit(text, &self.principal, &self.author_name, Utc::now())
        {
            Ok(record) => record,
            Err(rejected) => {
                warn!("Submission rejected for {}: {}", self.principal.user_id, rejected);
                return Reply::stay(vec![ServerMessage::Error {
                    message: rejected.to_string(),
                }]);
            }
        };

        // The flow is latched from here on; a failed write is logged and not retried.
        match self
            .app_state
            .store
            .create_document(THOUGHTS, record.into_fields())
            .await
        {
            Ok(id) => {
                info!("Stored thought {} from {}", id, self.principal.user_id);
                Reply {
                    messages: vec![ServerMessage::Submitted, ServerMessage::step(&self.flow)],
                    transition: Transition::Leave {
                        to: BOARD_PATH,
                        after: self.app_state.config.submit_redirect_delay,
                    },
                }
            }
            Err(e) => {
                error!("Error saving thought: {:?}", e);
                Reply::stay(vec![ServerMessage::step(&self.flow)])
            }
        }
    }
}
