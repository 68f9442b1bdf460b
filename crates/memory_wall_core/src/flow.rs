//! crates/memory_wall_core/src/flow.rs
//!
//! The guided introduction: a fixed narrative script walked step by step, with a
//! single input step where the visitor may leave one thought.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{NewThought, Principal};
use crate::gate::BOARD_PATH;

/// What a step lets the visitor do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepCapability {
    /// Text only; Enter/Space moves on.
    Narrative,
    /// Shows the text box and submit button.
    Input,
    /// The closing step.
    Terminal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub text: String,
    pub prompt: Option<String>,
    pub capability: StepCapability,
}

impl Step {
    pub fn new(text: &str, prompt: Option<&str>, capability: StepCapability) -> Self {
        Self {
            text: text.to_string(),
            prompt: prompt.map(str::to_string),
            capability,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("A script needs at least one step")]
    EmptyScript,
    #[error("A script needs exactly one input step, found {0}")]
    InputSteps(usize),
}

/// An ordered, validated list of steps containing exactly one input step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    steps: Vec<Step>,
    input_index: usize,
}

impl Script {
    pub fn new(steps: Vec<Step>) -> Result<Self, FlowError> {
        if steps.is_empty() {
            return Err(FlowError::EmptyScript);
        }
        let inputs: Vec<usize> = steps
            .iter()
            .enumerate()
            .filter(|(_, s)| s.capability == StepCapability::Input)
            .map(|(i, _)| i)
            .collect();
        match inputs.as_slice() {
            [input_index] => Ok(Self {
                input_index: *input_index,
                steps,
            }),
            other => Err(FlowError::InputSteps(other.len())),
        }
    }

    /// The reunion script: three reflections, the input step, then a thank-you.
    pub fn reunion() -> Self {
        let steps = vec![
            Step::new(
                "Can you believe how far we've come? These years have been a mix of highs and lows, lessons and laughter, and moments that will stay with us forever.",
                Some("Press Enter or Spacebar to continue..."),
                StepCapability::Narrative,
            ),
            Step::new(
                "As we near the finish line, it's a great time to reflect. What memories have made you smile, and what moments have shaped you into who you are today?",
                None,
                StepCapability::Narrative,
            ),
            Step::new(
                "This final semester is a chance to celebrate everything we've achieved and support each other as we take our next steps forward. What do you hope for, and how do you see us growing together?",
                None,
                StepCapability::Narrative,
            ),
            Step::new(
                "Share your thoughts, your favorite memories, kind words, or even a little inspiration for everyone. Your story matters.",
                Some("Type your message and click the button to submit..."),
                StepCapability::Input,
            ),
            Step::new(
                "Thank you for sharing. Together, let's make these last months a chapter filled with hope, kindness, and unforgettable memories.",
                None,
                StepCapability::Terminal,
            ),
        ];
        Self {
            steps,
            input_index: 3,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn input_index(&self) -> usize {
        self.input_index
    }
}

/// Why a submission was refused. Nothing is written in any of these cases.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SubmitRejected {
    #[error("Thoughts can only be submitted from the input step")]
    NotAtInputStep,
    #[error("A thought cannot be empty")]
    Empty,
    #[error("This account is not authorized to share thoughts")]
    NotAuthorized,
    #[error("A thought was already submitted")]
    AlreadySubmitted,
}

/// Walks one visitor through a [`Script`].
#[derive(Debug, Clone)]
pub struct SubmissionFlow {
    script: Script,
    current: usize,
    draft: String,
    submitted: bool,
    authorized: bool,
}

impl SubmissionFlow {
    pub fn new(script: Script, authorized: bool) -> Self {
        Self {
            script,
            current: 0,
            draft: String::new(),
            submitted: false,
            authorized,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_step(&self) -> &Step {
        // `current` never leaves 0..len and scripts are never empty.
        &self.script.steps[self.current]
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: &str) {
        self.draft = text.to_string();
    }

    pub fn at_input_step(&self) -> bool {
        self.current == self.script.input_index
    }

    /// The text box is shown only to authorized visitors who have not submitted yet.
    pub fn input_visible(&self) -> bool {
        self.at_input_step() && self.authorized && !self.submitted
    }

    /// Unauthorized visitors see a static notice in place of the text box.
    pub fn shows_not_authorized(&self) -> bool {
        self.at_input_step() && !self.authorized
    }

    pub fn can_retreat(&self) -> bool {
        self.current > 0
    }

    pub fn can_advance(&self) -> bool {
        self.current + 1 < self.script.len()
    }

    /// Moves forward one step; a no-op on the last step.
    pub fn advance(&mut self) -> bool {
        if self.can_advance() {
            self.current += 1;
            true
        } else {
            false
        }
    }

    /// Moves back one step; a no-op on the first step.
    pub fn retreat(&mut self) -> bool {
        if self.can_retreat() {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    /// Enter and Space advance, but only before the input step so typing is never hijacked.
    pub fn key_press(&mut self, key: &str) -> bool {
        let advancing_key = matches!(key, "Enter" | " " | "Space");
        if advancing_key && self.current < self.script.input_index {
            self.advance()
        } else {
            false
        }
    }

    /// Leaves the flow from any step. Returns where to navigate.
    pub fn skip(&self) -> &'static str {
        BOARD_PATH
    }

    /// Latches the flow as submitted and returns the record to write.
    ///
    /// The latch is set before the write happens and is never released, so a failed
    /// write is not retried from this flow.
    pub fn submit(
        &mut self,
        text: &str,
        author: &Principal,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<NewThought, SubmitRejected> {
        if !self.at_input_step() {
            return Err(SubmitRejected::NotAtInputStep);
        }
        if !self.authorized {
            return Err(SubmitRejected::NotAuthorized);
        }
        if self.submitted {
            return Err(SubmitRejected::AlreadySubmitted);
        }
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SubmitRejected::Empty);
        }

        self.submitted = true;
        self.draft = trimmed.to_string();
        Ok(NewThought {
            name: name.to_string(),
            email: author.email.clone(),
            user_id: author.user_id.clone(),
            thought: trimmed.to_string(),
            timestamp: now,
        })
    }
}
