//! crates/memory_wall_core/src/gate.rs
//!
//! The session gate: decides, for every session-change notification, whether a
//! page may render and with which capabilities.
//!
//! Policy: sessions that are missing or unverified are denied with a redirect to
//! the login page. Verified sessions whose email does not match the institutional
//! pattern are admitted view-only; they may browse but never write.

use regex::Regex;

use crate::domain::Principal;

pub const LOGIN_PATH: &str = "/login";
pub const BOARD_PATH: &str = "/landing";
pub const INTRODUCTION_PATH: &str = "/introduction";

/// Institutional address pattern: `<local>.2125<branch><roll>@kiet.edu`.
pub const DEFAULT_EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+\.2125[a-z]*[0-9]*@kiet\.edu$";

/// Compiled institutional email pattern.
#[derive(Debug, Clone)]
pub struct EmailPolicy {
    pattern: Regex,
}

impl EmailPolicy {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn matches(&self, email: &str) -> bool {
        self.pattern.is_match(email)
    }

    /// Where a freshly signed-in principal should land.
    pub fn landing_for(&self, email: &str) -> &'static str {
        if self.matches(email) {
            INTRODUCTION_PATH
        } else {
            BOARD_PATH
        }
    }
}

/// Outcome of evaluating one session against the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Denied { redirect: &'static str },
    Authorized,
    ViewOnly,
}

impl GateDecision {
    pub fn admits(&self) -> bool {
        !matches!(self, GateDecision::Denied { .. })
    }

    pub fn can_write(&self) -> bool {
        matches!(self, GateDecision::Authorized)
    }
}

/// Evaluates a session synchronously: presence, verification, then email pattern.
pub fn evaluate(session: Option<&Principal>, policy: &EmailPolicy) -> GateDecision {
    match session {
        None => GateDecision::Denied {
            redirect: LOGIN_PATH,
        },
        Some(p) if !p.email_verified => GateDecision::Denied {
            redirect: LOGIN_PATH,
        },
        Some(p) if policy.matches(&p.email) => GateDecision::Authorized,
        Some(_) => GateDecision::ViewOnly,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Loading,
    Resolved(GateDecision),
}

/// What a single notification did to the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateTransition {
    /// The first notification; `Loading` has been left for good.
    Resolved(GateDecision),
    Changed(GateDecision),
    Unchanged(GateDecision),
}

impl GateTransition {
    pub fn decision(&self) -> GateDecision {
        match *self {
            GateTransition::Resolved(d)
            | GateTransition::Changed(d)
            | GateTransition::Unchanged(d) => d,
        }
    }
}

/// Per-page access state machine: `Loading -> {Denied, Authorized, ViewOnly}`.
#[derive(Debug, Clone)]
pub struct SessionGate {
    policy: EmailPolicy,
    state: GateState,
}

impl SessionGate {
    pub fn new(policy: EmailPolicy) -> Self {
        Self {
            policy,
            state: GateState::Loading,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn decision(&self) -> Option<GateDecision> {
        match self.state {
            GateState::Loading => None,
            GateState::Resolved(d) => Some(d),
        }
    }

    /// Feeds one session-change notification through the gate.
    pub fn observe(&mut self, session: Option<&Principal>) -> GateTransition {
        let decision = evaluate(session, &self.policy);
        let previous = std::mem::replace(&mut self.state, GateState::Resolved(decision));
        match previous {
            GateState::Loading => GateTransition::Resolved(decision),
            GateState::Resolved(old) if old == decision => GateTransition::Unchanged(decision),
            GateState::Resolved(_) => GateTransition::Changed(decision),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> EmailPolicy {
        EmailPolicy::new(DEFAULT_EMAIL_PATTERN).unwrap()
    }

    fn principal(email: &str, verified: bool) -> Principal {
        Principal {
            user_id: "uid".into(),
            email: email.into(),
            email_verified: verified,
            first_name: None,
        }
    }

    #[test]
    fn institutional_pattern() {
        let p = policy();
        assert!(p.matches("alice.2125cs001@kiet.edu"));
        assert!(p.matches("bob.smith.2125it@kiet.edu"));
        assert!(!p.matches("alice.2024cs001@kiet.edu"));
        assert!(!p.matches("alice.2125cs001@gmail.com"));
        assert!(!p.matches("2125cs001@kiet.edu"));
    }

    #[test]
    fn unverified_sessions_are_always_denied() {
        let p = policy();
        for email in ["alice.2125cs001@kiet.edu", "someone@example.com", ""] {
            for first_name in [None, Some("Alice".to_string())] {
                let mut session = principal(email, false);
                session.first_name = first_name;
                assert_eq!(
                    evaluate(Some(&session), &p),
                    GateDecision::Denied {
                        redirect: LOGIN_PATH
                    }
                );
            }
        }
        assert!(!evaluate(None, &p).admits());
    }

    #[test]
    fn verified_non_institutional_is_view_only() {
        let decision = evaluate(Some(&principal("someone@example.com", true)), &policy());
        assert_eq!(decision, GateDecision::ViewOnly);
        assert!(decision.admits());
        assert!(!decision.can_write());
    }

    #[test]
    fn loading_is_left_exactly_once() {
        let mut gate = SessionGate::new(policy());
        assert_eq!(gate.state(), GateState::Loading);
        assert_eq!(gate.decision(), None);

        let alice = principal("alice.2125cs001@kiet.edu", true);
        assert_eq!(
            gate.observe(Some(&alice)),
            GateTransition::Resolved(GateDecision::Authorized)
        );
        assert_eq!(
            gate.observe(Some(&alice)),
            GateTransition::Unchanged(GateDecision::Authorized)
        );
        assert_eq!(
            gate.observe(None),
            GateTransition::Changed(GateDecision::Denied {
                redirect: LOGIN_PATH
            })
        );
        assert_ne!(gate.state(), GateState::Loading);
    }

    #[test]
    fn landing_depends_on_pattern() {
        let p = policy();
        assert_eq!(p.landing_for("alice.2125cs001@kiet.edu"), INTRODUCTION_PATH);
        assert_eq!(p.landing_for("someone@example.com"), BOARD_PATH);
    }
}
