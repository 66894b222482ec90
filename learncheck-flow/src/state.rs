//! Screen-state machine for the learning-check flow.
//!
//! The flow is a cycle, not a terminal machine:
//! - Ready -> HairCheck (start)
//! - HairCheck -> Call (join, device gate passed, session created)
//! - HairCheck -> Ready (cancel, or session creation failed)
//! - Call -> Ready (leave)

use std::fmt;

/// Screen currently presented by the learning-check flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenState {
    /// Entry screen. No remote session exists.
    Ready,
    /// Pre-flight device check before joining a session.
    HairCheck,
    /// Live conversation in progress; a conversation handle is held.
    Call,
}

impl fmt::Display for ScreenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScreenState::Ready => write!(f, "ready"),
            ScreenState::HairCheck => write!(f, "hairCheck"),
            ScreenState::Call => write!(f, "call"),
        }
    }
}

impl ScreenState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &ScreenState) -> bool {
        matches!(
            (self, target),
            (ScreenState::Ready, ScreenState::HairCheck)
                | (ScreenState::HairCheck, ScreenState::Call)
                | (ScreenState::HairCheck, ScreenState::Ready)
                | (ScreenState::Call, ScreenState::Ready)
        )
    }
}
