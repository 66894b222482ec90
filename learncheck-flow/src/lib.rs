//! Learning-check screen flow for learncheck
//!
//! This crate provides the screen-state machine, the hair-check device
//! gate and the orchestrator that drives a learning-check session.

pub mod hair_check;
pub mod orchestrator;
pub mod state;

pub use hair_check::{
    DeviceError, DeviceInfo, DeviceReport, HairCheckScreen, MediaProbe, SystemMediaProbe,
};
pub use orchestrator::{JoinOutcome, LearningCheck};
pub use state::ScreenState;
