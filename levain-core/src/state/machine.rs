//! State machine definition
//!
//! Output behavior is a function of the current state: nothing is
//! energized outside `Running`.

use super::events::Event;

/// Run states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// No program running, outputs off
    #[default]
    Idle,
    /// Program executing a stage
    Running,
    /// Last stage finished; lasts until the completion snapshot is published
    Done,
}

impl State {
    /// Check if a program is executing
    pub fn is_running(&self) -> bool {
        matches!(self, State::Running)
    }

    /// Check if this state allows any output to be energized
    pub fn outputs_allowed(&self) -> bool {
        matches!(self, State::Running)
    }

    /// Check if a new program may be started from this state
    pub fn can_start(&self) -> bool {
        matches!(self, State::Idle)
    }

    /// Process an event and return the next state
    pub fn transition(self, event: Event) -> Self {
        use Event::*;
        use State::*;

        match (self, event) {
            // Idle transitions
            (Idle, Start) => Running,

            // Running transitions
            (Running, StageAdvanced) => Running,
            (Running, StageRewound) => Running,
            (Running, ProgramFinished) => Done,
            (Running, Stop) => Idle,

            // Done transitions
            (Done, Settled) => Idle,
            (Done, Stop) => Idle,

            // Default: stay in current state
            _ => self,
        }
    }
}
