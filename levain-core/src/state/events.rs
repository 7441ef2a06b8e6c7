//! Events that trigger state transitions

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    // Control events
    /// Start requested for a resolved program
    Start,
    /// Stop requested
    Stop,

    // Scheduler events
    /// Current stage elapsed (or was skipped) and the next one began
    StageAdvanced,
    /// A previous stage was restarted
    StageRewound,
    /// Last stage elapsed
    ProgramFinished,
    /// Completion has been published, back to idle
    Settled,
}

impl Event {
    /// Check if this event is user-initiated
    pub fn is_user_event(&self) -> bool {
        matches!(self, Event::Start | Event::Stop)
    }

    /// Check if this event is from the scheduler
    pub fn is_scheduler_event(&self) -> bool {
        matches!(
            self,
            Event::StageAdvanced | Event::StageRewound | Event::ProgramFinished | Event::Settled
        )
    }

    /// Check if this event moves to a different stage
    pub fn changes_stage(&self) -> bool {
        matches!(
            self,
            Event::Start | Event::StageAdvanced | Event::StageRewound
        )
    }
}
