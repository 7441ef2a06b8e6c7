//! Control commands
//!
//! Commands arrive as JSON objects tagged by `type`:
//!
//! ```json
//! {"type": "select", "idx": 2}
//! {"type": "select", "name": "Country"}
//! {"type": "start"}
//! {"type": "start_at_stage", "idx": 0, "stage": 3}
//! {"type": "schedule", "idx": 0, "stage": 2, "at": 1700000000}
//! {"type": "stop"}
//! ```

use alloc::string::String;

use embassy_sync::blocking_mutex::raw::RawMutex;
use levain_core::catalog::SelectionError;
use levain_core::state::Event;
use levain_core::traits::OutputBank;
use levain_core::{ControlError, Controller};
use serde::{Deserialize, Serialize};

use crate::error::WireError;

/// Control command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    /// Set the pending program by catalog index or by name
    #[serde(rename = "select")]
    Select {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        idx: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// Start a program, the pending selection if `idx` is absent
    #[serde(rename = "start")]
    Start {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        idx: Option<usize>,
    },
    /// Start a program part way through
    #[serde(rename = "start_at_stage")]
    StartAtStage {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        idx: Option<usize>,
        stage: usize,
    },
    /// Start a program at `at` (epoch s), the pending selection if
    /// `idx` is absent
    #[serde(rename = "schedule")]
    Schedule {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        idx: Option<usize>,
        #[serde(default)]
        stage: usize,
        at: u64,
    },
    /// Stop the run and drop any scheduled start
    #[serde(rename = "stop")]
    Stop,
    /// Skip to the next stage
    #[serde(rename = "advance")]
    Advance,
    /// Restart the previous stage
    #[serde(rename = "back")]
    Back,
}

/// What a command did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Program index now pending
    Selected(usize),
    /// Whether a run was started (`false`: one was already running)
    Started(bool),
    /// Whether a start was armed (`false`: a program is running)
    Scheduled(bool),
    /// Whether a run or scheduled start was stopped (`false`: neither)
    Stopped(bool),
    /// Stage navigation result
    Moved(Event),
}

impl Command {
    pub fn parse(json: &str) -> Result<Self, WireError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Run the command against a controller at `now` (epoch s)
    pub fn execute<M: RawMutex, O: OutputBank>(
        &self,
        controller: &Controller<M, O>,
        now: u64,
    ) -> Result<Outcome, WireError> {
        let outcome = match self {
            Command::Select { idx: Some(index), .. } => {
                controller.select(*index)?;
                Outcome::Selected(*index)
            }
            Command::Select {
                idx: None,
                name: Some(name),
            } => Outcome::Selected(controller.select_by_name(name)?),
            Command::Select {
                idx: None,
                name: None,
            } => return Err(WireError::MissingTarget),
            Command::Start { idx: Some(index) } => {
                Outcome::Started(controller.start_program(*index, now)?)
            }
            Command::Start { idx: None } => Outcome::Started(controller.start(now)?),
            Command::StartAtStage { idx, stage } => {
                let index = target(controller, *idx)?;
                Outcome::Started(controller.start_at_stage(index, *stage, now)?)
            }
            Command::Schedule { idx, stage, at } => {
                let index = target(controller, *idx)?;
                Outcome::Scheduled(controller.schedule_start(index, *stage, *at, now)?)
            }
            Command::Stop => Outcome::Stopped(controller.stop(now)),
            Command::Advance => Outcome::Moved(controller.advance(now)?),
            Command::Back => Outcome::Moved(controller.back(now)?),
        };
        Ok(outcome)
    }
}

/// Explicit program index, else the pending selection
fn target<M: RawMutex, O: OutputBank>(
    controller: &Controller<M, O>,
    idx: Option<usize>,
) -> Result<usize, ControlError> {
    idx.or_else(|| controller.selected())
        .ok_or(ControlError::from(SelectionError::NothingSelected))
}
