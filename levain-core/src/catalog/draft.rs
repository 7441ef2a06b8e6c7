//! Unvalidated program records
//!
//! Drafts borrow their strings and use signed durations so that anything a
//! client submits can be represented and then rejected with a precise
//! [`ValidationError`](super::ValidationError) instead of failing somewhere
//! in a decoder.

use super::types::{MixAction, MixKind, DEFAULT_FERMENT_BASELINE_C, DEFAULT_FERMENT_Q10};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Mix action as submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MixActionDraft {
    #[cfg_attr(feature = "serde", serde(rename = "action", default))]
    pub kind: MixKind,
    #[cfg_attr(feature = "serde", serde(rename = "durationSec"))]
    pub duration_s: i64,
}

impl MixActionDraft {
    pub const fn new(kind: MixKind, duration_s: i64) -> Self {
        Self { kind, duration_s }
    }
}

impl From<&MixAction> for MixActionDraft {
    fn from(action: &MixAction) -> Self {
        Self::new(action.kind, action.duration_s as i64)
    }
}

/// Stage as submitted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageDraft<'a> {
    pub label: &'a str,
    pub planned_min: i64,
    pub target_temp_c: f32,
    pub fermentation: bool,
    pub mix_pattern: &'a [MixActionDraft],
    pub heater: bool,
    pub light: bool,
    pub buzzer: bool,
    pub instructions: &'a str,
}

impl<'a> StageDraft<'a> {
    /// Stage with all outputs off, no mix pattern and no instructions
    pub const fn new(label: &'a str, planned_min: i64, target_temp_c: f32) -> Self {
        Self {
            label,
            planned_min,
            target_temp_c,
            fermentation: false,
            mix_pattern: &[],
            heater: false,
            light: false,
            buzzer: false,
            instructions: "",
        }
    }
}

/// Program as submitted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgramDraft<'a> {
    pub id: i32,
    pub name: &'a str,
    pub notes: &'a str,
    pub icon: &'a str,
    pub ferment_baseline_c: f32,
    pub ferment_q10: f32,
    pub stages: &'a [StageDraft<'a>],
}

impl<'a> ProgramDraft<'a> {
    /// Program with default fermentation model and empty notes/icon
    pub const fn new(id: i32, name: &'a str, stages: &'a [StageDraft<'a>]) -> Self {
        Self {
            id,
            name,
            notes: "",
            icon: "",
            ferment_baseline_c: DEFAULT_FERMENT_BASELINE_C,
            ferment_q10: DEFAULT_FERMENT_Q10,
            stages,
        }
    }
}
