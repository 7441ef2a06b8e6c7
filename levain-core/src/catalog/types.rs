//! Program catalog type definitions
//!
//! A program is an ordered list of stages. Each stage carries its planned
//! duration, target temperature, static output settings and a mix pattern.
//! All strings and sequences are fixed-capacity so a loaded catalog never
//! allocates.

use heapless::{String, Vec};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum stages per program (also the size of the stage timing record)
pub const MAX_STAGES: usize = 8;

/// Maximum programs held by the catalog
pub const MAX_PROGRAMS: usize = 16;

/// Maximum mix actions per stage
pub const MAX_MIX_ACTIONS: usize = 16;

/// Maximum program name length (bytes)
pub const MAX_NAME_LEN: usize = 31;

/// Maximum stage label length (bytes)
pub const MAX_LABEL_LEN: usize = 31;

/// Maximum stage instructions length (bytes)
pub const MAX_INSTRUCTIONS_LEN: usize = 63;

/// Maximum program notes length (bytes)
pub const MAX_NOTES_LEN: usize = 255;

/// Maximum icon identifier length (bytes)
pub const MAX_ICON_LEN: usize = 31;

/// Reference temperature a program's durations were authored against (°C)
pub const DEFAULT_FERMENT_BASELINE_C: f32 = 20.0;

/// Fermentation rate multiplier per 10°C
pub const DEFAULT_FERMENT_Q10: f32 = 2.0;

/// Mix pattern action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MixKind {
    /// Motor rests
    #[default]
    Wait,
    /// Motor kneads
    Mix,
}

impl MixKind {
    /// Wire/display name
    pub const fn as_str(&self) -> &'static str {
        match self {
            MixKind::Wait => "wait",
            MixKind::Mix => "mix",
        }
    }
}

/// A single step of a stage's mix pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MixAction {
    /// What the motor does during this step
    pub kind: MixKind,
    /// Step duration in seconds
    pub duration_s: u32,
}

/// One phase of a baking program
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Stage {
    /// Display label (also reported as the status `stage`)
    pub label: String<MAX_LABEL_LEN>,
    /// Planned duration in minutes, at the program's baseline temperature
    pub planned_min: u32,
    /// Target temperature (°C), reported as `setTemp`
    pub target_temp_c: f32,
    /// Stage duration follows the fermentation model
    pub fermentation: bool,
    /// Ordered mix pattern, played from the start of the stage
    pub mix_pattern: Vec<MixAction, MAX_MIX_ACTIONS>,
    /// Heater requested during this stage
    pub heater: bool,
    /// Light requested during this stage
    pub light: bool,
    /// Buzzer requested during this stage
    pub buzzer: bool,
    /// Instructions shown to the user
    pub instructions: String<MAX_INSTRUCTIONS_LEN>,
}

impl Stage {
    /// Planned duration in seconds
    pub fn planned_s(&self) -> u64 {
        self.planned_min as u64 * 60
    }

    /// Total length of one pass through the mix pattern (seconds)
    pub fn mix_pattern_s(&self) -> u64 {
        self.mix_pattern.iter().map(|a| a.duration_s as u64).sum()
    }
}

/// A baking program
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Program {
    /// Unique program identifier
    pub id: i32,
    /// Display name
    pub name: String<MAX_NAME_LEN>,
    /// Free-form notes
    pub notes: String<MAX_NOTES_LEN>,
    /// Optional icon identifier (may be empty)
    pub icon: String<MAX_ICON_LEN>,
    /// Temperature the planned durations were authored against (°C)
    pub ferment_baseline_c: f32,
    /// Fermentation rate multiplier per 10°C
    pub ferment_q10: f32,
    /// Stages in execution order
    pub stages: Vec<Stage, MAX_STAGES>,
}

impl Default for Program {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            notes: String::new(),
            icon: String::new(),
            ferment_baseline_c: DEFAULT_FERMENT_BASELINE_C,
            ferment_q10: DEFAULT_FERMENT_Q10,
            stages: Vec::new(),
        }
    }
}

impl Program {
    /// Get a stage by index
    pub fn stage(&self, index: usize) -> Option<&Stage> {
        self.stages.get(index)
    }

    /// Number of stages
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Total planned duration (seconds), ignoring compensation
    pub fn planned_s(&self) -> u64 {
        self.stages.iter().map(Stage::planned_s).sum()
    }
}
