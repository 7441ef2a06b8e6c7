//! Program catalog records
//!
//! The `/api/programs` body is a JSON array of program records:
//!
//! ```json
//! [{
//!   "id": 1, "name": "Country", "notes": "", "icon": "",
//!   "fermentBaselineTemp": 20.0, "fermentQ10": 2.0,
//!   "customStages": [{
//!     "label": "Knead", "min": 15, "temp": 25.0, "isFermentation": false,
//!     "mixPattern": [{"action": "mix", "durationSec": 60}],
//!     "heater": "off", "light": "on", "buzzer": "off",
//!     "instructions": "Add salt"
//!   }]
//! }]
//! ```
//!
//! Records are deliberately loose (owned strings, signed durations) so
//! that every limit is checked by catalog validation, not by the decoder.

use alloc::string::String;
use alloc::vec::Vec;

use levain_core::catalog::{
    MixActionDraft, Program, ProgramDraft, Stage, StageDraft, DEFAULT_FERMENT_BASELINE_C,
    DEFAULT_FERMENT_Q10,
};
use serde::{Deserialize, Serialize};

/// On/off output setting as written in records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Switch {
    On,
    #[default]
    Off,
}

impl Switch {
    pub const fn is_on(self) -> bool {
        matches!(self, Switch::On)
    }
}

impl From<bool> for Switch {
    fn from(on: bool) -> Self {
        if on {
            Switch::On
        } else {
            Switch::Off
        }
    }
}

fn default_baseline() -> f32 {
    DEFAULT_FERMENT_BASELINE_C
}

fn default_q10() -> f32 {
    DEFAULT_FERMENT_Q10
}

/// One stage of a program record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRecord {
    pub label: String,
    /// Planned duration (minutes)
    #[serde(rename = "min")]
    pub planned_min: i64,
    /// Target temperature (°C)
    #[serde(rename = "temp")]
    pub target_temp: f32,
    #[serde(default)]
    pub is_fermentation: bool,
    #[serde(default)]
    pub mix_pattern: Vec<MixActionDraft>,
    #[serde(default)]
    pub heater: Switch,
    #[serde(default)]
    pub light: Switch,
    #[serde(default)]
    pub buzzer: Switch,
    #[serde(default)]
    pub instructions: String,
}

impl StageRecord {
    pub fn draft(&self) -> StageDraft<'_> {
        StageDraft {
            label: &self.label,
            planned_min: self.planned_min,
            target_temp_c: self.target_temp,
            fermentation: self.is_fermentation,
            mix_pattern: &self.mix_pattern,
            heater: self.heater.is_on(),
            light: self.light.is_on(),
            buzzer: self.buzzer.is_on(),
            instructions: &self.instructions,
        }
    }
}

impl From<&Stage> for StageRecord {
    fn from(stage: &Stage) -> Self {
        Self {
            label: stage.label.as_str().into(),
            planned_min: stage.planned_min.into(),
            target_temp: stage.target_temp_c,
            is_fermentation: stage.fermentation,
            mix_pattern: stage.mix_pattern.iter().map(MixActionDraft::from).collect(),
            heater: stage.heater.into(),
            light: stage.light.into(),
            buzzer: stage.buzzer.into(),
            instructions: stage.instructions.as_str().into(),
        }
    }
}

/// A program record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramRecord {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default = "default_baseline")]
    pub ferment_baseline_temp: f32,
    #[serde(default = "default_q10")]
    pub ferment_q10: f32,
    #[serde(rename = "customStages", default)]
    pub stages: Vec<StageRecord>,
}

impl ProgramRecord {
    /// Draft over this record, with `stages` drafted from `self.stages`
    pub fn draft<'a>(&'a self, stages: &'a [StageDraft<'a>]) -> ProgramDraft<'a> {
        ProgramDraft {
            id: self.id,
            name: &self.name,
            notes: &self.notes,
            icon: &self.icon,
            ferment_baseline_c: self.ferment_baseline_temp,
            ferment_q10: self.ferment_q10,
            stages,
        }
    }
}

impl From<&Program> for ProgramRecord {
    fn from(program: &Program) -> Self {
        Self {
            id: program.id,
            name: program.name.as_str().into(),
            notes: program.notes.as_str().into(),
            icon: program.icon.as_str().into(),
            ferment_baseline_temp: program.ferment_baseline_c,
            ferment_q10: program.ferment_q10,
            stages: program.stages.iter().map(StageRecord::from).collect(),
        }
    }
}

/// Borrow a set of records as catalog drafts
pub fn with_drafts<R>(records: &[ProgramRecord], f: impl FnOnce(&[ProgramDraft<'_>]) -> R) -> R {
    let stages: Vec<Vec<StageDraft<'_>>> = records
        .iter()
        .map(|p| p.stages.iter().map(StageRecord::draft).collect())
        .collect();
    let drafts: Vec<ProgramDraft<'_>> = records
        .iter()
        .zip(&stages)
        .map(|(p, s)| p.draft(s))
        .collect();
    f(&drafts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use levain_core::catalog::MixKind;

    const STAGE: &str = r#"{
        "label": "Knead", "min": 15, "temp": 25.5,
        "mixPattern": [{"action": "mix", "durationSec": 60}, {"action": "wait", "durationSec": 30}],
        "heater": "off", "light": "on", "buzzer": "off",
        "instructions": "Add salt"
    }"#;

    #[test]
    fn test_stage_fields() {
        let stage: StageRecord = serde_json::from_str(STAGE).unwrap();
        assert_eq!(stage.label, "Knead");
        assert_eq!(stage.planned_min, 15);
        assert_eq!(stage.target_temp, 25.5);
        assert!(!stage.is_fermentation);
        assert_eq!(
            stage.mix_pattern,
            [
                MixActionDraft::new(MixKind::Mix, 60),
                MixActionDraft::new(MixKind::Wait, 30)
            ]
        );
        assert_eq!(stage.light, Switch::On);
        assert_eq!(stage.heater, Switch::Off);
    }

    #[test]
    fn test_program_defaults() {
        let json = r#"{"id": 3, "name": "Quick", "customStages": []}"#;
        let program: ProgramRecord = serde_json::from_str(json).unwrap();
        assert_eq!(program.ferment_baseline_temp, 20.0);
        assert_eq!(program.ferment_q10, 2.0);
        assert_eq!(program.notes, "");
        assert!(program.stages.is_empty());
    }

    #[test]
    fn test_camel_case_names() {
        let json = r#"{"id": 1, "name": "Rye", "fermentBaselineTemp": 24.0, "fermentQ10": 3.0,
            "customStages": [{"label": "Proof", "min": 60, "temp": 28.0, "isFermentation": true}]}"#;
        let program: ProgramRecord = serde_json::from_str(json).unwrap();
        assert_eq!(program.ferment_baseline_temp, 24.0);
        assert_eq!(program.ferment_q10, 3.0);
        assert!(program.stages[0].is_fermentation);

        let value = serde_json::to_value(&program).unwrap();
        assert!(value.get("customStages").is_some());
        assert!(value.get("fermentQ10").is_some());
        assert!(value["customStages"][0].get("isFermentation").is_some());
        assert_eq!(value["customStages"][0]["heater"], "off");
    }

    #[test]
    fn test_unknown_action_rejected() {
        let json = r#"{"label": "Mix", "min": 1, "temp": 25.0,
            "mixPattern": [{"action": "spin", "durationSec": 10}]}"#;
        assert!(serde_json::from_str::<StageRecord>(json).is_err());
    }

    #[test]
    fn test_drafts_borrow_records() {
        let stage: StageRecord = serde_json::from_str(STAGE).unwrap();
        let record = ProgramRecord {
            id: 7,
            name: "Country".into(),
            notes: String::new(),
            icon: String::new(),
            ferment_baseline_temp: 20.0,
            ferment_q10: 2.0,
            stages: alloc::vec![stage],
        };

        with_drafts(core::slice::from_ref(&record), |drafts| {
            assert_eq!(drafts.len(), 1);
            assert_eq!(drafts[0].id, 7);
            assert_eq!(drafts[0].stages[0].label, "Knead");
            assert!(drafts[0].stages[0].light);
            assert_eq!(drafts[0].stages[0].mix_pattern.len(), 2);
        });
    }
}
