//! `/status` response
//!
//! The first eight fields are the stable contract polled by clients;
//! names are exact and case-sensitive. The rest are extended diagnostics.
//!
//! `temp` is always a number: the last good reading, or 0 before the
//! first one. `sensorDegraded` says whether it can be trusted.

use alloc::string::String;

use levain_core::catalog::MAX_STAGES;
use levain_core::status::StatusSnapshot;
use serde::Serialize;

/// Status response body, borrowed from a snapshot
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord<'a> {
    pub running: bool,
    pub stage: &'a str,
    pub stage_start_times: [u64; MAX_STAGES],
    pub stage_ready_at: u64,
    pub program_ready_at: u64,
    pub program: &'a str,
    pub temp: f32,
    pub set_temp: f32,

    #[serde(rename = "stageIdx")]
    pub stage_index: Option<usize>,
    pub program_id: Option<i32>,
    #[serde(rename = "selectedIdx")]
    pub selected_index: Option<usize>,
    #[serde(rename = "mixIdx")]
    pub mix_index: Option<usize>,
    pub mix_action: Option<&'static str>,
    pub heater: bool,
    pub motor: bool,
    pub light: bool,
    pub buzzer: bool,
    pub fermentation_factor: f32,
    pub sensor_degraded: bool,
    pub duration_clamped: bool,
    pub catalog_changed: bool,
    /// Armed start time (epoch s), 0 when none
    pub scheduled_start: u64,
    pub scheduled_start_stage: Option<usize>,
    pub time_left: u64,
    pub adjusted_time_left: u64,
    pub elapsed_time: u64,
    pub remaining_time: u64,
}

impl<'a> From<&'a StatusSnapshot> for StatusRecord<'a> {
    fn from(s: &'a StatusSnapshot) -> Self {
        Self {
            running: s.running,
            stage: &s.stage,
            stage_start_times: s.stage_start_times,
            stage_ready_at: s.stage_ready_at,
            program_ready_at: s.program_ready_at,
            program: &s.program,
            temp: s.temp.unwrap_or(0.0),
            set_temp: s.set_temp,
            stage_index: s.stage_index,
            program_id: s.program_id,
            selected_index: s.selected,
            mix_index: s.mix.index,
            mix_action: s.mix.action.map(|kind| kind.as_str()),
            heater: s.outputs.heater,
            motor: s.outputs.motor,
            light: s.outputs.light,
            buzzer: s.outputs.buzzer,
            fermentation_factor: s.fermentation_factor,
            sensor_degraded: s.sensor_degraded,
            duration_clamped: s.duration_clamped,
            catalog_changed: s.catalog_changed,
            scheduled_start: s.scheduled.map_or(0, |armed| armed.at),
            scheduled_start_stage: s.scheduled.map(|armed| armed.stage),
            time_left: s.time_left_s,
            adjusted_time_left: s.adjusted_time_left_s,
            elapsed_time: s.elapsed_s,
            remaining_time: s.remaining_s,
        }
    }
}

/// Serialize a snapshot as the `/status` body
pub fn status_json(snapshot: &StatusSnapshot) -> Result<String, crate::WireError> {
    serde_json::to_string(&StatusRecord::from(snapshot)).map_err(|_| crate::WireError::Encode)
}
