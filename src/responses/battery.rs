//! Battery block entries from the `system_status` endpoint.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::schema::{Presence, Shape, ValidationMode};
use crate::types::GridState;

pub static BATTERY_SHAPE: Shape = Shape {
    name: "battery block",
    required: &[
        "PackagePartNumber",
        "PackageSerialNumber",
        "energy_charged",
        "energy_discharged",
        "nominal_energy_remaining",
        "nominal_full_pack_energy",
        "wobble_detected",
    ],
    optional: &[
        "p_out",
        "q_out",
        "v_out",
        "f_out",
        "i_out",
        "pinv_grid_state",
        "disabled_reasons",
    ],
};

/// One physical battery pack.
///
/// The energy counters are declared required but disabled packs report them
/// as `null`, so they decode to `Option`.
#[derive(Debug, Clone)]
pub struct BatteryResponse {
    pub part_number: String,
    pub serial_number: String,
    pub energy_charged: Option<i64>,
    pub energy_discharged: Option<i64>,
    /// Renamed from `nominal_energy_remaining`.
    pub energy_remaining: Option<i64>,
    /// Renamed from `nominal_full_pack_energy`.
    pub capacity: Option<i64>,
    pub wobble_detected: bool,
    pub p_out: Presence<i64>,
    pub q_out: Presence<i64>,
    pub v_out: Presence<f64>,
    pub f_out: Presence<f64>,
    pub i_out: Presence<f64>,
    pub grid_state: Presence<GridState>,
    pub disabled_reasons: Vec<String>,
    raw: Value,
}

impl BatteryResponse {
    pub fn from_value(raw: &Value, mode: ValidationMode) -> Result<Self> {
        let mapped = BATTERY_SHAPE.map(raw, mode)?;

        let grid_state = match mapped.optional("pinv_grid_state") {
            Presence::Absent => Presence::Absent,
            Presence::Null => Presence::Null,
            Presence::Value(value) => {
                let state_str = value.as_str().ok_or_else(|| {
                    mapped.derivation_error("pinv_grid_state", "expected a string")
                })?;
                Presence::Value(
                    GridState::try_from(state_str)
                        .map_err(|e| mapped.derivation_error("pinv_grid_state", e.to_string()))?,
                )
            }
        };

        let disabled_reasons = match mapped.optional("disabled_reasons") {
            Presence::Value(value) => parse_reasons(value)
                .ok_or_else(|| {
                    mapped.derivation_error("disabled_reasons", "expected an array of strings")
                })?,
            _ => Vec::new(),
        };

        Ok(BatteryResponse {
            part_number: mapped.req_string("PackagePartNumber")?,
            serial_number: mapped.req_string("PackageSerialNumber")?,
            energy_charged: mapped.req_nullable_i64("energy_charged")?,
            energy_discharged: mapped.req_nullable_i64("energy_discharged")?,
            energy_remaining: mapped.req_nullable_i64("nominal_energy_remaining")?,
            capacity: mapped.req_nullable_i64("nominal_full_pack_energy")?,
            wobble_detected: mapped.req_bool("wobble_detected")?,
            p_out: mapped.opt_i64("p_out")?,
            q_out: mapped.opt_i64("q_out")?,
            v_out: mapped.opt_f64("v_out")?,
            f_out: mapped.opt_f64("f_out")?,
            i_out: mapped.opt_f64("i_out")?,
            grid_state,
            disabled_reasons,
            raw: mapped.to_value(),
        })
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

fn parse_reasons(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}
