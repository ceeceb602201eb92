//! Meter readings: the per-category entries of `meters/aggregates` and the
//! detailed `meters/site` / `meters/solar` responses.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::helpers::{watts_to_kw, Precision};
use crate::schema::{Presence, Shape, ValidationMode};
use crate::types::MeterType;

pub static METER_SHAPE: Shape = Shape {
    name: "meter",
    required: &[
        "instant_power",
        "last_communication_time",
        "frequency",
        "energy_exported",
        "energy_imported",
        "instant_average_voltage",
        "instant_total_current",
    ],
    optional: &["i_a_current", "i_b_current", "i_c_current", "timeout"],
};

pub static METER_DETAILS_SHAPE: Shape = Shape {
    name: "meter details",
    required: &["location", "Cached_readings"],
    optional: &[],
};

pub static METER_DETAILS_READINGS_SHAPE: Shape = Shape {
    name: "meter details readings",
    required: &[
        "instant_power",
        "last_communication_time",
        "frequency",
        "energy_exported",
        "energy_imported",
        "instant_average_voltage",
        "instant_total_current",
    ],
    optional: &[
        "real_power_a",
        "real_power_b",
        "real_power_c",
        "i_a_current",
        "i_b_current",
        "i_c_current",
        "v_l1n",
        "v_l2n",
        "v_l3n",
        "timeout",
    ],
};

/// One meter reading, tagged with the circuit it belongs to.
///
/// Raw power figures are in watts; the `*_kw` accessors convert using the
/// precision the reading was built with (the client's configured default).
#[derive(Debug, Clone)]
pub struct MeterResponse {
    pub meter: MeterType,
    pub instant_power: f64,
    pub last_communication_time: String,
    pub frequency: f64,
    pub energy_exported: f64,
    pub energy_imported: f64,
    pub instant_average_voltage: f64,
    pub instant_total_current: f64,
    pub i_a_current: Presence<f64>,
    pub i_b_current: Presence<f64>,
    pub i_c_current: Presence<f64>,
    pub timeout: Presence<i64>,
    precision: Precision,
    raw: Value,
}

impl MeterResponse {
    pub fn from_value(meter: MeterType, raw: &Value, mode: ValidationMode) -> Result<Self> {
        Self::with_precision(meter, raw, mode, Precision::default())
    }

    pub fn with_precision(
        meter: MeterType,
        raw: &Value,
        mode: ValidationMode,
        precision: Precision,
    ) -> Result<Self> {
        let mapped = METER_SHAPE.map(raw, mode)?;
        Ok(MeterResponse {
            meter,
            instant_power: mapped.req_f64("instant_power")?,
            last_communication_time: mapped.req_string("last_communication_time")?,
            frequency: mapped.req_f64("frequency")?,
            energy_exported: mapped.req_f64("energy_exported")?,
            energy_imported: mapped.req_f64("energy_imported")?,
            instant_average_voltage: mapped.req_f64("instant_average_voltage")?,
            instant_total_current: mapped.req_f64("instant_total_current")?,
            i_a_current: mapped.opt_f64("i_a_current")?,
            i_b_current: mapped.opt_f64("i_b_current")?,
            i_c_current: mapped.opt_f64("i_c_current")?,
            timeout: mapped.opt_i64("timeout")?,
            precision,
            raw: mapped.to_value(),
        })
    }

    /// The payload this reading was extracted from.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn power_kw(&self) -> f64 {
        self.power_kw_with(self.precision)
    }

    pub fn power_kw_with(&self, precision: Precision) -> f64 {
        watts_to_kw(self.instant_power, precision)
    }

    pub fn energy_exported_kwh(&self) -> f64 {
        watts_to_kw(self.energy_exported, self.precision)
    }

    pub fn energy_imported_kwh(&self) -> f64 {
        watts_to_kw(self.energy_imported, self.precision)
    }

    pub fn is_active(&self) -> bool {
        self.power_kw() != 0.0
    }

    /// Whether power is flowing out of this circuit.
    ///
    /// The load meter is a sink; its power is non-negative by convention,
    /// so it can never be drawn from.
    pub fn is_drawing_from(&self) -> bool {
        if self.meter == MeterType::Load {
            false
        } else {
            self.power_kw() > 0.0
        }
    }

    /// Whether power is flowing into this circuit.
    pub fn is_sending_to(&self) -> bool {
        if self.meter == MeterType::Load {
            self.power_kw() > 0.0
        } else {
            self.power_kw() < 0.0
        }
    }
}

/// Detailed reading from `meters/site` or `meters/solar`, extending the
/// plain meter fields with per-phase power, current and voltage.
#[derive(Debug, Clone)]
pub struct MeterDetailsReadings {
    pub reading: MeterResponse,
    pub real_power_a: Presence<f64>,
    pub real_power_b: Presence<f64>,
    pub real_power_c: Presence<f64>,
    pub v_l1n: Presence<f64>,
    pub v_l2n: Presence<f64>,
    pub v_l3n: Presence<f64>,
}

impl MeterDetailsReadings {
    pub fn from_value(meter: MeterType, raw: &Value, mode: ValidationMode) -> Result<Self> {
        Self::with_precision(meter, raw, mode, Precision::default())
    }

    pub fn with_precision(
        meter: MeterType,
        raw: &Value,
        mode: ValidationMode,
        precision: Precision,
    ) -> Result<Self> {
        let mapped = METER_DETAILS_READINGS_SHAPE.map(raw, mode)?;
        Ok(MeterDetailsReadings {
            reading: MeterResponse {
                meter,
                instant_power: mapped.req_f64("instant_power")?,
                last_communication_time: mapped.req_string("last_communication_time")?,
                frequency: mapped.req_f64("frequency")?,
                energy_exported: mapped.req_f64("energy_exported")?,
                energy_imported: mapped.req_f64("energy_imported")?,
                instant_average_voltage: mapped.req_f64("instant_average_voltage")?,
                instant_total_current: mapped.req_f64("instant_total_current")?,
                i_a_current: mapped.opt_f64("i_a_current")?,
                i_b_current: mapped.opt_f64("i_b_current")?,
                i_c_current: mapped.opt_f64("i_c_current")?,
                timeout: mapped.opt_i64("timeout")?,
                precision,
                raw: mapped.to_value(),
            },
            real_power_a: mapped.opt_f64("real_power_a")?,
            real_power_b: mapped.opt_f64("real_power_b")?,
            real_power_c: mapped.opt_f64("real_power_c")?,
            v_l1n: mapped.opt_f64("v_l1n")?,
            v_l2n: mapped.opt_f64("v_l2n")?,
            v_l3n: mapped.opt_f64("v_l3n")?,
        })
    }
}

/// Response of `meters/site` and `meters/solar`: the meter's location plus
/// its cached readings as a nested meter shape.
#[derive(Debug, Clone)]
pub struct MeterDetailsResponse {
    pub location: MeterType,
    pub readings: MeterDetailsReadings,
    raw: Value,
}

impl MeterDetailsResponse {
    pub fn from_value(raw: &Value, mode: ValidationMode) -> Result<Self> {
        Self::with_precision(raw, mode, Precision::default())
    }

    pub fn with_precision(raw: &Value, mode: ValidationMode, precision: Precision) -> Result<Self> {
        let mapped = METER_DETAILS_SHAPE.map(raw, mode)?;
        let location_str = mapped.req_str("location")?;
        let location = MeterType::try_from(location_str)
            .map_err(|e| mapped.derivation_error("location", e.to_string()))?;
        let readings = MeterDetailsReadings::with_precision(
            location,
            mapped.required("Cached_readings")?,
            mode,
            precision,
        )?;
        Ok(MeterDetailsResponse {
            location,
            readings,
            raw: mapped.to_value(),
        })
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// Keyed collection of meter readings from `meters/aggregates`.
///
/// A device only reports the categories that exist at the installation, so
/// lookups distinguish "not reported here" from programming errors: `meter`
/// fails with [`Error::MeterNotAvailable`] naming the categories that are
/// present, while `get_meter` just returns `None`.
#[derive(Debug, Clone)]
pub struct MetersAggregatesResponse {
    meters: HashMap<MeterType, MeterResponse>,
    raw: Value,
}

impl MetersAggregatesResponse {
    pub fn from_value(raw: &Value, mode: ValidationMode) -> Result<Self> {
        Self::with_precision(raw, mode, Precision::default())
    }

    pub fn with_precision(raw: &Value, mode: ValidationMode, precision: Precision) -> Result<Self> {
        let obj = raw.as_object().ok_or_else(|| {
            Error::Api(format!(
                "expected a JSON object for 'meters aggregate', got {}",
                raw
            ))
        })?;

        let mut meters = HashMap::new();
        for (key, value) in obj {
            let meter = match MeterType::try_from(key.as_str()) {
                Ok(meter) => meter,
                Err(_) => {
                    // New categories show up with firmware updates; they are
                    // drift diagnostics, not failures.
                    log::debug!("ignoring unknown meter category '{key}' in aggregate");
                    continue;
                }
            };
            match MeterResponse::with_precision(meter, value, mode, precision) {
                Ok(reading) => {
                    meters.insert(meter, reading);
                }
                Err(e) if mode == ValidationMode::Lenient => {
                    log::warn!("dropping malformed '{meter}' meter from aggregate: {e}");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(MetersAggregatesResponse {
            meters,
            raw: raw.clone(),
        })
    }

    pub fn meters(&self) -> &HashMap<MeterType, MeterResponse> {
        &self.meters
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Categories reported by this installation, in declaration order.
    pub fn available_meters(&self) -> Vec<MeterType> {
        MeterType::ALL
            .iter()
            .copied()
            .filter(|m| self.meters.contains_key(m))
            .collect()
    }

    pub fn get_meter(&self, meter: MeterType) -> Option<&MeterResponse> {
        self.meters.get(&meter)
    }

    pub fn meter(&self, meter: MeterType) -> Result<&MeterResponse> {
        self.meters.get(&meter).ok_or_else(|| Error::MeterNotAvailable {
            meter,
            available: self.available_meters(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meter_json(power: f64) -> Value {
        json!({
            "instant_power": power,
            "last_communication_time": "2023-03-06T12:00:00+01:00",
            "frequency": 50.0,
            "energy_exported": 10_429_451.0,
            "energy_imported": 4_824_170.0,
            "instant_average_voltage": 232.1,
            "instant_total_current": 14.2,
        })
    }

    fn reading(meter: MeterType, power: f64) -> MeterResponse {
        MeterResponse::from_value(meter, &meter_json(power), ValidationMode::Strict).unwrap()
    }

    #[test]
    fn power_kw_converts_and_rounds() {
        let m = reading(MeterType::Solar, 1_750.0);
        assert_eq!(m.power_kw(), 1.8);
        assert_eq!(m.power_kw_with(Precision::Round(2)), 1.75);
        assert_eq!(m.power_kw_with(Precision::Exact), 1.75);
    }

    #[test]
    fn load_meter_is_never_drawn_from() {
        for power in [-500.0, 0.0, 1_200.0] {
            let load = reading(MeterType::Load, power);
            assert!(!load.is_drawing_from());
            assert_eq!(load.is_sending_to(), power > 0.0);
        }
    }

    #[test]
    fn non_load_meters_have_exclusive_flow_direction() {
        for meter in [MeterType::Solar, MeterType::Site, MeterType::Battery] {
            let exporting = reading(meter, 2_000.0);
            assert!(exporting.is_drawing_from());
            assert!(!exporting.is_sending_to());

            let importing = reading(meter, -2_000.0);
            assert!(!importing.is_drawing_from());
            assert!(importing.is_sending_to());

            let idle = reading(meter, 0.0);
            assert!(!idle.is_drawing_from());
            assert!(!idle.is_sending_to());
            assert!(!idle.is_active());
        }
    }

    #[test]
    fn rounding_decides_activity() {
        // 0.4 W rounds to 0.0 kW at the default precision.
        let m = reading(MeterType::Site, 0.4);
        assert!(!m.is_active());
        assert!(
            MeterResponse::with_precision(
                MeterType::Site,
                &meter_json(0.4),
                ValidationMode::Strict,
                Precision::Exact,
            )
            .unwrap()
            .is_active()
        );
    }

    #[test]
    fn aggregate_lookup_reports_available_categories() {
        let raw = json!({
            "site": meter_json(-200.0),
            "battery": meter_json(0.0),
            "load": meter_json(900.0),
            "solar": meter_json(1_500.0),
        });
        let meters = MetersAggregatesResponse::from_value(&raw, ValidationMode::Strict).unwrap();
        assert!(meters.get_meter(MeterType::Generator).is_none());
        match meters.meter(MeterType::Generator).unwrap_err() {
            Error::MeterNotAvailable { meter, available } => {
                assert_eq!(meter, MeterType::Generator);
                assert_eq!(
                    available,
                    vec![
                        MeterType::Solar,
                        MeterType::Site,
                        MeterType::Battery,
                        MeterType::Load
                    ]
                );
            }
            other => panic!("expected MeterNotAvailable, got {other:?}"),
        }
    }

    #[test]
    fn aggregate_ignores_unknown_categories() {
        let raw = json!({
            "load": meter_json(900.0),
            "frequency_watcher": {"instant_power": 1.0},
        });
        let meters = MetersAggregatesResponse::from_value(&raw, ValidationMode::Strict).unwrap();
        assert_eq!(meters.available_meters(), vec![MeterType::Load]);
    }

    #[test]
    fn strict_aggregate_fails_on_malformed_meter() {
        let raw = json!({"load": {"instant_power": 900.0}});
        assert!(MetersAggregatesResponse::from_value(&raw, ValidationMode::Strict).is_err());
    }

    #[test]
    fn lenient_aggregate_drops_malformed_meter() {
        let raw = json!({
            "load": {"instant_power": 900.0},
            "site": meter_json(-100.0),
        });
        let meters = MetersAggregatesResponse::from_value(&raw, ValidationMode::Lenient).unwrap();
        assert_eq!(meters.available_meters(), vec![MeterType::Site]);
    }

    #[test]
    fn meter_details_uses_nested_readings() {
        let raw = json!({
            "location": "site",
            "Cached_readings": {
                "instant_power": -18.00000076368451,
                "last_communication_time": "2023-03-06T12:00:00+01:00",
                "frequency": 49.99,
                "energy_exported": 10_429_451.0,
                "energy_imported": 4_824_170.0,
                "instant_average_voltage": 232.1,
                "instant_total_current": 14.2,
                "v_l1n": 230.1,
                "v_l2n": 231.9,
                "real_power_a": -9.0,
            },
        });
        let details = MeterDetailsResponse::from_value(&raw, ValidationMode::Strict).unwrap();
        assert_eq!(details.location, MeterType::Site);
        assert_eq!(details.readings.reading.instant_power, -18.00000076368451);
        assert_eq!(details.readings.v_l1n, Presence::Value(230.1));
        assert_eq!(details.readings.v_l3n, Presence::Absent);
        assert_eq!(details.readings.real_power_a, Presence::Value(-9.0));
        // -18 W rounds to -0.0 kW
        assert_eq!(details.readings.reading.power_kw(), 0.0);
    }

    #[test]
    fn unknown_location_is_a_derivation_error() {
        let raw = json!({"location": "windmill", "Cached_readings": meter_json(1.0)});
        match MeterDetailsResponse::from_value(&raw, ValidationMode::Strict).unwrap_err() {
            Error::Derivation { field, .. } => assert_eq!(field, "location"),
            other => panic!("expected Derivation, got {other:?}"),
        }
    }
}
