//! Small system-level endpoints: charge state, grid status, operation
//! settings, installed powerwalls, solar inverters and system status.

use serde_json::Value;

use crate::error::Result;
use crate::helpers::{round_to, Precision};
use crate::responses::battery::BatteryResponse;
use crate::schema::{Presence, Shape, ValidationMode};
use crate::types::{GridStatus, OperationMode};

pub static SOE_SHAPE: Shape = Shape {
    name: "charge state",
    required: &["percentage"],
    optional: &[],
};

pub static GRID_STATUS_SHAPE: Shape = Shape {
    name: "grid status",
    required: &["grid_status", "grid_services_active"],
    optional: &[],
};

pub static OPERATION_SHAPE: Shape = Shape {
    name: "operation",
    required: &["real_mode", "backup_reserve_percent"],
    optional: &[],
};

pub static SYSTEM_STATUS_SHAPE: Shape = Shape {
    name: "system status",
    required: &[
        "nominal_full_pack_energy",
        "nominal_energy_remaining",
        "battery_blocks",
    ],
    optional: &[],
};

pub static POWERWALLS_SHAPE: Shape = Shape {
    name: "powerwalls",
    required: &["powerwalls"],
    optional: &["gateway_din"],
};

pub static SOLAR_SHAPE: Shape = Shape {
    name: "solar",
    required: &["brand", "model", "power_rating_watts"],
    optional: &[],
};

/// Battery state of charge from `system_status/soe`.
#[derive(Debug, Clone)]
pub struct SoeResponse {
    pub percentage: f64,
    raw: Value,
}

impl SoeResponse {
    pub fn from_value(raw: &Value, mode: ValidationMode) -> Result<Self> {
        let mapped = SOE_SHAPE.map(raw, mode)?;
        Ok(SoeResponse {
            percentage: mapped.req_f64("percentage")?,
            raw: mapped.to_value(),
        })
    }

    pub fn rounded(&self, precision: Precision) -> f64 {
        round_to(self.percentage, precision)
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

#[derive(Debug, Clone)]
pub struct GridStatusResponse {
    pub grid_status: GridStatus,
    pub grid_services_active: bool,
    raw: Value,
}

impl GridStatusResponse {
    pub fn from_value(raw: &Value, mode: ValidationMode) -> Result<Self> {
        let mapped = GRID_STATUS_SHAPE.map(raw, mode)?;
        let status_str = mapped.req_str("grid_status")?;
        let grid_status = GridStatus::try_from(status_str)
            .map_err(|e| mapped.derivation_error("grid_status", e.to_string()))?;
        Ok(GridStatusResponse {
            grid_status,
            grid_services_active: mapped.req_bool("grid_services_active")?,
            raw: mapped.to_value(),
        })
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

#[derive(Debug, Clone)]
pub struct OperationResponse {
    pub mode: OperationMode,
    pub backup_reserve_percent: f64,
    raw: Value,
}

impl OperationResponse {
    pub fn from_value(raw: &Value, mode: ValidationMode) -> Result<Self> {
        let mapped = OPERATION_SHAPE.map(raw, mode)?;
        let mode_str = mapped.req_str("real_mode")?;
        let operation_mode = OperationMode::try_from(mode_str)
            .map_err(|e| mapped.derivation_error("real_mode", e.to_string()))?;
        Ok(OperationResponse {
            mode: operation_mode,
            backup_reserve_percent: mapped.req_f64("backup_reserve_percent")?,
            raw: mapped.to_value(),
        })
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// Aggregate pack figures plus the individual battery blocks.
#[derive(Debug, Clone)]
pub struct SystemStatusResponse {
    /// Renamed from `nominal_full_pack_energy`.
    pub capacity: f64,
    /// Renamed from `nominal_energy_remaining`.
    pub energy_remaining: f64,
    pub batteries: Vec<BatteryResponse>,
    raw: Value,
}

impl SystemStatusResponse {
    pub fn from_value(raw: &Value, mode: ValidationMode) -> Result<Self> {
        let mapped = SYSTEM_STATUS_SHAPE.map(raw, mode)?;
        let batteries = mapped
            .req_array("battery_blocks")?
            .iter()
            .map(|block| BatteryResponse::from_value(block, mode))
            .collect::<Result<Vec<_>>>()?;
        Ok(SystemStatusResponse {
            capacity: mapped.req_f64("nominal_full_pack_energy")?,
            energy_remaining: mapped.req_f64("nominal_energy_remaining")?,
            batteries,
            raw: mapped.to_value(),
        })
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// Installed powerwall units and the gateway identity.
#[derive(Debug, Clone)]
pub struct PowerwallsResponse {
    pub serial_numbers: Vec<String>,
    pub gateway_din: Presence<String>,
    raw: Value,
}

impl PowerwallsResponse {
    pub fn from_value(raw: &Value, mode: ValidationMode) -> Result<Self> {
        let mapped = POWERWALLS_SHAPE.map(raw, mode)?;
        let serial_numbers = mapped
            .req_array("powerwalls")?
            .iter()
            .map(|unit| {
                unit.get("PackageSerialNumber")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        mapped.derivation_error(
                            "powerwalls",
                            "entry without a PackageSerialNumber",
                        )
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(PowerwallsResponse {
            serial_numbers,
            gateway_din: mapped.opt_string("gateway_din")?,
            raw: mapped.to_value(),
        })
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// One attached solar inverter, from the `solars` endpoint.
#[derive(Debug, Clone)]
pub struct SolarResponse {
    pub brand: String,
    pub model: String,
    pub power_rating_watts: i64,
    raw: Value,
}

impl SolarResponse {
    pub fn from_value(raw: &Value, mode: ValidationMode) -> Result<Self> {
        let mapped = SOLAR_SHAPE.map(raw, mode)?;
        Ok(SolarResponse {
            brand: mapped.req_string("brand")?,
            model: mapped.req_string("model")?,
            power_rating_watts: mapped.req_i64("power_rating_watts")?,
            raw: mapped.to_value(),
        })
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}
