//! The `site_info` and `sitemaster` endpoints.

use serde_json::Value;

use crate::error::Result;
use crate::schema::{Presence, Shape, ValidationMode};

pub static SITE_INFO_SHAPE: Shape = Shape {
    name: "site info",
    required: &[
        "nominal_system_energy_kWh",
        "nominal_system_power_kW",
        "site_name",
        "timezone",
        "grid_code",
        "grid_voltage_setting",
        "grid_freq_setting",
        "grid_phase_setting",
        "country",
        "state",
    ],
    optional: &["distributor", "utility", "retailer", "region"],
};

pub static SITE_MASTER_SHAPE: Shape = Shape {
    name: "sitemaster",
    required: &["status", "running", "connected_to_tesla", "power_supply_mode"],
    optional: &[],
};

/// Static information about the installation site.
#[derive(Debug, Clone)]
pub struct SiteInfoResponse {
    pub nominal_system_energy_kwh: f64,
    pub nominal_system_power_kw: f64,
    pub site_name: String,
    pub timezone: String,
    pub grid_code: String,
    pub grid_voltage_setting: f64,
    pub grid_freq_setting: f64,
    pub grid_phase_setting: String,
    pub country: String,
    pub state: String,
    pub distributor: Presence<String>,
    pub utility: Presence<String>,
    pub retailer: Presence<String>,
    pub region: Presence<String>,
    raw: Value,
}

impl SiteInfoResponse {
    pub fn from_value(raw: &Value, mode: ValidationMode) -> Result<Self> {
        let mapped = SITE_INFO_SHAPE.map(raw, mode)?;
        Ok(SiteInfoResponse {
            nominal_system_energy_kwh: mapped.req_f64("nominal_system_energy_kWh")?,
            nominal_system_power_kw: mapped.req_f64("nominal_system_power_kW")?,
            site_name: mapped.req_string("site_name")?,
            timezone: mapped.req_string("timezone")?,
            grid_code: mapped.req_string("grid_code")?,
            grid_voltage_setting: mapped.req_f64("grid_voltage_setting")?,
            grid_freq_setting: mapped.req_f64("grid_freq_setting")?,
            grid_phase_setting: mapped.req_string("grid_phase_setting")?,
            country: mapped.req_string("country")?,
            state: mapped.req_string("state")?,
            distributor: mapped.opt_string("distributor")?,
            utility: mapped.opt_string("utility")?,
            retailer: mapped.opt_string("retailer")?,
            region: mapped.opt_string("region")?,
            raw: mapped.to_value(),
        })
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// Running state of the sitemaster process on the gateway.
#[derive(Debug, Clone)]
pub struct SiteMasterResponse {
    pub status: String,
    pub is_running: bool,
    pub is_connected_to_tesla: bool,
    pub is_power_supply_mode: bool,
    raw: Value,
}

impl SiteMasterResponse {
    pub fn from_value(raw: &Value, mode: ValidationMode) -> Result<Self> {
        let mapped = SITE_MASTER_SHAPE.map(raw, mode)?;
        Ok(SiteMasterResponse {
            status: mapped.req_string("status")?,
            is_running: mapped.req_bool("running")?,
            is_connected_to_tesla: mapped.req_bool("connected_to_tesla")?,
            is_power_supply_mode: mapped.req_bool("power_supply_mode")?,
            raw: mapped.to_value(),
        })
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_site_info() {
        let raw = json!({
            "max_site_meter_power_kW": 1000000000,
            "min_site_meter_power_kW": -1000000000,
            "nominal_system_energy_kWh": 27.0,
            "nominal_system_power_kW": 10.8,
            "max_system_energy_kWh": 0,
            "max_system_power_kW": 0,
            "site_name": "test",
            "timezone": "Europe/Berlin",
            "grid_code": "50Hz_230V_1_VDE4105:2018_Germany",
            "grid_voltage_setting": 230.0,
            "grid_freq_setting": 50.0,
            "grid_phase_setting": "Single",
            "country": "Germany",
            "state": "*",
            "utility": "*",
            "retailer": "*",
            "region": "VDE4105",
        });
        let info = SiteInfoResponse::from_value(&raw, ValidationMode::Strict).unwrap();
        assert_eq!(info.nominal_system_energy_kwh, 27.0);
        assert_eq!(info.site_name, "test");
        assert_eq!(info.timezone, "Europe/Berlin");
        assert_eq!(info.region, Presence::Value("VDE4105".to_string()));
        assert_eq!(info.distributor, Presence::Absent);
    }

    #[test]
    fn parses_sitemaster() {
        let raw = json!({
            "status": "StatusUp",
            "running": true,
            "connected_to_tesla": true,
            "power_supply_mode": false,
            "can_reboot": "Yes",
        });
        let sm = SiteMasterResponse::from_value(&raw, ValidationMode::Strict).unwrap();
        assert_eq!(sm.status, "StatusUp");
        assert!(sm.is_running);
        assert!(sm.is_connected_to_tesla);
        assert!(!sm.is_power_supply_mode);
    }
}
