//! High-level client tying the transport to the response catalog.

use std::time::Duration;

use serde_json::{json, Value};

use crate::api::{Api, LoginRequest};
use crate::error::{Error, Result};
use crate::helpers::Precision;
use crate::responses::{
    GridStatusResponse, LoginResponse, MeterDetailsResponse, MetersAggregatesResponse,
    OperationResponse, PowerwallsResponse, SiteInfoResponse, SiteMasterResponse, SoeResponse,
    SolarResponse, StatusResponse, SystemStatusResponse,
};
use crate::schema::{Shape, ValidationMode};
use crate::types::{DeviceType, GridStatus, IslandMode, OperationMode, User};

static ISLAND_MODE_SHAPE: Shape = Shape {
    name: "islanding mode",
    required: &["island_mode"],
    optional: &[],
};

/// Client for one gateway.
///
/// Every call is an independent request/response; the client keeps no
/// state beyond the session cookie and the login token. Responses are
/// validated against the catalog using the configured [`ValidationMode`]
/// (strict by default), and meter power conversions use the configured
/// default [`Precision`].
pub struct Powerwall {
    api: Api,
    mode: ValidationMode,
    precision: Precision,
    token: Option<String>,
}

impl Powerwall {
    pub fn new(endpoint: &str) -> Result<Self> {
        Ok(Powerwall {
            api: Api::new(endpoint)?,
            mode: ValidationMode::Strict,
            precision: Precision::default(),
            token: None,
        })
    }

    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self> {
        Ok(Powerwall {
            api: Api::with_timeout(endpoint, timeout)?,
            mode: ValidationMode::Strict,
            precision: Precision::default(),
            token: None,
        })
    }

    /// Switches the validation mode, e.g. to probe a device whose firmware
    /// has drifted ahead of the shape declarations.
    pub fn with_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the default rounding applied to derived power values.
    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    /// Raw access to the transport, for endpoints without a declared shape.
    pub fn api(&self) -> &Api {
        &self.api
    }

    pub fn login(&mut self, password: &str, email: &str) -> Result<LoginResponse> {
        self.login_as(User::Customer, password, email, false)
    }

    pub fn login_as(
        &mut self,
        user: User,
        password: &str,
        email: &str,
        force_sm_off: bool,
    ) -> Result<LoginResponse> {
        let raw = self.api.login(&LoginRequest {
            username: user.as_str().to_string(),
            email: email.to_string(),
            password: password.to_string(),
            force_sm_off,
        })?;
        // The device also sets an auth cookie, which the agent's cookie
        // store picks up for all subsequent requests.
        let response = LoginResponse::from_value(&raw, self.mode)?;
        self.token = Some(response.token.clone());
        Ok(response)
    }

    pub fn logout(&mut self) -> Result<()> {
        if self.token.is_none() {
            return Err(Error::Api("must be logged in to log out".to_string()));
        }
        self.api.logout()?;
        self.token = None;
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Starts the sitemaster.
    pub fn run(&self) -> Result<()> {
        self.api.get_sitemaster_run()?;
        Ok(())
    }

    /// Stops the sitemaster.
    pub fn stop(&self) -> Result<()> {
        self.api.get_sitemaster_stop()?;
        Ok(())
    }

    /// Battery state of charge in percent.
    pub fn charge(&self) -> Result<SoeResponse> {
        SoeResponse::from_value(&self.api.get_system_status_soe()?, self.mode)
    }

    pub fn sitemaster(&self) -> Result<SiteMasterResponse> {
        SiteMasterResponse::from_value(&self.api.get_sitemaster()?, self.mode)
    }

    pub fn meters(&self) -> Result<MetersAggregatesResponse> {
        MetersAggregatesResponse::with_precision(
            &self.api.get_meters_aggregates()?,
            self.mode,
            self.precision,
        )
    }

    pub fn meter_site(&self) -> Result<MeterDetailsResponse> {
        self.meter_details("site meter", self.api.get_meters_site()?)
    }

    pub fn meter_solar(&self) -> Result<MeterDetailsResponse> {
        self.meter_details("solar meter", self.api.get_meters_solar()?)
    }

    fn meter_details(&self, what: &str, raw: Value) -> Result<MeterDetailsResponse> {
        // These endpoints return an array with one entry per meter.
        let first = raw
            .as_array()
            .and_then(|entries| entries.first())
            .ok_or_else(|| Error::Api(format!("the gateway returned no values for the {what}")))?;
        MeterDetailsResponse::with_precision(first, self.mode, self.precision)
    }

    pub fn site_info(&self) -> Result<SiteInfoResponse> {
        SiteInfoResponse::from_value(&self.api.get_site_info()?, self.mode)
    }

    pub fn set_site_name(&self, site_name: &str) -> Result<Value> {
        self.api
            .post_site_info_site_name(&json!({ "site_name": site_name }))
    }

    pub fn status(&self) -> Result<StatusResponse> {
        StatusResponse::from_value(&self.api.get_status()?, self.mode)
    }

    pub fn device_type(&self) -> Result<DeviceType> {
        Ok(self.status()?.device_type)
    }

    /// The dotted-numeric firmware version, without the build hash.
    pub fn version(&self) -> Result<String> {
        Ok(self.status()?.short_version().to_string())
    }

    /// Site identifier ("vin") from the `config` endpoint.
    ///
    /// The config payload is large and version-dependent, so only the one
    /// field is looked up instead of declaring a full shape for it.
    pub fn vin(&self) -> Result<String> {
        let raw = self.api.get_config()?;
        match raw.get("vin") {
            Some(Value::String(vin)) => Ok(vin.clone()),
            Some(_) => Err(Error::Api(
                "config field 'vin' is not a string".to_string(),
            )),
            None => Err(Error::SchemaDrift {
                shape: "config",
                missing: vec!["vin"],
                added: Vec::new(),
                raw,
            }),
        }
    }

    pub fn grid_status(&self) -> Result<GridStatus> {
        Ok(self.grid_status_full()?.grid_status)
    }

    pub fn is_grid_services_active(&self) -> Result<bool> {
        Ok(self.grid_status_full()?.grid_services_active)
    }

    pub fn grid_status_full(&self) -> Result<GridStatusResponse> {
        GridStatusResponse::from_value(&self.api.get_system_status_grid_status()?, self.mode)
    }

    pub fn system_status(&self) -> Result<SystemStatusResponse> {
        SystemStatusResponse::from_value(&self.api.get_system_status()?, self.mode)
    }

    /// Total pack capacity in Wh.
    pub fn capacity(&self) -> Result<f64> {
        Ok(self.system_status()?.capacity)
    }

    /// Remaining pack energy in Wh.
    pub fn energy(&self) -> Result<f64> {
        Ok(self.system_status()?.energy_remaining)
    }

    pub fn batteries(&self) -> Result<Vec<crate::responses::BatteryResponse>> {
        Ok(self.system_status()?.batteries)
    }

    pub fn operation(&self) -> Result<OperationResponse> {
        OperationResponse::from_value(&self.api.get_operation()?, self.mode)
    }

    pub fn operation_mode(&self) -> Result<OperationMode> {
        Ok(self.operation()?.mode)
    }

    pub fn backup_reserve_percentage(&self) -> Result<f64> {
        Ok(self.operation()?.backup_reserve_percent)
    }

    pub fn powerwalls(&self) -> Result<PowerwallsResponse> {
        PowerwallsResponse::from_value(&self.api.get_powerwalls()?, self.mode)
    }

    pub fn serial_numbers(&self) -> Result<Vec<String>> {
        Ok(self.powerwalls()?.serial_numbers)
    }

    pub fn gateway_din(&self) -> Result<String> {
        let powerwalls = self.powerwalls()?;
        powerwalls
            .gateway_din
            .into_option()
            .ok_or_else(|| Error::Api("the gateway did not report a din".to_string()))
    }

    pub fn solars(&self) -> Result<Vec<SolarResponse>> {
        let raw = self.api.get_solars()?;
        let entries = raw
            .as_array()
            .ok_or_else(|| Error::Api("expected a JSON array for 'solars'".to_string()))?;
        entries
            .iter()
            .map(|entry| SolarResponse::from_value(entry, self.mode))
            .collect()
    }

    pub fn set_island_mode(&self, mode: IslandMode) -> Result<IslandMode> {
        let raw = self
            .api
            .post_islanding_mode(&json!({ "island_mode": mode.as_str() }))?;
        let mapped = ISLAND_MODE_SHAPE.map(&raw, self.mode)?;
        let mode_str = mapped.req_str("island_mode")?;
        IslandMode::try_from(mode_str)
            .map_err(|e| mapped.derivation_error("island_mode", e.to_string()))
    }
}
