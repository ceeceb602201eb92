//! Client for the local REST API of Tesla Powerwall / Backup Gateway
//! devices.
//!
//! The API is undocumented and drifts between firmware versions, so every
//! endpoint response is checked against a declared [`schema::Shape`] before
//! it is turned into a typed value. Missing or newly appeared fields are
//! reported as a structured [`Error::SchemaDrift`] instead of crashing
//! partway through an accessor, and [`ValidationMode::Lenient`] lets a
//! caller keep probing a device whose firmware has run ahead of the shape
//! declarations.
//!
//! ```no_run
//! use powerwall::{Powerwall, MeterType};
//!
//! fn main() -> Result<(), powerwall::Error> {
//!     let mut gateway = Powerwall::new("192.168.91.1")?;
//!     gateway.login("password", "owner@example.com")?;
//!
//!     let charge = gateway.charge()?;
//!     println!("state of charge: {}%", charge.percentage);
//!
//!     let meters = gateway.meters()?;
//!     let solar = meters.meter(MeterType::Solar)?;
//!     println!("solar: {} kW", solar.power_kw());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod helpers;
pub mod responses;
pub mod schema;
pub mod types;

pub use client::Powerwall;
pub use error::{Error, Result};
pub use helpers::Precision;
pub use responses::{
    BatteryResponse, GridStatusResponse, LoginResponse, MeterDetailsReadings,
    MeterDetailsResponse, MeterResponse, MetersAggregatesResponse, OperationResponse,
    PowerwallsResponse, SiteInfoResponse, SiteMasterResponse, SoeResponse, SolarResponse,
    StatusResponse, SystemStatusResponse,
};
pub use schema::{Mapped, Presence, Shape, ValidationMode};
pub use types::{
    DeviceType, GridState, GridStatus, IslandMode, MeterType, OperationMode, Role, UnknownVariant,
    User,
};
