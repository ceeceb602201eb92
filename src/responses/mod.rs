//! The response catalog: one typed response per endpoint the client
//! understands, each declared as a [`crate::schema::Shape`] plus an
//! extraction routine and derived accessors.

pub mod battery;
pub mod login;
pub mod meter;
pub mod site;
pub mod status;
pub mod system;

pub use battery::BatteryResponse;
pub use login::LoginResponse;
pub use meter::{
    MeterDetailsReadings, MeterDetailsResponse, MeterResponse, MetersAggregatesResponse,
};
pub use site::{SiteInfoResponse, SiteMasterResponse};
pub use status::StatusResponse;
pub use system::{
    GridStatusResponse, OperationResponse, PowerwallsResponse, SoeResponse, SolarResponse,
    SystemStatusResponse,
};
