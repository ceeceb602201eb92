//! Closed sets of string-valued tags used by the gateway API.
//!
//! The wire representation of each of these is an opaque string. Decoding an
//! unrecognized string yields an [`UnknownVariant`] error rather than a
//! panic; unrecognized variants are the most common form of schema drift
//! after a firmware update.

use std::fmt;

/// Raised when a wire string does not map to any known enum member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// Physical circuit a meter reading belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeterType {
    Solar,
    Site,
    Battery,
    Load,
    Generator,
    Busway,
}

impl MeterType {
    /// Every category the client knows about, in a stable order.
    pub const ALL: [MeterType; 6] = [
        MeterType::Solar,
        MeterType::Site,
        MeterType::Battery,
        MeterType::Load,
        MeterType::Generator,
        MeterType::Busway,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MeterType::Solar => "solar",
            MeterType::Site => "site",
            MeterType::Battery => "battery",
            MeterType::Load => "load",
            MeterType::Generator => "generator",
            MeterType::Busway => "busway",
        }
    }
}

impl TryFrom<&str> for MeterType {
    type Error = UnknownVariant;

    fn try_from(value: &str) -> Result<Self, UnknownVariant> {
        MeterType::ALL
            .iter()
            .find(|m| m.as_str() == value)
            .copied()
            .ok_or_else(|| UnknownVariant {
                kind: "meter type",
                value: value.to_string(),
            })
    }
}

impl fmt::Display for MeterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gateway hardware revision, as returned by `device_type`.
///
/// `Gw1` is the first-generation gateway ("hec"), `Gw2` the second ("teg").
/// The meaning of "smc" is unclear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Gw1,
    Gw2,
    Smc,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Gw1 => "hec",
            DeviceType::Gw2 => "teg",
            DeviceType::Smc => "smc",
        }
    }
}

impl TryFrom<&str> for DeviceType {
    type Error = UnknownVariant;

    fn try_from(value: &str) -> Result<Self, UnknownVariant> {
        match value {
            "hec" => Ok(DeviceType::Gw1),
            "teg" => Ok(DeviceType::Gw2),
            "smc" => Ok(DeviceType::Smc),
            _ => Err(UnknownVariant {
                kind: "device type",
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the site is connected to the grid or running islanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridStatus {
    Connected,
    IslandedReady,
    Islanded,
    TransitionToGrid,
    TransitionToIsland,
}

impl GridStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GridStatus::Connected => "SystemGridConnected",
            GridStatus::IslandedReady => "SystemIslandedReady",
            GridStatus::Islanded => "SystemIslandedActive",
            GridStatus::TransitionToGrid => "SystemTransitionToGrid",
            GridStatus::TransitionToIsland => "SystemTransitionToIsland",
        }
    }
}

impl TryFrom<&str> for GridStatus {
    type Error = UnknownVariant;

    fn try_from(value: &str) -> Result<Self, UnknownVariant> {
        match value {
            "SystemGridConnected" => Ok(GridStatus::Connected),
            "SystemIslandedReady" => Ok(GridStatus::IslandedReady),
            "SystemIslandedActive" => Ok(GridStatus::Islanded),
            "SystemTransitionToGrid" => Ok(GridStatus::TransitionToGrid),
            "SystemTransitionToIsland" => Ok(GridStatus::TransitionToIsland),
            _ => Err(UnknownVariant {
                kind: "grid status",
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for GridStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grid compliance state of a single battery block (`pinv_grid_state`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridState {
    Compliant,
    Qualifying,
    Uncompliant,
    Disabled,
}

impl GridState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GridState::Compliant => "Grid_Compliant",
            GridState::Qualifying => "Grid_Qualifying",
            GridState::Uncompliant => "Grid_Uncompliant",
            GridState::Disabled => "Grid_Disabled",
        }
    }
}

impl TryFrom<&str> for GridState {
    type Error = UnknownVariant;

    fn try_from(value: &str) -> Result<Self, UnknownVariant> {
        match value {
            "Grid_Compliant" => Ok(GridState::Compliant),
            "Grid_Qualifying" => Ok(GridState::Qualifying),
            "Grid_Uncompliant" => Ok(GridState::Uncompliant),
            "Grid_Disabled" => Ok(GridState::Disabled),
            _ => Err(UnknownVariant {
                kind: "grid state",
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for GridState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation mode reported by the `operation` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationMode {
    Backup,
    SelfConsumption,
    Autonomous,
    Scheduler,
    SiteControl,
}

impl OperationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationMode::Backup => "backup",
            OperationMode::SelfConsumption => "self_consumption",
            OperationMode::Autonomous => "autonomous",
            OperationMode::Scheduler => "scheduler",
            OperationMode::SiteControl => "site_control",
        }
    }
}

impl TryFrom<&str> for OperationMode {
    type Error = UnknownVariant;

    fn try_from(value: &str) -> Result<Self, UnknownVariant> {
        match value {
            "backup" => Ok(OperationMode::Backup),
            "self_consumption" => Ok(OperationMode::SelfConsumption),
            "autonomous" => Ok(OperationMode::Autonomous),
            "scheduler" => Ok(OperationMode::Scheduler),
            "site_control" => Ok(OperationMode::SiteControl),
            _ => Err(UnknownVariant {
                kind: "operation mode",
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Islanding mode accepted by the `v2/islanding/mode` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IslandMode {
    Offgrid,
    Ongrid,
}

impl IslandMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IslandMode::Offgrid => "intentional_reconnect_failsafe",
            IslandMode::Ongrid => "backup",
        }
    }
}

impl TryFrom<&str> for IslandMode {
    type Error = UnknownVariant;

    fn try_from(value: &str) -> Result<Self, UnknownVariant> {
        match value {
            "intentional_reconnect_failsafe" => Ok(IslandMode::Offgrid),
            "backup" => Ok(IslandMode::Ongrid),
            _ => Err(UnknownVariant {
                kind: "island mode",
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for IslandMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role tag attached to a login session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    HomeOwner,
    KioskViewer,
    ProviderEngineer,
    TeslaEngineer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::HomeOwner => "Home_Owner",
            Role::KioskViewer => "Kiosk_Viewer",
            Role::ProviderEngineer => "Provider_Engineer",
            Role::TeslaEngineer => "Tesla_Engineer",
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = UnknownVariant;

    fn try_from(value: &str) -> Result<Self, UnknownVariant> {
        match value {
            "Home_Owner" => Ok(Role::HomeOwner),
            "Kiosk_Viewer" => Ok(Role::KioskViewer),
            "Provider_Engineer" => Ok(Role::ProviderEngineer),
            "Tesla_Engineer" => Ok(Role::TeslaEngineer),
            _ => Err(UnknownVariant {
                kind: "role",
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User account to authenticate as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum User {
    Installer,
    Customer,
    Engineer,
    Kiosk,
    Admin,
}

impl User {
    pub fn as_str(&self) -> &'static str {
        match self {
            User::Installer => "installer",
            User::Customer => "customer",
            User::Engineer => "engineer",
            User::Kiosk => "kiosk",
            User::Admin => "admin",
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
