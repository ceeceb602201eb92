//! The `status` endpoint: firmware version, device type and uptime.

use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

use crate::error::Result;
use crate::schema::{Presence, Shape, ValidationMode};
use crate::types::DeviceType;

pub static STATUS_SHAPE: Shape = Shape {
    name: "status",
    required: &[
        "start_time",
        "up_time_seconds",
        "version",
        "device_type",
        "git_hash",
    ],
    optional: &["commission_count", "sync_type"],
};

const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

#[derive(Debug, Clone)]
pub struct StatusResponse {
    /// When the gateway software started, with the device's UTC offset.
    pub start_time: DateTime<FixedOffset>,
    /// Uptime, parsed from the compound `[Nd][Nh][Nm][N.NNNs]` format.
    pub up_time: Duration,
    /// Full version string; newer firmware appends a build hash,
    /// e.g. `1.50.1 c58c2df3`.
    pub version: String,
    pub device_type: DeviceType,
    pub git_hash: String,
    pub commission_count: Presence<i64>,
    pub sync_type: Presence<String>,
    raw: Value,
}

impl StatusResponse {
    pub fn from_value(raw: &Value, mode: ValidationMode) -> Result<Self> {
        let mapped = STATUS_SHAPE.map(raw, mode)?;

        let start_time_str = mapped.req_str("start_time")?;
        let start_time = DateTime::parse_from_str(start_time_str, START_TIME_FORMAT)
            .map_err(|e| mapped.derivation_error("start_time", e.to_string()))?;

        let up_time_str = mapped.req_str("up_time_seconds")?;
        let up_time = parse_uptime(up_time_str)
            .map_err(|reason| mapped.derivation_error("up_time_seconds", reason))?;

        let device_type_str = mapped.req_str("device_type")?;
        let device_type = DeviceType::try_from(device_type_str)
            .map_err(|e| mapped.derivation_error("device_type", e.to_string()))?;

        Ok(StatusResponse {
            start_time,
            up_time,
            version: mapped.req_string("version")?,
            device_type,
            git_hash: mapped.req_string("git_hash")?,
            commission_count: mapped.opt_i64("commission_count")?,
            sync_type: mapped.opt_string("sync_type")?,
            raw: mapped.to_value(),
        })
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// The leading dotted-numeric token of the version, without the build
    /// hash trailer.
    pub fn short_version(&self) -> &str {
        self.version.split(' ').next().unwrap_or(&self.version)
    }
}

/// Parses the gateway's compound uptime format: `[Nd][Nh][Nm][N.NNNs]`.
///
/// Every component is optional, but the day/hour/minute/second order is
/// fixed and no component may repeat. The seconds component may carry a
/// fractional part, which is kept to nanosecond resolution.
fn parse_uptime(input: &str) -> std::result::Result<Duration, String> {
    const UNITS: [(char, u64); 4] = [('d', 86_400), ('h', 3_600), ('m', 60), ('s', 1)];

    let mut total = Duration::ZERO;
    let mut next_unit = 0;
    let mut rest = input;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .ok_or_else(|| format!("number '{rest}' has no unit suffix"))?;
        if number_len == 0 {
            return Err(format!("expected a number at '{rest}'"));
        }
        let (number, tail) = rest.split_at(number_len);
        let mut tail_chars = tail.chars();
        let unit = match tail_chars.next() {
            Some(c) => c,
            None => return Err(format!("number '{number}' has no unit suffix")),
        };

        // Looking the unit up among the not-yet-seen ones enforces both the
        // fixed order and that no unit appears twice.
        let position = UNITS[next_unit..]
            .iter()
            .position(|(suffix, _)| *suffix == unit)
            .ok_or_else(|| format!("unexpected unit '{unit}' after '{number}'"))?;
        let (_, unit_seconds) = UNITS[next_unit + position];
        next_unit += position + 1;

        total = total
            .checked_add(parse_component(number, unit_seconds)?)
            .ok_or_else(|| format!("component '{number}{unit}' is out of range"))?;
        rest = tail_chars.as_str();
    }

    Ok(total)
}

/// Parses one `N` or `N.NNN` component and scales it by the unit's length
/// in seconds. The fractional part is converted digit-exactly instead of
/// going through floating point.
fn parse_component(number: &str, unit_seconds: u64) -> std::result::Result<Duration, String> {
    let (int_part, frac_part) = match number.split_once('.') {
        Some((i, f)) => (i, f),
        None => (number, ""),
    };

    if frac_part.contains('.') {
        return Err(format!("malformed number '{number}'"));
    }

    let whole: u64 = if int_part.is_empty() {
        0
    } else {
        int_part
            .parse()
            .map_err(|_| format!("malformed number '{number}'"))?
    };

    let mut nanos: u64 = 0;
    if !frac_part.is_empty() {
        // Scale the fraction to nanoseconds of one unit, digit by digit.
        let mut scale = unit_seconds * 1_000_000_000;
        for digit in frac_part.chars() {
            let digit = digit
                .to_digit(10)
                .ok_or_else(|| format!("malformed number '{number}'"))?;
            scale /= 10;
            if scale == 0 {
                break;
            }
            nanos += digit as u64 * scale;
        }
    }

    let seconds = whole
        .checked_mul(unit_seconds)
        .ok_or_else(|| format!("component '{number}' is out of range"))?;
    Duration::new(seconds, 0)
        .checked_add(Duration::from_nanos(nanos))
        .ok_or_else(|| format!("component '{number}' is out of range"))
}
