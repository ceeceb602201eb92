//! Numeric helpers for power and energy conversions.

/// Decimal rounding applied to derived power values.
///
/// `Exact` is the sentinel that disables rounding entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Round(u32),
    Exact,
}

impl Default for Precision {
    /// One decimal place, which is plenty for kW figures shown to users.
    fn default() -> Self {
        Precision::Round(1)
    }
}

pub fn round_to(value: f64, precision: Precision) -> f64 {
    match precision {
        Precision::Exact => value,
        Precision::Round(decimals) => {
            let factor = 10f64.powi(decimals as i32);
            (value * factor).round() / factor
        }
    }
}

/// Converts watts to kilowatts, rounding per `precision`.
pub fn watts_to_kw(value: f64, precision: Precision) -> f64 {
    round_to(value / 1000.0, precision)
}
