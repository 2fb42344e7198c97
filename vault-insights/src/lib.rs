//! Appointment rollups and cycle predictions over vault JSON payloads.

pub mod appointments;
pub mod cycle;
pub mod payload;

use chrono::{DateTime, Utc};
use serde_json::Value;
use vault_core::{AppointmentOverview, CycleAnalysis, VaultConfig, VaultError};

pub use appointments::aggregate_appointments;
pub use cycle::analyze_cycle;
pub use payload::{parse_appointments, parse_cycle_input};

/// Aggregate appointments from a JSON string.
pub fn aggregate_appointments_str(
    json: &str,
    now: DateTime<Utc>,
) -> Result<AppointmentOverview, VaultError> {
    let value: Value =
        serde_json::from_str(json).map_err(|err| VaultError::Parse(err.to_string()))?;
    aggregate_appointments_value(&value, now)
}

/// Aggregate appointments from a `serde_json::Value`.
pub fn aggregate_appointments_value(
    payload: &Value,
    now: DateTime<Utc>,
) -> Result<AppointmentOverview, VaultError> {
    let appointments = parse_appointments(payload)?;
    Ok(aggregate_appointments(&appointments, now))
}

/// Analyze a cycle payload given as a JSON string.
pub fn analyze_cycle_str(
    json: &str,
    now: DateTime<Utc>,
    config: &VaultConfig,
) -> Result<CycleAnalysis, VaultError> {
    let value: Value =
        serde_json::from_str(json).map_err(|err| VaultError::Parse(err.to_string()))?;
    analyze_cycle_value(&value, now, config)
}

/// Analyze a cycle payload given as a `serde_json::Value`.
pub fn analyze_cycle_value(
    payload: &Value,
    now: DateTime<Utc>,
    config: &VaultConfig,
) -> Result<CycleAnalysis, VaultError> {
    let input = parse_cycle_input(payload, config)?;
    analyze_cycle(&input, now, config)
}
