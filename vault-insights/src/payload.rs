//! Validation of the loosely typed JSON payloads the web app sends.
//!
//! Records are read field by field from `serde_json::Value` so that both the
//! camelCase API shape and the snake_case database shape are accepted, and so
//! that numeric settings can fall back to defaults instead of failing.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::warn;
use vault_core::{
    Appointment, AppointmentStatus, AppointmentType, CycleEntry, CycleInput, FlowLevel,
    VaultConfig, VaultError, MAX_LENGTH_DAYS,
};

/// Read appointments from a bare array or from `{ "appointments": [...] }`.
pub fn parse_appointments(payload: &Value) -> Result<Vec<Appointment>, VaultError> {
    let records = payload
        .as_array()
        .or_else(|| payload.get("appointments").and_then(Value::as_array))
        .ok_or(VaultError::MissingData)?;

    records
        .iter()
        .enumerate()
        .map(|(index, record)| parse_appointment(index, record))
        .collect()
}

fn parse_appointment(index: usize, record: &Value) -> Result<Appointment, VaultError> {
    let id = field(record, &["id", "_id"])
        .and_then(id_text)
        .ok_or_else(|| missing_field("appointment", index, "id"))?;

    let provider_name = text(record, &["providerName", "provider_name"])
        .ok_or_else(|| missing_field("appointment", index, "providerName"))?
        .to_string();

    let raw_date = text(record, &["appointmentDate", "appointment_date"])
        .ok_or_else(|| missing_field("appointment", index, "appointmentDate"))?;
    let appointment_date = parse_datetime(raw_date).ok_or_else(|| {
        VaultError::Parse(format!(
            "appointment {index}: invalid appointmentDate {raw_date:?}"
        ))
    })?;

    let appointment_type = text(record, &["appointmentType", "appointment_type"])
        .map(AppointmentType::from_label)
        .unwrap_or(AppointmentType::Other);

    let status = match text(record, &["status"]) {
        Some(label) => AppointmentStatus::from_label(label).ok_or_else(|| {
            VaultError::Parse(format!("appointment {index}: unknown status {label:?}"))
        })?,
        None => AppointmentStatus::default(),
    };

    Ok(Appointment {
        id,
        provider_name,
        provider_specialty: optional_text(record, &["providerSpecialty", "provider_specialty"]),
        appointment_date,
        appointment_type,
        status,
        location: optional_text(record, &["location"]),
        notes: optional_text(record, &["notes"]),
    })
}

/// Read cycle settings and history. Unusable lengths fall back to `config`.
pub fn parse_cycle_input(payload: &Value, config: &VaultConfig) -> Result<CycleInput, VaultError> {
    if !payload.is_object() {
        return Err(VaultError::Parse("cycle payload must be a JSON object".into()));
    }

    let last_period_start = match field(payload, &["lastPeriodStart", "last_period_start"]) {
        Some(Value::String(raw)) if raw.trim().is_empty() => None,
        Some(Value::String(raw)) => Some(parse_date(raw).ok_or_else(|| {
            VaultError::Parse(format!("invalid lastPeriodStart {raw:?}"))
        })?),
        Some(other) => {
            return Err(VaultError::Parse(format!(
                "lastPeriodStart must be a date string, got {other}"
            )))
        }
        None => None,
    };

    let cycle_length = parse_length(
        field(payload, &["cycleLength", "cycle_length"]),
        config.default_cycle_length,
        "cycleLength",
    );
    let period_length = parse_length(
        field(payload, &["periodLength", "period_length"]),
        config.default_period_length,
        "periodLength",
    );

    let entries = match field(payload, &["entries", "history", "cycleEntries"]) {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| parse_entry(index, item))
            .collect::<Result<Vec<_>, _>>()?,
        Some(Value::Null) | None => Vec::new(),
        Some(_) => return Err(VaultError::Parse("entries must be an array".into())),
    };

    Ok(CycleInput {
        last_period_start,
        cycle_length,
        period_length,
        entries,
    })
}

fn parse_entry(index: usize, item: &Value) -> Result<CycleEntry, VaultError> {
    let raw_date = text(item, &["date"]).ok_or_else(|| missing_field("entry", index, "date"))?;
    let date = parse_date(raw_date)
        .ok_or_else(|| VaultError::Parse(format!("entry {index}: invalid date {raw_date:?}")))?;

    let flow = match text(item, &["flow"]) {
        Some(label) => FlowLevel::from_label(label).unwrap_or_else(|| {
            warn!("entry {index}: unknown flow {label:?}, recording as medium");
            FlowLevel::Medium
        }),
        None => FlowLevel::Medium,
    };

    let symptoms: BTreeSet<String> = match item.get("symptoms") {
        Some(Value::Array(tags)) => tags
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(list)) => list
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect(),
        _ => BTreeSet::new(),
    };

    Ok(CycleEntry {
        date,
        flow,
        symptoms,
        notes: text(item, &["notes"]).unwrap_or_default().to_string(),
    })
}

/// Whole number of days between 1 and [`MAX_LENGTH_DAYS`], or `fallback`.
/// Fractions are truncated the way the form's integer parsing does.
fn parse_length(value: Option<&Value>, fallback: u32, name: &str) -> u32 {
    let parsed = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(raw)) => raw.trim().parse::<f64>().ok(),
        _ => None,
    };

    let upper = f64::from(MAX_LENGTH_DAYS + 1);
    match parsed {
        Some(days) if days.is_finite() && days >= 1.0 && days < upper => days.trunc() as u32,
        _ => {
            if value.is_some_and(|v| !v.is_null()) {
                warn!(
                    "{name} is not between 1 and {MAX_LENGTH_DAYS} days, using default of {fallback}"
                );
            }
            fallback
        }
    }
}

/// Accepts RFC 3339, a naive date-time (taken as UTC) or a bare date
/// (midnight UTC).
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Calendar date from `YYYY-MM-DD` or from the date part of a timestamp.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(value).map(|dt| dt.date_naive()))
}

fn field<'a>(record: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| record.get(*name))
        .find(|value| !value.is_null())
}

fn text<'a>(record: &'a Value, names: &[&str]) -> Option<&'a str> {
    field(record, names)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
}

fn optional_text(record: &Value, names: &[&str]) -> Option<String> {
    text(record, names).map(str::to_string)
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn missing_field(kind: &str, index: usize, name: &str) -> VaultError {
    VaultError::Parse(format!("{kind} {index}: missing {name}"))
}
