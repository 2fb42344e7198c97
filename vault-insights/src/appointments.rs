use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;
use vault_core::{Appointment, AppointmentOverview, ProviderRollup};

/// Bucket appointments into upcoming and past relative to `now` and roll them
/// up per provider.
///
/// An appointment at exactly `now` counts as upcoming. Provider names are
/// grouped without any normalization.
pub fn aggregate_appointments(
    appointments: &[Appointment],
    now: DateTime<Utc>,
) -> AppointmentOverview {
    let (mut upcoming, mut past): (Vec<Appointment>, Vec<Appointment>) = appointments
        .iter()
        .cloned()
        .partition(|appointment| is_upcoming(appointment, now));

    upcoming.sort_by(|a, b| a.appointment_date.cmp(&b.appointment_date));
    past.sort_by(|a, b| b.appointment_date.cmp(&a.appointment_date));

    let mut by_provider: BTreeMap<String, ProviderRollup> = BTreeMap::new();
    for appointment in appointments {
        let rollup = by_provider
            .entry(appointment.provider_name.clone())
            .or_default();
        record_visit(rollup, appointment, now);
    }

    debug!(
        total = appointments.len(),
        upcoming = upcoming.len(),
        past = past.len(),
        providers = by_provider.len(),
        "aggregated appointments"
    );

    AppointmentOverview {
        upcoming,
        past,
        by_provider,
    }
}

fn is_upcoming(appointment: &Appointment, now: DateTime<Utc>) -> bool {
    appointment.appointment_date >= now
}

fn record_visit(rollup: &mut ProviderRollup, appointment: &Appointment, now: DateTime<Utc>) {
    let date = appointment.appointment_date;
    if is_upcoming(appointment, now) {
        if rollup.next_visit.map_or(true, |current| date < current) {
            rollup.next_visit = Some(date);
        }
    } else if rollup.last_visit.map_or(true, |current| date > current) {
        rollup.last_visit = Some(date);
    }
    rollup.appointments.push(appointment.clone());
    rollup.count = rollup.appointments.len();
}
