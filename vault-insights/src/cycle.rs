//! Cycle predictions: next period, ovulation and fertile windows, regularity.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{debug, warn};
use vault_core::{
    CycleAnalysis, CycleEntry, CycleHealth, CycleInput, CyclePhase, DateWindow, Regularity,
    VaultConfig, VaultError, MAX_LENGTH_DAYS,
};

/// Entries needed before regularity is reported.
pub const MIN_ENTRIES_FOR_REGULARITY: usize = 3;

const OVULATION_MARGIN_DAYS: i64 = 2;
const FERTILE_LEAD_DAYS: i64 = 5;
const FERTILE_TAIL_DAYS: i64 = 1;

/// Predict the current cycle from the last period start.
///
/// Fails with [`VaultError::MissingData`] when no period start is known and
/// with [`VaultError::InvalidInput`] when `now` falls before it or a predicted
/// date falls outside the calendar range.
pub fn analyze_cycle(
    input: &CycleInput,
    now: DateTime<Utc>,
    config: &VaultConfig,
) -> Result<CycleAnalysis, VaultError> {
    let start = input.last_period_start.ok_or(VaultError::MissingData)?;
    let today = now.date_naive();
    if today < start {
        return Err(VaultError::InvalidInput(format!(
            "last period start {start} is after {today}"
        )));
    }

    let cycle_length = resolve_length(input.cycle_length, config.default_cycle_length, "cycle");
    let period_length =
        resolve_length(input.period_length, config.default_period_length, "period");

    let current_cycle_day = (today - start).num_days() + 1;
    let predicted_next_period = shift_days(start, i64::from(cycle_length))?;
    let ovulation_day = ovulation_day(cycle_length);
    let ovulation_window = ovulation_window(start, cycle_length)?;
    let fertile_window = fertile_window(ovulation_window)?;

    let gaps = cycle_gaps(&input.entries);
    let stats = if input.entries.len() >= MIN_ENTRIES_FOR_REGULARITY {
        Some((mean(&gaps), std_deviation(&gaps)))
    } else {
        None
    };
    let regularity = stats
        .map(|(_, std_dev)| classify_regularity(std_dev))
        .unwrap_or(Regularity::Unknown);
    let cycle_health = health_for(regularity);

    let phase = phase_for_day(current_cycle_day, period_length, ovulation_day);
    let days_until_next_period = (predicted_next_period - today).num_days();

    let mut analysis = CycleAnalysis {
        current_cycle_day,
        phase,
        average_length: cycle_length,
        observed_average_length: stats.map(|(avg, _)| avg),
        cycle_variation: stats.map(|(_, std_dev)| std_dev),
        regularity,
        cycle_health,
        predicted_next_period,
        days_until_next_period,
        ovulation_window,
        fertile_window,
        insights: Vec::new(),
        recommendations: Vec::new(),
    };
    write_guidance(&mut analysis, today);

    debug!(
        cycle_day = analysis.current_cycle_day,
        phase = %analysis.phase,
        regularity = %analysis.regularity,
        next_period = %analysis.predicted_next_period,
        "analyzed cycle"
    );

    Ok(analysis)
}

fn resolve_length(value: u32, fallback: u32, what: &str) -> u32 {
    if (1..=MAX_LENGTH_DAYS).contains(&value) {
        return value;
    }
    warn!("{what} length {value} out of range, using default of {fallback} days");
    fallback
}

fn shift_days(date: NaiveDate, days: i64) -> Result<NaiveDate, VaultError> {
    Duration::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .ok_or_else(|| {
            VaultError::InvalidInput(format!("{date} shifted by {days} days is out of range"))
        })
}

/// Cycle day (1-based) on which ovulation is expected: half the cycle,
/// rounding halves up.
pub fn ovulation_day(cycle_length: u32) -> i64 {
    (i64::from(cycle_length) + 1) / 2
}

/// Five days centred on the expected ovulation date.
pub fn ovulation_window(
    last_period_start: NaiveDate,
    cycle_length: u32,
) -> Result<DateWindow, VaultError> {
    let ovulation = shift_days(last_period_start, ovulation_day(cycle_length) - 1)?;
    Ok(DateWindow {
        start: shift_days(ovulation, -OVULATION_MARGIN_DAYS)?,
        end: shift_days(ovulation, OVULATION_MARGIN_DAYS)?,
    })
}

pub fn fertile_window(ovulation_window: DateWindow) -> Result<DateWindow, VaultError> {
    Ok(DateWindow {
        start: shift_days(ovulation_window.start, -FERTILE_LEAD_DAYS)?,
        end: shift_days(ovulation_window.end, FERTILE_TAIL_DAYS)?,
    })
}

/// Day gaps between consecutive entries, after sorting by date.
pub fn cycle_gaps(entries: &[CycleEntry]) -> Vec<f64> {
    let mut dates: Vec<NaiveDate> = entries.iter().map(|entry| entry.date).collect();
    dates.sort();
    dates
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days() as f64)
        .collect()
}

pub fn classify_regularity(std_dev: f64) -> Regularity {
    if std_dev <= 2.0 {
        Regularity::VeryRegular
    } else if std_dev <= 5.0 {
        Regularity::Regular
    } else if std_dev <= 10.0 {
        Regularity::Irregular
    } else {
        Regularity::VeryIrregular
    }
}

fn health_for(regularity: Regularity) -> CycleHealth {
    match regularity {
        Regularity::VeryRegular | Regularity::Regular => CycleHealth::Healthy,
        Regularity::Irregular | Regularity::VeryIrregular => CycleHealth::NeedsAttention,
        Regularity::Unknown => CycleHealth::Tracking,
    }
}

/// Phase for a 1-based cycle day. Menstruation wins over every other phase;
/// the ovulation phase covers the ovulation window.
pub fn phase_for_day(cycle_day: i64, period_length: u32, ovulation_day: i64) -> CyclePhase {
    if cycle_day <= i64::from(period_length) {
        CyclePhase::Menstrual
    } else if cycle_day < ovulation_day - OVULATION_MARGIN_DAYS {
        CyclePhase::Follicular
    } else if cycle_day <= ovulation_day + OVULATION_MARGIN_DAYS {
        CyclePhase::Ovulation
    } else {
        CyclePhase::Luteal
    }
}

fn write_guidance(analysis: &mut CycleAnalysis, today: NaiveDate) {
    let day = analysis.current_cycle_day;
    let (insight, recommendation) = match analysis.phase {
        CyclePhase::Menstrual => (
            format!("Day {day}: menstrual phase. Estrogen and progesterone are at their lowest."),
            "Prioritize rest, hydration and iron-rich foods.",
        ),
        CyclePhase::Follicular => (
            format!("Day {day}: follicular phase. Rising estrogen often lifts energy and mood."),
            "A good stretch for higher-intensity workouts and starting new projects.",
        ),
        CyclePhase::Ovulation => (
            format!("Day {day}: ovulation window. Fertility is at its peak."),
            "If you are trying to conceive this is your most fertile time; otherwise use reliable contraception.",
        ),
        CyclePhase::Luteal => (
            format!("Day {day}: luteal phase. Progesterone rises and PMS symptoms may appear."),
            "Go easy on salt and caffeine and favour gentle movement.",
        ),
    };
    analysis.insights.push(insight);
    analysis.recommendations.push(recommendation.to_string());

    if analysis.fertile_window.contains(today) {
        analysis.insights.push(format!(
            "Today falls inside your fertile window ({} to {}).",
            analysis.fertile_window.start, analysis.fertile_window.end
        ));
    }

    let late_by = -analysis.days_until_next_period;
    if late_by > 0 {
        analysis.insights.push(format!(
            "Your period is {late_by} day(s) later than predicted."
        ));
    }

    match (analysis.observed_average_length, analysis.cycle_variation) {
        (Some(avg), Some(std_dev)) => analysis.insights.push(format!(
            "Your cycles are {} (average {avg:.1} days, varying by about {std_dev:.1} days).",
            analysis.regularity.label().to_lowercase()
        )),
        _ => analysis.insights.push(format!(
            "Log at least {MIN_ENTRIES_FOR_REGULARITY} periods to see how regular your cycle is."
        )),
    }

    if analysis.cycle_health == CycleHealth::NeedsAttention {
        analysis.recommendations.push(
            "Cycle length varies a lot; consider discussing it with your provider.".to_string(),
        );
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
fn std_deviation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use vault_core::FlowLevel;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn noon(s: &str) -> DateTime<Utc> {
        let d = date(s);
        Utc.from_utc_datetime(&d.and_hms_opt(12, 0, 0).unwrap())
    }

    fn entry(s: &str) -> CycleEntry {
        CycleEntry {
            date: date(s),
            flow: FlowLevel::Medium,
            symptoms: Default::default(),
            notes: String::new(),
        }
    }

    fn input(start: &str, cycle_length: u32, entries: Vec<CycleEntry>) -> CycleInput {
        CycleInput {
            last_period_start: Some(date(start)),
            cycle_length,
            period_length: 5,
            entries,
        }
    }

    #[test]
    fn worked_example_windows() {
        let analysis = analyze_cycle(
            &input("2025-01-01", 28, vec![]),
            noon("2025-01-03"),
            &VaultConfig::default(),
        )
        .unwrap();

        assert_eq!(analysis.predicted_next_period, date("2025-01-29"));
        assert_eq!(ovulation_day(28), 14);
        assert_eq!(analysis.ovulation_window.start, date("2025-01-12"));
        assert_eq!(analysis.ovulation_window.end, date("2025-01-16"));
        assert_eq!(analysis.fertile_window.start, date("2025-01-07"));
        assert_eq!(analysis.fertile_window.end, date("2025-01-17"));
        assert_eq!(analysis.current_cycle_day, 3);
        assert_eq!(analysis.days_until_next_period, 26);
    }

    #[test]
    fn worked_example_very_regular() {
        let entries = vec![
            entry("2025-01-01"),
            entry("2025-01-29"),
            entry("2025-02-27"),
            entry("2025-03-26"),
        ];
        assert_eq!(cycle_gaps(&entries), vec![28.0, 29.0, 27.0]);

        let analysis = analyze_cycle(
            &input("2025-03-26", 28, entries),
            noon("2025-03-30"),
            &VaultConfig::default(),
        )
        .unwrap();

        assert_eq!(analysis.observed_average_length, Some(28.0));
        let variation = analysis.cycle_variation.unwrap();
        assert!((variation - 0.816).abs() < 0.01);
        assert_eq!(analysis.regularity, Regularity::VeryRegular);
        assert_eq!(analysis.cycle_health, CycleHealth::Healthy);
    }

    #[test]
    fn too_few_entries_is_tracking() {
        let entries = vec![entry("2025-01-01"), entry("2025-03-15")];
        let analysis = analyze_cycle(
            &input("2025-03-15", 28, entries),
            noon("2025-03-20"),
            &VaultConfig::default(),
        )
        .unwrap();

        assert_eq!(analysis.regularity, Regularity::Unknown);
        assert_eq!(analysis.cycle_health, CycleHealth::Tracking);
        assert_eq!(analysis.observed_average_length, None);
    }

    #[test]
    fn entries_are_sorted_before_gaps() {
        let entries = vec![entry("2025-02-26"), entry("2025-01-01"), entry("2025-01-29")];
        assert_eq!(cycle_gaps(&entries), vec![28.0, 28.0]);
    }

    #[test]
    fn missing_start_yields_no_analysis() {
        let result = analyze_cycle(
            &CycleInput::default(),
            noon("2025-01-03"),
            &VaultConfig::default(),
        );
        assert!(matches!(result, Err(VaultError::MissingData)));
    }

    #[test]
    fn start_after_now_is_rejected() {
        let result = analyze_cycle(
            &input("2025-02-01", 28, vec![]),
            noon("2025-01-03"),
            &VaultConfig::default(),
        );
        assert!(matches!(result, Err(VaultError::InvalidInput(_))));
    }

    #[test]
    fn zero_lengths_use_config_defaults() {
        let mut raw = input("2025-01-01", 0, vec![]);
        raw.period_length = 0;
        let config = VaultConfig {
            default_cycle_length: 30,
            default_period_length: 4,
        };
        let analysis = analyze_cycle(&raw, noon("2025-01-04"), &config).unwrap();
        assert_eq!(analysis.average_length, 30);
        assert_eq!(analysis.predicted_next_period, date("2025-01-31"));
        assert_eq!(analysis.phase, CyclePhase::Menstrual);
    }

    #[test]
    fn odd_cycle_length_rounds_ovulation_up() {
        assert_eq!(ovulation_day(29), 15);
        assert_eq!(ovulation_day(27), 14);
        let window = ovulation_window(date("2025-01-01"), 29).unwrap();
        assert_eq!(window.start, date("2025-01-13"));
        assert_eq!(window.end, date("2025-01-17"));
    }

    #[test]
    fn phases_follow_cycle_day() {
        let od = ovulation_day(28);
        assert_eq!(phase_for_day(1, 5, od), CyclePhase::Menstrual);
        assert_eq!(phase_for_day(5, 5, od), CyclePhase::Menstrual);
        assert_eq!(phase_for_day(6, 5, od), CyclePhase::Follicular);
        assert_eq!(phase_for_day(11, 5, od), CyclePhase::Follicular);
        assert_eq!(phase_for_day(12, 5, od), CyclePhase::Ovulation);
        assert_eq!(phase_for_day(16, 5, od), CyclePhase::Ovulation);
        assert_eq!(phase_for_day(17, 5, od), CyclePhase::Luteal);
        assert_eq!(phase_for_day(40, 5, od), CyclePhase::Luteal);
    }

    #[test]
    fn phase_day_matches_ovulation_window_dates() {
        let start = date("2025-01-01");
        let window = ovulation_window(start, 28).unwrap();
        let first_day = (window.start - start).num_days() + 1;
        let last_day = (window.end - start).num_days() + 1;
        assert_eq!(phase_for_day(first_day, 5, 14), CyclePhase::Ovulation);
        assert_eq!(phase_for_day(last_day, 5, 14), CyclePhase::Ovulation);
    }

    #[test]
    fn classification_thresholds() {
        assert_eq!(classify_regularity(0.0), Regularity::VeryRegular);
        assert_eq!(classify_regularity(2.0), Regularity::VeryRegular);
        assert_eq!(classify_regularity(2.01), Regularity::Regular);
        assert_eq!(classify_regularity(5.0), Regularity::Regular);
        assert_eq!(classify_regularity(10.0), Regularity::Irregular);
        assert_eq!(classify_regularity(10.5), Regularity::VeryIrregular);
    }

    #[test]
    fn classification_is_monotonic() {
        let mut previous = classify_regularity(0.0);
        for step in 1..=300 {
            let current = classify_regularity(step as f64 * 0.05);
            assert!(current >= previous);
            previous = current;
        }
    }

    #[test]
    fn irregular_history_needs_attention() {
        let entries = vec![
            entry("2025-01-01"),
            entry("2025-01-22"),
            entry("2025-03-05"),
            entry("2025-03-28"),
        ];
        let analysis = analyze_cycle(
            &input("2025-03-28", 28, entries),
            noon("2025-04-01"),
            &VaultConfig::default(),
        )
        .unwrap();
        // gaps 21, 42, 23
        assert_eq!(analysis.regularity, Regularity::Irregular);
        assert_eq!(analysis.cycle_health, CycleHealth::NeedsAttention);
        assert!(analysis
            .recommendations
            .iter()
            .any(|r| r.contains("provider")));
    }

    #[test]
    fn overdue_period_is_reported() {
        let analysis = analyze_cycle(
            &input("2025-01-01", 28, vec![]),
            noon("2025-02-02"),
            &VaultConfig::default(),
        )
        .unwrap();
        assert_eq!(analysis.current_cycle_day, 33);
        assert_eq!(analysis.days_until_next_period, -4);
        assert!(analysis.insights.iter().any(|i| i.contains("4 day(s) later")));
    }

    #[test]
    fn same_day_start_is_day_one() {
        let analysis = analyze_cycle(
            &input("2025-01-01", 28, vec![]),
            Utc.with_ymd_and_hms(2025, 1, 1, 23, 59, 0).unwrap(),
            &VaultConfig::default(),
        )
        .unwrap();
        assert_eq!(analysis.current_cycle_day, 1);
        assert_eq!(analysis.phase, CyclePhase::Menstrual);
    }

    #[test]
    fn oversized_cycle_length_falls_back_to_default() {
        let analysis = analyze_cycle(
            &input("2025-01-01", 4_000_000_000, vec![]),
            noon("2025-01-03"),
            &VaultConfig::default(),
        )
        .unwrap();
        assert_eq!(analysis.average_length, 28);
        assert_eq!(analysis.predicted_next_period, date("2025-01-29"));
    }

    #[test]
    fn prediction_past_calendar_end_is_invalid_input() {
        let start = NaiveDate::MAX;
        let now = Utc.from_utc_datetime(&start.and_hms_opt(0, 0, 0).unwrap());
        let raw = CycleInput {
            last_period_start: Some(start),
            ..CycleInput::default()
        };
        let result = analyze_cycle(&raw, now, &VaultConfig::default());
        assert!(matches!(result, Err(VaultError::InvalidInput(_))));
        assert!(ovulation_window(start, 28).is_err());
    }

    #[test]
    fn fertile_window_insight_only_inside_window() {
        let inside = analyze_cycle(
            &input("2025-01-01", 28, vec![]),
            noon("2025-01-08"),
            &VaultConfig::default(),
        )
        .unwrap();
        assert!(inside.insights.iter().any(|i| i.contains("fertile window")));

        let outside = analyze_cycle(
            &input("2025-01-01", 28, vec![]),
            noon("2025-01-03"),
            &VaultConfig::default(),
        )
        .unwrap();
        assert!(!outside.insights.iter().any(|i| i.contains("fertile window")));
    }
}
