//! Core records for the vault: appointments, provider rollups and cycle analysis.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CYCLE_LENGTH: u32 = 28;
pub const DEFAULT_PERIOD_LENGTH: u32 = 5;
/// Longest cycle or period length (days) accepted from user input.
pub const MAX_LENGTH_DAYS: u32 = 365;

/// Defaults applied when cycle settings are missing or unusable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VaultConfig {
    /// Cycle length (days) used when the user has not configured one.
    pub default_cycle_length: u32,
    /// Period length (days) used when the user has not configured one.
    pub default_period_length: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            default_cycle_length: DEFAULT_CYCLE_LENGTH,
            default_period_length: DEFAULT_PERIOD_LENGTH,
        }
    }
}

impl VaultConfig {
    /// Replace zero or out-of-range values with the built-in defaults.
    pub fn validated(mut self) -> Self {
        if !(1..=MAX_LENGTH_DAYS).contains(&self.default_cycle_length) {
            self.default_cycle_length = DEFAULT_CYCLE_LENGTH;
        }
        if !(1..=MAX_LENGTH_DAYS).contains(&self.default_period_length) {
            self.default_period_length = DEFAULT_PERIOD_LENGTH;
        }
        self
    }
}

/// Kind of visit, as entered in the appointment form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentType {
    Checkup,
    FollowUp,
    Consultation,
    Procedure,
    Lab,
    Imaging,
    #[serde(other)]
    Other,
}

impl AppointmentType {
    /// Map a form value onto a type. Unknown values become `Other`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "checkup" => Self::Checkup,
            "follow-up" | "followup" => Self::FollowUp,
            "consultation" => Self::Consultation,
            "procedure" => Self::Procedure,
            "lab" => Self::Lab,
            "imaging" => Self::Imaging,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Some(Self::Scheduled),
            "completed" => Some(Self::Completed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// A single appointment record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    /// Grouping key for provider rollups. Compared byte for byte.
    pub provider_name: String,
    pub provider_specialty: Option<String>,
    pub appointment_date: DateTime<Utc>,
    pub appointment_type: AppointmentType,
    #[serde(default)]
    pub status: AppointmentStatus,
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// Per-provider aggregate derived from the full appointment list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRollup {
    pub appointments: Vec<Appointment>,
    pub count: usize,
    pub last_visit: Option<DateTime<Utc>>,
    pub next_visit: Option<DateTime<Utc>>,
}

/// Appointments bucketed relative to an evaluation instant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentOverview {
    /// Soonest first.
    pub upcoming: Vec<Appointment>,
    /// Most recent first.
    pub past: Vec<Appointment>,
    pub by_provider: BTreeMap<String, ProviderRollup>,
}

impl AppointmentOverview {
    pub fn next_appointment(&self) -> Option<&Appointment> {
        self.upcoming.first()
    }

    pub fn most_recent_visit(&self) -> Option<&Appointment> {
        self.past.first()
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderRollup> {
        self.by_provider.get(name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FlowLevel {
    Light,
    Medium,
    Heavy,
}

impl FlowLevel {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Self::Light),
            "medium" => Some(Self::Medium),
            "heavy" => Some(Self::Heavy),
            _ => None,
        }
    }
}

/// One logged period day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CycleEntry {
    pub date: NaiveDate,
    pub flow: FlowLevel,
    #[serde(default)]
    pub symptoms: BTreeSet<String>,
    #[serde(default)]
    pub notes: String,
}

/// Everything the cycle predictor needs, already validated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CycleInput {
    pub last_period_start: Option<NaiveDate>,
    pub cycle_length: u32,
    pub period_length: u32,
    #[serde(default)]
    pub entries: Vec<CycleEntry>,
}

impl Default for CycleInput {
    fn default() -> Self {
        Self {
            last_period_start: None,
            cycle_length: DEFAULT_CYCLE_LENGTH,
            period_length: DEFAULT_PERIOD_LENGTH,
            entries: Vec::new(),
        }
    }
}

/// Inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Consistency of cycle starts, most regular first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Regularity {
    #[serde(rename = "Very Regular")]
    VeryRegular,
    #[serde(rename = "Regular")]
    Regular,
    #[serde(rename = "Irregular")]
    Irregular,
    #[serde(rename = "Very Irregular")]
    VeryIrregular,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Regularity {
    pub fn label(self) -> &'static str {
        match self {
            Self::VeryRegular => "Very Regular",
            Self::Regular => "Regular",
            Self::Irregular => "Irregular",
            Self::VeryIrregular => "Very Irregular",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Regularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CycleHealth {
    #[serde(rename = "Healthy")]
    Healthy,
    #[serde(rename = "Needs Attention")]
    NeedsAttention,
    #[serde(rename = "Tracking")]
    Tracking,
}

impl CycleHealth {
    pub fn label(self) -> &'static str {
        match self {
            Self::Healthy => "Healthy",
            Self::NeedsAttention => "Needs Attention",
            Self::Tracking => "Tracking",
        }
    }
}

impl fmt::Display for CycleHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Menstrual,
    Follicular,
    Ovulation,
    Luteal,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Menstrual => "menstrual",
            Self::Follicular => "follicular",
            Self::Ovulation => "ovulation",
            Self::Luteal => "luteal",
        })
    }
}

/// Result of the cycle predictor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CycleAnalysis {
    pub current_cycle_day: i64,
    pub phase: CyclePhase,
    /// The configured cycle length.
    pub average_length: u32,
    /// Mean gap between logged entries, when enough history exists.
    pub observed_average_length: Option<f64>,
    /// Population standard deviation of those gaps.
    pub cycle_variation: Option<f64>,
    pub regularity: Regularity,
    pub cycle_health: CycleHealth,
    pub predicted_next_period: NaiveDate,
    /// Negative once the predicted date has passed.
    pub days_until_next_period: i64,
    pub ovulation_window: DateWindow,
    pub fertile_window: DateWindow,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Errors shared by every vault crate.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("Input is missing required data")]
    MissingData,
    #[error("Could not read input: {0}")]
    Parse(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
