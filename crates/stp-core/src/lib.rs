//! Core domain model, normalized provider drafts, and recency utilities for STP.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CRATE_NAME: &str = "stp-core";

/// Onboarding phase, a pure function of tenure in months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TenurePhase {
    Orientation,
    Training,
    Field,
    Graduated,
}

impl TenurePhase {
    pub fn from_tenure_months(tenure_months: u32) -> Self {
        if tenure_months < 1 {
            Self::Orientation
        } else if tenure_months < 3 {
            Self::Training
        } else if tenure_months < 6 {
            Self::Field
        } else {
            Self::Graduated
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Orientation => "Orientation",
            Self::Training => "Training",
            Self::Field => "Field",
            Self::Graduated => "Graduated",
        }
    }
}

/// Performance classification derived from the latest NR/ROI signals.
///
/// Downstream dashboard filters match on the serialized labels, so the
/// labels are part of the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Developed,
    Performer,
    #[serde(rename = "Performance Falling")]
    PerformanceFalling,
    #[serde(rename = "Non-Performer")]
    NonPerformer,
    Uncategorised,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Developed => "Developed",
            Self::Performer => "Performer",
            Self::PerformanceFalling => "Performance Falling",
            Self::NonPerformer => "Non-Performer",
            Self::Uncategorised => "Uncategorised",
        }
    }
}

/// Escalation alert types fired at increasing tenure thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertType {
    #[serde(rename = "PA")]
    Pa,
    #[serde(rename = "PIP")]
    Pip,
    #[serde(rename = "EXIT")]
    Exit,
}

impl AlertType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pa => "PA",
            Self::Pip => "PIP",
            Self::Exit => "EXIT",
        }
    }
}

/// Four-tier weekly ROI color code as mapped by the providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoiColor {
    Green,
    Black,
    Red,
    Yellow,
}

impl RoiColor {
    /// Green and Black both count as the "positive" tier for categorization.
    pub fn is_positive_tier(&self) -> bool {
        matches!(self, Self::Green | Self::Black)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Running,
    Success,
    Error,
}

/// Provenance of a revenue row: synced from a provider or entered by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevenueSource {
    Synced,
    Manual,
}

/// One row per trainee sales rep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJoiner {
    pub id: Uuid,
    /// External employee id; the natural key for provider reconciliation.
    pub emp_id: Option<String>,
    pub name: String,
    pub department: Option<String>,
    pub manager_name: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub join_date: NaiveDate,
    pub tenure_months: u32,
    pub phase: TenurePhase,
    pub category: Category,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Monthly net revenue. Natural key: (nj_id, year, month).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueRecord {
    pub id: Uuid,
    pub nj_id: Uuid,
    pub year: i32,
    pub month: u32,
    pub value: f64,
    pub is_positive: bool,
    pub source: RevenueSource,
}

/// Weekly ROI. Natural key: (nj_id, week_start), Monday-aligned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiRecord {
    pub id: Uuid,
    pub nj_id: Uuid,
    pub week_start: NaiveDate,
    pub value: f64,
    pub color_code: RoiColor,
}

/// Call-quality score. Natural key: (nj_id, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub id: Uuid,
    pub nj_id: Uuid,
    pub date: NaiveDate,
    pub score: f64,
    pub category: Option<String>,
    pub recordings_completed: u32,
}

/// Allocated lead. Natural key: (nj_id, lead_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub id: Uuid,
    pub nj_id: Uuid,
    pub lead_id: String,
    pub allocated_date: NaiveDate,
    pub last_action_date: Option<NaiveDate>,
    pub status: String,
    pub tat_hours: Option<f64>,
    pub tat_breached: bool,
    pub is_self_gen: bool,
}

/// Corporate claim. Natural key: (nj_id, corporate_name, claim_date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub id: Uuid,
    pub nj_id: Uuid,
    pub corporate_name: String,
    pub claim_date: NaiveDate,
    pub status: String,
    pub revenue_linked: Option<f64>,
}

/// Escalation alert. At most one row per (nj_id, alert_type), acknowledged
/// or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: Uuid,
    pub nj_id: Uuid,
    pub alert_type: AlertType,
    pub triggered_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
}

/// Durable per-module sync status. Natural key: module name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncLog {
    pub module: String,
    pub status: SyncStatus,
    pub last_sync_at: DateTime<Utc>,
    pub error_message: Option<String>,
    pub records_processed: Option<usize>,
}

// ---------------------------------------------------------------------------
// Normalized provider drafts.
//
// Every provider variant adapts its raw payload into these shapes at its own
// boundary; provider-specific fields never reach the sync or engine layers.
// `nj_key` is the external employee id, or the rep's full name for providers
// that lack a stable id (name matching is a fallback path only).
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJoinerDraft {
    pub emp_id: String,
    pub name: String,
    pub department: Option<String>,
    pub manager_name: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub join_date: NaiveDate,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDraft {
    pub nj_key: String,
    pub date: NaiveDate,
    pub score: f64,
    pub category: Option<String>,
    pub recordings_completed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadDraft {
    pub nj_key: String,
    pub lead_id: String,
    pub allocated_date: NaiveDate,
    pub last_action_date: Option<NaiveDate>,
    pub status: String,
    pub tat_hours: Option<f64>,
    pub tat_breached: bool,
    pub is_self_gen: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueDraft {
    pub nj_key: String,
    pub month: u32,
    pub year: i32,
    pub value: f64,
    pub source: RevenueSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiDraft {
    pub nj_key: String,
    pub week_start: NaiveDate,
    pub value: f64,
    pub color_code: RoiColor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimDraft {
    pub nj_key: String,
    pub corporate_name: String,
    pub claim_date: NaiveDate,
    pub status: String,
    pub revenue_linked: Option<f64>,
}

// ---------------------------------------------------------------------------
// Shared recency and date utilities.
// ---------------------------------------------------------------------------

/// Tenure as a flat 30-day-month floor, never negative. Not calendar-aware.
pub fn tenure_months(join_date: NaiveDate, today: NaiveDate) -> u32 {
    let days = (today - join_date).num_days().max(0);
    (days / 30) as u32
}

/// The previous wall-clock month, independent of data availability.
/// January wraps to December of the prior year.
pub fn previous_calendar_month(today: NaiveDate) -> (i32, u32) {
    match today.month() {
        1 => (today.year() - 1, 12),
        m => (today.year(), m - 1),
    }
}

/// Revenue rows ordered most recent calendar month first
/// (year descending, then month descending).
pub fn revenue_by_recency(records: &[RevenueRecord]) -> Vec<&RevenueRecord> {
    let mut sorted: Vec<&RevenueRecord> = records.iter().collect();
    sorted.sort_by(|a, b| (b.year, b.month).cmp(&(a.year, a.month)));
    sorted
}

/// The ROI row with the latest week start, regardless of insertion order.
pub fn most_recent_roi(records: &[RoiRecord]) -> Option<&RoiRecord> {
    records.iter().max_by_key(|r| r.week_start)
}
