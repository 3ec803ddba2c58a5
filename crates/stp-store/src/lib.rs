//! Record store contract + in-memory reference implementation for STP.
//!
//! The store owns all persistence. Engines and sync orchestrators only read
//! snapshots and issue single-row insert/patch/delete commands through the
//! [`RecordStore`] trait; there is no cross-row transaction, so every caller
//! keeps its mutations idempotent.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use stp_core::{
    AlertRecord, AlertType, Category, ClaimRecord, LeadRecord, NewJoiner, RevenueRecord,
    RevenueSource, RoiColor, RoiRecord, ScoreRecord, SyncLog, TenurePhase,
};

pub const CRATE_NAME: &str = "stp-store";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
}

impl StoreError {
    fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Partial-update payloads. A `Some` field is written; `None` leaves the
// stored value untouched.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct NewJoinerPatch {
    pub emp_id: Option<String>,
    pub name: Option<String>,
    pub department: Option<String>,
    pub manager_name: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub join_date: Option<NaiveDate>,
    pub tenure_months: Option<u32>,
    pub phase: Option<TenurePhase>,
    pub category: Option<Category>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct RevenuePatch {
    pub value: Option<f64>,
    pub is_positive: Option<bool>,
    pub source: Option<RevenueSource>,
}

#[derive(Debug, Clone, Default)]
pub struct RoiPatch {
    pub value: Option<f64>,
    pub color_code: Option<RoiColor>,
}

#[derive(Debug, Clone, Default)]
pub struct ScorePatch {
    pub score: Option<f64>,
    pub category: Option<String>,
    pub recordings_completed: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct LeadPatch {
    pub last_action_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub tat_hours: Option<f64>,
    pub tat_breached: Option<bool>,
    pub is_self_gen: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct ClaimPatch {
    pub status: Option<String>,
    pub revenue_linked: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct AlertPatch {
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
}

/// Typed get/insert/patch/delete and indexed-lookup operations per entity.
///
/// Only single-row atomicity is guaranteed. Enumeration order is the store's
/// natural (insertion) order; callers must not rely on anything stronger.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // New joiners
    async fn list_new_joiners(&self) -> StoreResult<Vec<NewJoiner>>;
    async fn get_new_joiner(&self, id: Uuid) -> StoreResult<Option<NewJoiner>>;
    async fn find_new_joiner_by_emp_id(&self, emp_id: &str) -> StoreResult<Option<NewJoiner>>;
    async fn find_new_joiner_by_name(&self, name: &str) -> StoreResult<Option<NewJoiner>>;
    async fn insert_new_joiner(&self, row: NewJoiner) -> StoreResult<()>;
    async fn patch_new_joiner(&self, id: Uuid, patch: NewJoinerPatch) -> StoreResult<()>;
    /// Deletes the rep and every dependent row in every table.
    async fn purge_new_joiner(&self, id: Uuid) -> StoreResult<()>;

    // Monthly net revenue
    async fn revenue_for(&self, nj_id: Uuid) -> StoreResult<Vec<RevenueRecord>>;
    async fn find_revenue(
        &self,
        nj_id: Uuid,
        year: i32,
        month: u32,
    ) -> StoreResult<Option<RevenueRecord>>;
    async fn insert_revenue(&self, row: RevenueRecord) -> StoreResult<()>;
    async fn patch_revenue(&self, id: Uuid, patch: RevenuePatch) -> StoreResult<()>;

    // Weekly ROI
    async fn roi_for(&self, nj_id: Uuid) -> StoreResult<Vec<RoiRecord>>;
    async fn find_roi(&self, nj_id: Uuid, week_start: NaiveDate)
        -> StoreResult<Option<RoiRecord>>;
    async fn insert_roi(&self, row: RoiRecord) -> StoreResult<()>;
    async fn patch_roi(&self, id: Uuid, patch: RoiPatch) -> StoreResult<()>;

    // Call-quality scores
    async fn scores_for(&self, nj_id: Uuid) -> StoreResult<Vec<ScoreRecord>>;
    async fn find_score(&self, nj_id: Uuid, date: NaiveDate) -> StoreResult<Option<ScoreRecord>>;
    async fn insert_score(&self, row: ScoreRecord) -> StoreResult<()>;
    async fn patch_score(&self, id: Uuid, patch: ScorePatch) -> StoreResult<()>;

    // Leads
    async fn leads_for(&self, nj_id: Uuid) -> StoreResult<Vec<LeadRecord>>;
    async fn find_lead(&self, nj_id: Uuid, lead_id: &str) -> StoreResult<Option<LeadRecord>>;
    async fn insert_lead(&self, row: LeadRecord) -> StoreResult<()>;
    async fn patch_lead(&self, id: Uuid, patch: LeadPatch) -> StoreResult<()>;

    // Corporate claims
    async fn claims_for(&self, nj_id: Uuid) -> StoreResult<Vec<ClaimRecord>>;
    async fn find_claim(
        &self,
        nj_id: Uuid,
        corporate_name: &str,
        claim_date: NaiveDate,
    ) -> StoreResult<Option<ClaimRecord>>;
    async fn insert_claim(&self, row: ClaimRecord) -> StoreResult<()>;
    async fn patch_claim(&self, id: Uuid, patch: ClaimPatch) -> StoreResult<()>;

    // Alerts
    async fn list_alerts(&self) -> StoreResult<Vec<AlertRecord>>;
    async fn alerts_for(&self, nj_id: Uuid) -> StoreResult<Vec<AlertRecord>>;
    async fn get_alert(&self, id: Uuid) -> StoreResult<Option<AlertRecord>>;
    async fn find_alert(
        &self,
        nj_id: Uuid,
        alert_type: AlertType,
    ) -> StoreResult<Option<AlertRecord>>;
    async fn insert_alert(&self, row: AlertRecord) -> StoreResult<()>;
    async fn patch_alert(&self, id: Uuid, patch: AlertPatch) -> StoreResult<()>;

    // Sync logs
    async fn list_sync_logs(&self) -> StoreResult<Vec<SyncLog>>;
    async fn get_sync_log(&self, module: &str) -> StoreResult<Option<SyncLog>>;
    /// Keyed by module name: replaces the existing row, never duplicates.
    async fn upsert_sync_log(&self, row: SyncLog) -> StoreResult<()>;
}

#[derive(Debug, Default)]
struct Tables {
    new_joiners: Vec<NewJoiner>,
    revenue: Vec<RevenueRecord>,
    roi: Vec<RoiRecord>,
    scores: Vec<ScoreRecord>,
    leads: Vec<LeadRecord>,
    claims: Vec<ClaimRecord>,
    alerts: Vec<AlertRecord>,
    sync_logs: Vec<SyncLog>,
}

/// In-memory [`RecordStore`]. Rows keep insertion order; every operation
/// takes the table lock once, which gives the single-row atomicity the
/// engines rely on.
#[derive(Debug, Default)]
pub struct MemStore {
    tables: RwLock<Tables>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemStore {
    async fn list_new_joiners(&self) -> StoreResult<Vec<NewJoiner>> {
        Ok(self.tables.read().await.new_joiners.clone())
    }

    async fn get_new_joiner(&self, id: Uuid) -> StoreResult<Option<NewJoiner>> {
        Ok(self
            .tables
            .read()
            .await
            .new_joiners
            .iter()
            .find(|nj| nj.id == id)
            .cloned())
    }

    async fn find_new_joiner_by_emp_id(&self, emp_id: &str) -> StoreResult<Option<NewJoiner>> {
        Ok(self
            .tables
            .read()
            .await
            .new_joiners
            .iter()
            .find(|nj| nj.emp_id.as_deref() == Some(emp_id))
            .cloned())
    }

    async fn find_new_joiner_by_name(&self, name: &str) -> StoreResult<Option<NewJoiner>> {
        Ok(self
            .tables
            .read()
            .await
            .new_joiners
            .iter()
            .find(|nj| nj.name == name)
            .cloned())
    }

    async fn insert_new_joiner(&self, row: NewJoiner) -> StoreResult<()> {
        self.tables.write().await.new_joiners.push(row);
        Ok(())
    }

    async fn patch_new_joiner(&self, id: Uuid, patch: NewJoinerPatch) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let row = tables
            .new_joiners
            .iter_mut()
            .find(|nj| nj.id == id)
            .ok_or_else(|| StoreError::not_found("new_joiner", id))?;
        if let Some(emp_id) = patch.emp_id {
            row.emp_id = Some(emp_id);
        }
        if let Some(name) = patch.name {
            row.name = name;
        }
        if let Some(department) = patch.department {
            row.department = Some(department);
        }
        if let Some(manager_name) = patch.manager_name {
            row.manager_name = Some(manager_name);
        }
        if let Some(location) = patch.location {
            row.location = Some(location);
        }
        if let Some(email) = patch.email {
            row.email = Some(email);
        }
        if let Some(join_date) = patch.join_date {
            row.join_date = join_date;
        }
        if let Some(tenure_months) = patch.tenure_months {
            row.tenure_months = tenure_months;
        }
        if let Some(phase) = patch.phase {
            row.phase = phase;
        }
        if let Some(category) = patch.category {
            row.category = category;
        }
        if let Some(active) = patch.active {
            row.active = active;
        }
        Ok(())
    }

    async fn purge_new_joiner(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let before = tables.new_joiners.len();
        tables.new_joiners.retain(|nj| nj.id != id);
        if tables.new_joiners.len() == before {
            return Err(StoreError::not_found("new_joiner", id));
        }
        tables.revenue.retain(|r| r.nj_id != id);
        tables.roi.retain(|r| r.nj_id != id);
        tables.scores.retain(|r| r.nj_id != id);
        tables.leads.retain(|r| r.nj_id != id);
        tables.claims.retain(|r| r.nj_id != id);
        tables.alerts.retain(|r| r.nj_id != id);
        debug!(%id, "purged rep and all dependent rows");
        Ok(())
    }

    async fn revenue_for(&self, nj_id: Uuid) -> StoreResult<Vec<RevenueRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .revenue
            .iter()
            .filter(|r| r.nj_id == nj_id)
            .cloned()
            .collect())
    }

    async fn find_revenue(
        &self,
        nj_id: Uuid,
        year: i32,
        month: u32,
    ) -> StoreResult<Option<RevenueRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .revenue
            .iter()
            .find(|r| r.nj_id == nj_id && r.year == year && r.month == month)
            .cloned())
    }

    async fn insert_revenue(&self, row: RevenueRecord) -> StoreResult<()> {
        self.tables.write().await.revenue.push(row);
        Ok(())
    }

    async fn patch_revenue(&self, id: Uuid, patch: RevenuePatch) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let row = tables
            .revenue
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::not_found("revenue_record", id))?;
        if let Some(value) = patch.value {
            row.value = value;
        }
        if let Some(is_positive) = patch.is_positive {
            row.is_positive = is_positive;
        }
        if let Some(source) = patch.source {
            row.source = source;
        }
        Ok(())
    }

    async fn roi_for(&self, nj_id: Uuid) -> StoreResult<Vec<RoiRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .roi
            .iter()
            .filter(|r| r.nj_id == nj_id)
            .cloned()
            .collect())
    }

    async fn find_roi(
        &self,
        nj_id: Uuid,
        week_start: NaiveDate,
    ) -> StoreResult<Option<RoiRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .roi
            .iter()
            .find(|r| r.nj_id == nj_id && r.week_start == week_start)
            .cloned())
    }

    async fn insert_roi(&self, row: RoiRecord) -> StoreResult<()> {
        self.tables.write().await.roi.push(row);
        Ok(())
    }

    async fn patch_roi(&self, id: Uuid, patch: RoiPatch) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let row = tables
            .roi
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::not_found("roi_record", id))?;
        if let Some(value) = patch.value {
            row.value = value;
        }
        if let Some(color_code) = patch.color_code {
            row.color_code = color_code;
        }
        Ok(())
    }

    async fn scores_for(&self, nj_id: Uuid) -> StoreResult<Vec<ScoreRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .scores
            .iter()
            .filter(|r| r.nj_id == nj_id)
            .cloned()
            .collect())
    }

    async fn find_score(&self, nj_id: Uuid, date: NaiveDate) -> StoreResult<Option<ScoreRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .scores
            .iter()
            .find(|r| r.nj_id == nj_id && r.date == date)
            .cloned())
    }

    async fn insert_score(&self, row: ScoreRecord) -> StoreResult<()> {
        self.tables.write().await.scores.push(row);
        Ok(())
    }

    async fn patch_score(&self, id: Uuid, patch: ScorePatch) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let row = tables
            .scores
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::not_found("score_record", id))?;
        if let Some(score) = patch.score {
            row.score = score;
        }
        if let Some(category) = patch.category {
            row.category = Some(category);
        }
        if let Some(recordings_completed) = patch.recordings_completed {
            row.recordings_completed = recordings_completed;
        }
        Ok(())
    }

    async fn leads_for(&self, nj_id: Uuid) -> StoreResult<Vec<LeadRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .leads
            .iter()
            .filter(|r| r.nj_id == nj_id)
            .cloned()
            .collect())
    }

    async fn find_lead(&self, nj_id: Uuid, lead_id: &str) -> StoreResult<Option<LeadRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .leads
            .iter()
            .find(|r| r.nj_id == nj_id && r.lead_id == lead_id)
            .cloned())
    }

    async fn insert_lead(&self, row: LeadRecord) -> StoreResult<()> {
        self.tables.write().await.leads.push(row);
        Ok(())
    }

    async fn patch_lead(&self, id: Uuid, patch: LeadPatch) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let row = tables
            .leads
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::not_found("lead_record", id))?;
        if let Some(last_action_date) = patch.last_action_date {
            row.last_action_date = Some(last_action_date);
        }
        if let Some(status) = patch.status {
            row.status = status;
        }
        if let Some(tat_hours) = patch.tat_hours {
            row.tat_hours = Some(tat_hours);
        }
        if let Some(tat_breached) = patch.tat_breached {
            row.tat_breached = tat_breached;
        }
        if let Some(is_self_gen) = patch.is_self_gen {
            row.is_self_gen = is_self_gen;
        }
        Ok(())
    }

    async fn claims_for(&self, nj_id: Uuid) -> StoreResult<Vec<ClaimRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .claims
            .iter()
            .filter(|r| r.nj_id == nj_id)
            .cloned()
            .collect())
    }

    async fn find_claim(
        &self,
        nj_id: Uuid,
        corporate_name: &str,
        claim_date: NaiveDate,
    ) -> StoreResult<Option<ClaimRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .claims
            .iter()
            .find(|r| {
                r.nj_id == nj_id && r.corporate_name == corporate_name && r.claim_date == claim_date
            })
            .cloned())
    }

    async fn insert_claim(&self, row: ClaimRecord) -> StoreResult<()> {
        self.tables.write().await.claims.push(row);
        Ok(())
    }

    async fn patch_claim(&self, id: Uuid, patch: ClaimPatch) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let row = tables
            .claims
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::not_found("claim_record", id))?;
        if let Some(status) = patch.status {
            row.status = status;
        }
        if let Some(revenue_linked) = patch.revenue_linked {
            row.revenue_linked = Some(revenue_linked);
        }
        Ok(())
    }

    async fn list_alerts(&self) -> StoreResult<Vec<AlertRecord>> {
        Ok(self.tables.read().await.alerts.clone())
    }

    async fn alerts_for(&self, nj_id: Uuid) -> StoreResult<Vec<AlertRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .alerts
            .iter()
            .filter(|a| a.nj_id == nj_id)
            .cloned()
            .collect())
    }

    async fn get_alert(&self, id: Uuid) -> StoreResult<Option<AlertRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .alerts
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn find_alert(
        &self,
        nj_id: Uuid,
        alert_type: AlertType,
    ) -> StoreResult<Option<AlertRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .alerts
            .iter()
            .find(|a| a.nj_id == nj_id && a.alert_type == alert_type)
            .cloned())
    }

    async fn insert_alert(&self, row: AlertRecord) -> StoreResult<()> {
        self.tables.write().await.alerts.push(row);
        Ok(())
    }

    async fn patch_alert(&self, id: Uuid, patch: AlertPatch) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let row = tables
            .alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StoreError::not_found("alert_record", id))?;
        if let Some(acknowledged_at) = patch.acknowledged_at {
            row.acknowledged_at = Some(acknowledged_at);
        }
        if let Some(acknowledged_by) = patch.acknowledged_by {
            row.acknowledged_by = Some(acknowledged_by);
        }
        Ok(())
    }

    async fn list_sync_logs(&self) -> StoreResult<Vec<SyncLog>> {
        Ok(self.tables.read().await.sync_logs.clone())
    }

    async fn get_sync_log(&self, module: &str) -> StoreResult<Option<SyncLog>> {
        Ok(self
            .tables
            .read()
            .await
            .sync_logs
            .iter()
            .find(|l| l.module == module)
            .cloned())
    }

    async fn upsert_sync_log(&self, row: SyncLog) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.sync_logs.iter_mut().find(|l| l.module == row.module) {
            Some(existing) => *existing = row,
            None => tables.sync_logs.push(row),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use stp_core::SyncStatus;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).single().unwrap()
    }

    fn mk_nj(name: &str, emp_id: &str) -> NewJoiner {
        NewJoiner {
            id: Uuid::new_v4(),
            emp_id: Some(emp_id.to_string()),
            name: name.to_string(),
            department: None,
            manager_name: None,
            location: None,
            email: None,
            join_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            tenure_months: 2,
            phase: TenurePhase::Training,
            category: Category::Uncategorised,
            active: true,
            created_at: now(),
        }
    }

    #[tokio::test]
    async fn natural_key_lookups_find_rows() {
        let store = MemStore::new();
        let nj = mk_nj("Asha Pillai", "E1001");
        store.insert_new_joiner(nj.clone()).await.unwrap();

        let by_emp = store.find_new_joiner_by_emp_id("E1001").await.unwrap();
        assert_eq!(by_emp.as_ref().map(|n| n.id), Some(nj.id));
        let by_name = store.find_new_joiner_by_name("Asha Pillai").await.unwrap();
        assert_eq!(by_name.map(|n| n.id), Some(nj.id));
        assert!(store
            .find_new_joiner_by_emp_id("E9999")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn patch_applies_only_provided_fields() {
        let store = MemStore::new();
        let nj = mk_nj("Asha Pillai", "E1001");
        store.insert_new_joiner(nj.clone()).await.unwrap();

        store
            .patch_new_joiner(
                nj.id,
                NewJoinerPatch {
                    category: Some(Category::Performer),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stored = store.get_new_joiner(nj.id).await.unwrap().unwrap();
        assert_eq!(stored.category, Category::Performer);
        assert_eq!(stored.name, "Asha Pillai");
        assert_eq!(stored.tenure_months, 2);
    }

    #[tokio::test]
    async fn patch_missing_row_is_not_found() {
        let store = MemStore::new();
        let err = store
            .patch_new_joiner(Uuid::new_v4(), NewJoinerPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "new_joiner", .. }));
    }

    #[tokio::test]
    async fn purge_cascades_to_every_dependent_table() {
        let store = MemStore::new();
        let nj = mk_nj("Asha Pillai", "E1001");
        let nj_id = nj.id;
        store.insert_new_joiner(nj).await.unwrap();
        store
            .insert_revenue(RevenueRecord {
                id: Uuid::new_v4(),
                nj_id,
                year: 2026,
                month: 3,
                value: 1200.0,
                is_positive: true,
                source: RevenueSource::Synced,
            })
            .await
            .unwrap();
        store
            .insert_roi(RoiRecord {
                id: Uuid::new_v4(),
                nj_id,
                week_start: NaiveDate::from_ymd_opt(2026, 3, 23).unwrap(),
                value: 1.4,
                color_code: RoiColor::Green,
            })
            .await
            .unwrap();
        store
            .insert_score(ScoreRecord {
                id: Uuid::new_v4(),
                nj_id,
                date: NaiveDate::from_ymd_opt(2026, 3, 20).unwrap(),
                score: 82.0,
                category: None,
                recordings_completed: 4,
            })
            .await
            .unwrap();
        store
            .insert_lead(LeadRecord {
                id: Uuid::new_v4(),
                nj_id,
                lead_id: "L-1".to_string(),
                allocated_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                last_action_date: None,
                status: "open".to_string(),
                tat_hours: None,
                tat_breached: false,
                is_self_gen: false,
            })
            .await
            .unwrap();
        store
            .insert_claim(ClaimRecord {
                id: Uuid::new_v4(),
                nj_id,
                corporate_name: "Acme Corp".to_string(),
                claim_date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
                status: "approved".to_string(),
                revenue_linked: Some(5000.0),
            })
            .await
            .unwrap();
        store
            .insert_alert(AlertRecord {
                id: Uuid::new_v4(),
                nj_id,
                alert_type: AlertType::Pa,
                triggered_at: now(),
                acknowledged_at: None,
                acknowledged_by: None,
            })
            .await
            .unwrap();

        store.purge_new_joiner(nj_id).await.unwrap();

        assert!(store.get_new_joiner(nj_id).await.unwrap().is_none());
        assert!(store.revenue_for(nj_id).await.unwrap().is_empty());
        assert!(store.roi_for(nj_id).await.unwrap().is_empty());
        assert!(store.scores_for(nj_id).await.unwrap().is_empty());
        assert!(store.leads_for(nj_id).await.unwrap().is_empty());
        assert!(store.claims_for(nj_id).await.unwrap().is_empty());
        assert!(store.alerts_for(nj_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sync_log_upsert_replaces_by_module_name() {
        let store = MemStore::new();
        store
            .upsert_sync_log(SyncLog {
                module: "revenue".to_string(),
                status: SyncStatus::Running,
                last_sync_at: now(),
                error_message: None,
                records_processed: None,
            })
            .await
            .unwrap();
        store
            .upsert_sync_log(SyncLog {
                module: "revenue".to_string(),
                status: SyncStatus::Success,
                last_sync_at: now(),
                error_message: None,
                records_processed: Some(12),
            })
            .await
            .unwrap();

        let logs = store.list_sync_logs().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, SyncStatus::Success);
        assert_eq!(logs[0].records_processed, Some(12));
    }
}
