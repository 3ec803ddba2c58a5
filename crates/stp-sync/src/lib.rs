//! Sync orchestration: per-domain fetch + upsert with a durable SyncLog.
//!
//! Every module run follows the same state machine: the SyncLog row is
//! patched to `running` on entry, then to `success` with a processed count or
//! to `error` with the stringified cause, and on failure the error is
//! re-raised so the scheduler sees it. Overlapping runs are not prevented;
//! the `running` status is observability only, and every upsert is
//! idempotent.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use stp_core::{
    tenure_months, Category, ClaimDraft, ClaimRecord, LeadDraft, LeadRecord, NewJoiner,
    NewJoinerDraft, RevenueDraft, RevenueRecord, RoiDraft, RoiRecord, ScoreDraft, ScoreRecord,
    SyncLog, SyncStatus, TenurePhase,
};
use stp_engines::evaluate_categories;
use stp_providers::DataProvider;
use stp_store::{
    ClaimPatch, LeadPatch, NewJoinerPatch, RecordStore, RevenuePatch, RoiPatch, ScorePatch,
};

pub const CRATE_NAME: &str = "stp-sync";

pub const MODULE_NEW_JOINERS: &str = "new_joiners";
pub const MODULE_SCORES: &str = "scores";
pub const MODULE_LEADS: &str = "leads";
pub const MODULE_REVENUE: &str = "revenue";
pub const MODULE_ROI: &str = "roi";
pub const MODULE_CLAIMS: &str = "claims";

pub const ALL_MODULES: [&str; 6] = [
    MODULE_NEW_JOINERS,
    MODULE_SCORES,
    MODULE_LEADS,
    MODULE_REVENUE,
    MODULE_ROI,
    MODULE_CLAIMS,
];

/// Per-run summary for one sync module.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub module: &'static str,
    pub fetched: usize,
    pub upserted: usize,
    /// Records dropped because they referenced an unprovisioned rep.
    pub skipped: usize,
}

impl SyncOutcome {
    fn new(module: &'static str) -> Self {
        Self {
            module,
            fetched: 0,
            upserted: 0,
            skipped: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Rep resolution + per-entity upsert mutators
// ---------------------------------------------------------------------------

/// Resolves a provider record to a rep: stable external id first, exact-name
/// match as a fallback for providers without one.
async fn resolve_nj(store: &dyn RecordStore, nj_key: &str) -> Result<Option<NewJoiner>> {
    if let Some(nj) = store.find_new_joiner_by_emp_id(nj_key).await? {
        return Ok(Some(nj));
    }
    Ok(store.find_new_joiner_by_name(nj_key).await?)
}

/// Merges a roster record: patch by external id (or name) when provisioned,
/// insert otherwise. New reps start Uncategorised until the engines run.
pub async fn upsert_new_joiner(
    store: &dyn RecordStore,
    draft: &NewJoinerDraft,
    now: DateTime<Utc>,
) -> Result<()> {
    let existing = match store.find_new_joiner_by_emp_id(&draft.emp_id).await? {
        Some(nj) => Some(nj),
        None => store.find_new_joiner_by_name(&draft.name).await?,
    };

    match existing {
        Some(nj) => {
            store
                .patch_new_joiner(
                    nj.id,
                    NewJoinerPatch {
                        emp_id: Some(draft.emp_id.clone()),
                        name: Some(draft.name.clone()),
                        department: draft.department.clone(),
                        manager_name: draft.manager_name.clone(),
                        location: draft.location.clone(),
                        email: draft.email.clone(),
                        join_date: Some(draft.join_date),
                        active: Some(draft.active),
                        ..Default::default()
                    },
                )
                .await
                .with_context(|| format!("patching rep {}", draft.emp_id))?;
        }
        None => {
            let tenure = tenure_months(draft.join_date, now.date_naive());
            store
                .insert_new_joiner(NewJoiner {
                    id: Uuid::new_v4(),
                    emp_id: Some(draft.emp_id.clone()),
                    name: draft.name.clone(),
                    department: draft.department.clone(),
                    manager_name: draft.manager_name.clone(),
                    location: draft.location.clone(),
                    email: draft.email.clone(),
                    join_date: draft.join_date,
                    tenure_months: tenure,
                    phase: TenurePhase::from_tenure_months(tenure),
                    category: Category::Uncategorised,
                    active: draft.active,
                    created_at: now,
                })
                .await
                .with_context(|| format!("inserting rep {}", draft.emp_id))?;
        }
    }
    Ok(())
}

/// Returns false when the record was dropped for lack of a matching rep.
pub async fn upsert_revenue(store: &dyn RecordStore, draft: &RevenueDraft) -> Result<bool> {
    let Some(nj) = resolve_nj(store, &draft.nj_key).await? else {
        debug!(nj_key = %draft.nj_key, "revenue record references an unprovisioned rep; dropping");
        return Ok(false);
    };
    // The sign is always recomputed from the value, whatever the provider said.
    let is_positive = draft.value > 0.0;
    match store.find_revenue(nj.id, draft.year, draft.month).await? {
        Some(existing) => {
            store
                .patch_revenue(
                    existing.id,
                    RevenuePatch {
                        value: Some(draft.value),
                        is_positive: Some(is_positive),
                        source: Some(draft.source),
                    },
                )
                .await?
        }
        None => {
            store
                .insert_revenue(RevenueRecord {
                    id: Uuid::new_v4(),
                    nj_id: nj.id,
                    year: draft.year,
                    month: draft.month,
                    value: draft.value,
                    is_positive,
                    source: draft.source,
                })
                .await?
        }
    }
    Ok(true)
}

pub async fn upsert_roi(store: &dyn RecordStore, draft: &RoiDraft) -> Result<bool> {
    let Some(nj) = resolve_nj(store, &draft.nj_key).await? else {
        debug!(nj_key = %draft.nj_key, "roi record references an unprovisioned rep; dropping");
        return Ok(false);
    };
    match store.find_roi(nj.id, draft.week_start).await? {
        Some(existing) => {
            store
                .patch_roi(
                    existing.id,
                    RoiPatch {
                        value: Some(draft.value),
                        color_code: Some(draft.color_code),
                    },
                )
                .await?
        }
        None => {
            store
                .insert_roi(RoiRecord {
                    id: Uuid::new_v4(),
                    nj_id: nj.id,
                    week_start: draft.week_start,
                    value: draft.value,
                    color_code: draft.color_code,
                })
                .await?
        }
    }
    Ok(true)
}

pub async fn upsert_score(store: &dyn RecordStore, draft: &ScoreDraft) -> Result<bool> {
    let Some(nj) = resolve_nj(store, &draft.nj_key).await? else {
        debug!(nj_key = %draft.nj_key, "score record references an unprovisioned rep; dropping");
        return Ok(false);
    };
    match store.find_score(nj.id, draft.date).await? {
        Some(existing) => {
            store
                .patch_score(
                    existing.id,
                    ScorePatch {
                        score: Some(draft.score),
                        category: draft.category.clone(),
                        recordings_completed: Some(draft.recordings_completed),
                    },
                )
                .await?
        }
        None => {
            store
                .insert_score(ScoreRecord {
                    id: Uuid::new_v4(),
                    nj_id: nj.id,
                    date: draft.date,
                    score: draft.score,
                    category: draft.category.clone(),
                    recordings_completed: draft.recordings_completed,
                })
                .await?
        }
    }
    Ok(true)
}

pub async fn upsert_lead(store: &dyn RecordStore, draft: &LeadDraft) -> Result<bool> {
    let Some(nj) = resolve_nj(store, &draft.nj_key).await? else {
        debug!(nj_key = %draft.nj_key, "lead record references an unprovisioned rep; dropping");
        return Ok(false);
    };
    match store.find_lead(nj.id, &draft.lead_id).await? {
        Some(existing) => {
            store
                .patch_lead(
                    existing.id,
                    LeadPatch {
                        last_action_date: draft.last_action_date,
                        status: Some(draft.status.clone()),
                        tat_hours: draft.tat_hours,
                        tat_breached: Some(draft.tat_breached),
                        is_self_gen: Some(draft.is_self_gen),
                    },
                )
                .await?
        }
        None => {
            store
                .insert_lead(LeadRecord {
                    id: Uuid::new_v4(),
                    nj_id: nj.id,
                    lead_id: draft.lead_id.clone(),
                    allocated_date: draft.allocated_date,
                    last_action_date: draft.last_action_date,
                    status: draft.status.clone(),
                    tat_hours: draft.tat_hours,
                    tat_breached: draft.tat_breached,
                    is_self_gen: draft.is_self_gen,
                })
                .await?
        }
    }
    Ok(true)
}

pub async fn upsert_claim(store: &dyn RecordStore, draft: &ClaimDraft) -> Result<bool> {
    let Some(nj) = resolve_nj(store, &draft.nj_key).await? else {
        debug!(nj_key = %draft.nj_key, "claim record references an unprovisioned rep; dropping");
        return Ok(false);
    };
    match store
        .find_claim(nj.id, &draft.corporate_name, draft.claim_date)
        .await?
    {
        Some(existing) => {
            store
                .patch_claim(
                    existing.id,
                    ClaimPatch {
                        status: Some(draft.status.clone()),
                        revenue_linked: draft.revenue_linked,
                    },
                )
                .await?
        }
        None => {
            store
                .insert_claim(ClaimRecord {
                    id: Uuid::new_v4(),
                    nj_id: nj.id,
                    corporate_name: draft.corporate_name.clone(),
                    claim_date: draft.claim_date,
                    status: draft.status.clone(),
                    revenue_linked: draft.revenue_linked,
                })
                .await?
        }
    }
    Ok(true)
}

// ---------------------------------------------------------------------------
// SyncLog state machine
// ---------------------------------------------------------------------------

async fn log_running(store: &dyn RecordStore, module: &str, now: DateTime<Utc>) -> Result<()> {
    store
        .upsert_sync_log(SyncLog {
            module: module.to_string(),
            status: SyncStatus::Running,
            last_sync_at: now,
            error_message: None,
            records_processed: None,
        })
        .await
        .with_context(|| format!("marking {module} sync running"))
}

async fn log_success(
    store: &dyn RecordStore,
    module: &str,
    now: DateTime<Utc>,
    records_processed: usize,
) -> Result<()> {
    store
        .upsert_sync_log(SyncLog {
            module: module.to_string(),
            status: SyncStatus::Success,
            last_sync_at: now,
            error_message: None,
            records_processed: Some(records_processed),
        })
        .await
        .with_context(|| format!("marking {module} sync success"))
}

async fn log_error(
    store: &dyn RecordStore,
    module: &str,
    now: DateTime<Utc>,
    message: String,
) -> Result<()> {
    store
        .upsert_sync_log(SyncLog {
            module: module.to_string(),
            status: SyncStatus::Error,
            last_sync_at: now,
            error_message: Some(message),
            records_processed: None,
        })
        .await
        .with_context(|| format!("marking {module} sync error"))
}

/// Wraps one module body in the running -> success | error transition,
/// re-raising the body's error after recording it.
async fn run_module<F>(
    store: &dyn RecordStore,
    module: &'static str,
    now: DateTime<Utc>,
    body: F,
) -> Result<SyncOutcome>
where
    F: std::future::Future<Output = Result<SyncOutcome>>,
{
    log_running(store, module, now).await?;
    match body.await {
        Ok(outcome) => {
            log_success(store, module, now, outcome.upserted).await?;
            info!(
                module,
                fetched = outcome.fetched,
                upserted = outcome.upserted,
                skipped = outcome.skipped,
                "sync complete"
            );
            Ok(outcome)
        }
        Err(err) => {
            warn!(module, error = %format!("{err:#}"), "sync failed");
            log_error(store, module, now, format!("{err:#}")).await?;
            Err(err)
        }
    }
}

// ---------------------------------------------------------------------------
// Per-domain orchestrators
// ---------------------------------------------------------------------------

pub async fn sync_new_joiners(
    store: &dyn RecordStore,
    provider: &dyn DataProvider,
    now: DateTime<Utc>,
) -> Result<SyncOutcome> {
    run_module(store, MODULE_NEW_JOINERS, now, async {
        let drafts = provider
            .fetch_new_joiners()
            .await
            .context("fetching new joiners")?;
        let mut outcome = SyncOutcome::new(MODULE_NEW_JOINERS);
        outcome.fetched = drafts.len();
        for draft in &drafts {
            upsert_new_joiner(store, draft, now).await?;
            outcome.upserted += 1;
        }
        Ok(outcome)
    })
    .await
}

pub async fn sync_scores(
    store: &dyn RecordStore,
    provider: &dyn DataProvider,
    now: DateTime<Utc>,
) -> Result<SyncOutcome> {
    run_module(store, MODULE_SCORES, now, async {
        let drafts = provider.fetch_scores().await.context("fetching scores")?;
        let mut outcome = SyncOutcome::new(MODULE_SCORES);
        outcome.fetched = drafts.len();
        for draft in &drafts {
            if upsert_score(store, draft).await? {
                outcome.upserted += 1;
            } else {
                outcome.skipped += 1;
            }
        }
        Ok(outcome)
    })
    .await
}

pub async fn sync_leads(
    store: &dyn RecordStore,
    provider: &dyn DataProvider,
    now: DateTime<Utc>,
) -> Result<SyncOutcome> {
    run_module(store, MODULE_LEADS, now, async {
        let drafts = provider.fetch_leads().await.context("fetching leads")?;
        let mut outcome = SyncOutcome::new(MODULE_LEADS);
        outcome.fetched = drafts.len();
        for draft in &drafts {
            if upsert_lead(store, draft).await? {
                outcome.upserted += 1;
            } else {
                outcome.skipped += 1;
            }
        }
        Ok(outcome)
    })
    .await
}

/// Revenue affects categorization, so a successful run chains into the
/// Categorization Engine before reporting success.
pub async fn sync_revenue(
    store: &dyn RecordStore,
    provider: &dyn DataProvider,
    now: DateTime<Utc>,
) -> Result<SyncOutcome> {
    run_module(store, MODULE_REVENUE, now, async {
        let drafts = provider.fetch_revenue().await.context("fetching revenue")?;
        let mut outcome = SyncOutcome::new(MODULE_REVENUE);
        outcome.fetched = drafts.len();
        for draft in &drafts {
            if upsert_revenue(store, draft).await? {
                outcome.upserted += 1;
            } else {
                outcome.skipped += 1;
            }
        }
        evaluate_categories(store)
            .await
            .context("refreshing categories after revenue sync")?;
        Ok(outcome)
    })
    .await
}

/// ROI also feeds categorization; same chaining as revenue.
pub async fn sync_roi(
    store: &dyn RecordStore,
    provider: &dyn DataProvider,
    now: DateTime<Utc>,
) -> Result<SyncOutcome> {
    run_module(store, MODULE_ROI, now, async {
        let drafts = provider.fetch_roi().await.context("fetching roi")?;
        let mut outcome = SyncOutcome::new(MODULE_ROI);
        outcome.fetched = drafts.len();
        for draft in &drafts {
            if upsert_roi(store, draft).await? {
                outcome.upserted += 1;
            } else {
                outcome.skipped += 1;
            }
        }
        evaluate_categories(store)
            .await
            .context("refreshing categories after roi sync")?;
        Ok(outcome)
    })
    .await
}

pub async fn sync_claims(
    store: &dyn RecordStore,
    provider: &dyn DataProvider,
    now: DateTime<Utc>,
) -> Result<SyncOutcome> {
    run_module(store, MODULE_CLAIMS, now, async {
        let drafts = provider.fetch_claims().await.context("fetching claims")?;
        let mut outcome = SyncOutcome::new(MODULE_CLAIMS);
        outcome.fetched = drafts.len();
        for draft in &drafts {
            if upsert_claim(store, draft).await? {
                outcome.upserted += 1;
            } else {
                outcome.skipped += 1;
            }
        }
        Ok(outcome)
    })
    .await
}

/// Runs one module by name.
pub async fn sync_module(
    store: &dyn RecordStore,
    provider: &dyn DataProvider,
    module: &str,
    now: DateTime<Utc>,
) -> Result<SyncOutcome> {
    match module {
        MODULE_NEW_JOINERS => sync_new_joiners(store, provider, now).await,
        MODULE_SCORES => sync_scores(store, provider, now).await,
        MODULE_LEADS => sync_leads(store, provider, now).await,
        MODULE_REVENUE => sync_revenue(store, provider, now).await,
        MODULE_ROI => sync_roi(store, provider, now).await,
        MODULE_CLAIMS => sync_claims(store, provider, now).await,
        other => anyhow::bail!("unknown sync module {other:?}"),
    }
}

/// Runs every module once, roster first so metric records find their reps.
pub async fn sync_all(
    store: &dyn RecordStore,
    provider: &dyn DataProvider,
    now: DateTime<Utc>,
) -> Result<Vec<SyncOutcome>> {
    let mut outcomes = Vec::with_capacity(ALL_MODULES.len());
    for module in ALL_MODULES {
        outcomes.push(sync_module(store, provider, module, now).await?);
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use stp_core::RevenueSource;
    use stp_providers::MockProvider;
    use stp_store::MemStore;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 6, 0, 0).single().unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn roster_upsert_matches_by_emp_id_then_name() {
        let store = MemStore::new();
        let draft = NewJoinerDraft {
            emp_id: "E1001".to_string(),
            name: "Asha Pillai".to_string(),
            department: None,
            manager_name: None,
            location: None,
            email: None,
            join_date: date(2026, 1, 5),
            active: true,
        };
        upsert_new_joiner(&store, &draft, now()).await.unwrap();
        // Same rep again, with a department added: must patch, not duplicate.
        let updated = NewJoinerDraft {
            department: Some("Field Sales".to_string()),
            ..draft
        };
        upsert_new_joiner(&store, &updated, now()).await.unwrap();

        let all = store.list_new_joiners().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].department.as_deref(), Some("Field Sales"));
        assert_eq!(all[0].category, Category::Uncategorised);
    }

    #[tokio::test]
    async fn revenue_upsert_replaces_on_natural_key_and_recomputes_sign() {
        let store = MemStore::new();
        upsert_new_joiner(
            &store,
            &NewJoinerDraft {
                emp_id: "E1001".to_string(),
                name: "Asha Pillai".to_string(),
                department: None,
                manager_name: None,
                location: None,
                email: None,
                join_date: date(2026, 1, 5),
                active: true,
            },
            now(),
        )
        .await
        .unwrap();
        let nj = store
            .find_new_joiner_by_emp_id("E1001")
            .await
            .unwrap()
            .unwrap();

        let mut draft = RevenueDraft {
            nj_key: "E1001".to_string(),
            month: 3,
            year: 2026,
            value: 900.0,
            source: RevenueSource::Synced,
        };
        assert!(upsert_revenue(&store, &draft).await.unwrap());
        draft.value = -250.0;
        draft.source = RevenueSource::Manual;
        assert!(upsert_revenue(&store, &draft).await.unwrap());

        let rows = store.revenue_for(nj.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, -250.0);
        assert!(!rows[0].is_positive);
        assert_eq!(rows[0].source, RevenueSource::Manual);
    }

    #[tokio::test]
    async fn unmatched_records_are_dropped_not_errors() {
        let store = MemStore::new();
        let dropped = upsert_revenue(
            &store,
            &RevenueDraft {
                nj_key: "E9999".to_string(),
                month: 3,
                year: 2026,
                value: 100.0,
                source: RevenueSource::Synced,
            },
        )
        .await
        .unwrap();
        assert!(!dropped);
    }

    #[tokio::test]
    async fn revenue_sync_records_skips_and_chains_categorization() {
        let store = MemStore::new();
        let provider = MockProvider::anchored(now().date_naive());

        // Without a roster every revenue record is silently dropped.
        let outcome = sync_revenue(&store, &provider, now()).await.unwrap();
        assert_eq!(outcome.upserted, 0);
        assert_eq!(outcome.skipped, outcome.fetched);

        sync_new_joiners(&store, &provider, now()).await.unwrap();
        let outcome = sync_revenue(&store, &provider, now()).await.unwrap();
        assert_eq!(outcome.fetched, outcome.upserted + outcome.skipped);
        assert_eq!(outcome.skipped, 0);

        // Chained categorization assigned a category to reps with history.
        let rohan = store
            .find_new_joiner_by_emp_id("E1002")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(rohan.category, Category::Uncategorised);
    }

    #[tokio::test]
    async fn sync_all_leaves_every_module_log_in_success() {
        let store = MemStore::new();
        let provider = MockProvider::anchored(now().date_naive());
        let outcomes = sync_all(&store, &provider, now()).await.unwrap();
        assert_eq!(outcomes.len(), ALL_MODULES.len());

        let logs = store.list_sync_logs().await.unwrap();
        assert_eq!(logs.len(), ALL_MODULES.len());
        for log in logs {
            assert_eq!(log.status, stp_core::SyncStatus::Success, "{}", log.module);
            assert!(log.records_processed.is_some());
        }
    }

    #[tokio::test]
    async fn unknown_module_name_is_an_error() {
        let store = MemStore::new();
        let provider = MockProvider::anchored(now().date_naive());
        assert!(sync_module(&store, &provider, "huddles", now()).await.is_err());
    }
}
