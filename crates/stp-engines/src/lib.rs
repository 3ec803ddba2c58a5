//! Categorization and milestone/alert engines.
//!
//! Both engines are stateless across invocations: each run re-derives from
//! the store and writes back idempotently. Failures propagate to the caller
//! without per-rep isolation; a crash partway leaves earlier reps updated
//! and the next scheduled run self-heals.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use stp_core::{
    most_recent_roi, previous_calendar_month, revenue_by_recency, tenure_months, AlertRecord,
    AlertType, Category, RevenueRecord, RoiColor, RoiRecord, TenurePhase,
};
use stp_store::{NewJoinerPatch, RecordStore};

pub const CRATE_NAME: &str = "stp-engines";

pub const PA_TENURE_MONTHS: u32 = 3;
pub const PIP_TENURE_MONTHS: u32 = 4;
pub const EXIT_TENURE_MONTHS: u32 = 5;

#[derive(Debug, Clone, Copy, Default)]
pub struct CategorizationSummary {
    pub evaluated: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MilestoneSummary {
    pub evaluated: usize,
    pub alerts_raised: usize,
}

/// Derives a category from a rep's full NR and ROI history, or `None` when
/// both histories are empty (the rep keeps their prior category).
///
/// The decision table, first match wins:
/// 1. latest NR positive AND latest ROI in the positive tier -> Developed
/// 2. either one positive -> Performer
/// 3. sign flip between the two most recent NR months -> Performance Falling
/// 4. neither positive -> Non-Performer
/// 5. fallback -> Uncategorised
///
/// A missing NR or ROI side counts as "not positive", not unknown. The
/// fallback branch is structurally unreachable for two booleans but is kept
/// because downstream dashboard filters match on the label.
pub fn derive_category(nr: &[RevenueRecord], roi: &[RoiRecord]) -> Option<Category> {
    if nr.is_empty() && roi.is_empty() {
        return None;
    }

    let by_recency = revenue_by_recency(nr);
    let nr_positive = by_recency.first().map(|r| r.is_positive).unwrap_or(false);
    let roi_positive = most_recent_roi(roi)
        .map(|r| r.color_code.is_positive_tier())
        .unwrap_or(false);
    // Only the two most recent months are compared; older history is ignored.
    let nr_alternating =
        by_recency.len() >= 2 && by_recency[0].is_positive != by_recency[1].is_positive;

    let category = if nr_positive && roi_positive {
        Category::Developed
    } else if nr_positive || roi_positive {
        Category::Performer
    } else if nr_alternating {
        Category::PerformanceFalling
    } else if !nr_positive && !roi_positive {
        Category::NonPerformer
    } else {
        Category::Uncategorised
    };
    Some(category)
}

/// Recomputes the category of every active rep from their most recent NR and
/// ROI records and writes it back. Re-running with no new data is a no-op in
/// effect: the same category is derived and patched again.
pub async fn evaluate_categories(store: &dyn RecordStore) -> Result<CategorizationSummary> {
    let mut summary = CategorizationSummary::default();

    for nj in store
        .list_new_joiners()
        .await
        .context("listing reps for categorization")?
    {
        if !nj.active {
            summary.skipped += 1;
            continue;
        }
        let nr = store.revenue_for(nj.id).await?;
        let roi = store.roi_for(nj.id).await?;
        let Some(category) = derive_category(&nr, &roi) else {
            // No signal yet; leave the prior category untouched.
            summary.skipped += 1;
            continue;
        };
        store
            .patch_new_joiner(
                nj.id,
                NewJoinerPatch {
                    category: Some(category),
                    ..Default::default()
                },
            )
            .await
            .with_context(|| format!("writing category for rep {}", nj.id))?;
        summary.evaluated += 1;
    }

    debug!(
        evaluated = summary.evaluated,
        skipped = summary.skipped,
        "categorization pass complete"
    );
    Ok(summary)
}

/// Insert-if-absent keyed by (rep, alert type). An existing row blocks the
/// insert whether or not it has been acknowledged. Returns true when a new
/// alert was raised.
pub async fn ensure_alert(
    store: &dyn RecordStore,
    nj_id: Uuid,
    alert_type: AlertType,
    now: DateTime<Utc>,
) -> Result<bool> {
    if store.find_alert(nj_id, alert_type).await?.is_some() {
        return Ok(false);
    }
    store
        .insert_alert(AlertRecord {
            id: Uuid::new_v4(),
            nj_id,
            alert_type,
            triggered_at: now,
            acknowledged_at: None,
            acknowledged_by: None,
        })
        .await
        .with_context(|| format!("raising {} alert for rep {nj_id}", alert_type.label()))?;
    Ok(true)
}

/// Recomputes tenure (and phase) for every active rep and raises escalation
/// alerts as tenure thresholds are crossed with negative performance signals.
///
/// Data selection is deliberately asymmetric per alert type: PIP and EXIT
/// read the NR row for the previous *calendar* month (which may be missing
/// even when newer data exists), while EXIT reads the most recent available
/// ROI row. All thresholds are >= checks, so alerts fire cumulatively.
pub async fn evaluate_milestones(
    store: &dyn RecordStore,
    now: DateTime<Utc>,
) -> Result<MilestoneSummary> {
    let today = now.date_naive();
    let (prev_year, prev_month) = previous_calendar_month(today);
    let mut summary = MilestoneSummary::default();

    for nj in store
        .list_new_joiners()
        .await
        .context("listing reps for milestone evaluation")?
    {
        if !nj.active {
            continue;
        }

        let tenure = tenure_months(nj.join_date, today);
        // Written unconditionally, even when unchanged.
        store
            .patch_new_joiner(
                nj.id,
                NewJoinerPatch {
                    tenure_months: Some(tenure),
                    phase: Some(TenurePhase::from_tenure_months(tenure)),
                    ..Default::default()
                },
            )
            .await
            .with_context(|| format!("writing tenure for rep {}", nj.id))?;
        summary.evaluated += 1;

        if tenure >= PA_TENURE_MONTHS && ensure_alert(store, nj.id, AlertType::Pa, now).await? {
            info!(rep = %nj.name, tenure, "PA alert raised");
            summary.alerts_raised += 1;
        }

        if tenure >= PIP_TENURE_MONTHS {
            let last_month_nr = store.find_revenue(nj.id, prev_year, prev_month).await?;
            let nr_negative = matches!(&last_month_nr, Some(r) if !r.is_positive);
            if nr_negative && ensure_alert(store, nj.id, AlertType::Pip, now).await? {
                info!(rep = %nj.name, tenure, "PIP alert raised");
                summary.alerts_raised += 1;
            }
        }

        if tenure >= EXIT_TENURE_MONTHS {
            let last_month_nr = store.find_revenue(nj.id, prev_year, prev_month).await?;
            let nr_negative = matches!(&last_month_nr, Some(r) if !r.is_positive);
            let roi = store.roi_for(nj.id).await?;
            // Only an exact Red qualifies as negative here; Yellow does not.
            let roi_red = matches!(
                most_recent_roi(&roi),
                Some(r) if r.color_code == RoiColor::Red
            );
            if nr_negative && roi_red && ensure_alert(store, nj.id, AlertType::Exit, now).await? {
                info!(rep = %nj.name, tenure, "EXIT alert raised");
                summary.alerts_raised += 1;
            }
        }
    }

    debug!(
        evaluated = summary.evaluated,
        alerts_raised = summary.alerts_raised,
        "milestone pass complete"
    );
    Ok(summary)
}
