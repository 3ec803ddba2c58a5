//! Axum JSON API over the record store: dashboard aggregates, rep listing,
//! alert acknowledgment, sync status, and manual sync triggers.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::info;
use uuid::Uuid;

use stp_core::{AlertRecord, NewJoiner, RevenueRecord, RoiRecord, SyncLog};
use stp_providers::DataProvider;
use stp_store::{AlertPatch, RecordStore};

pub const CRATE_NAME: &str = "stp-web";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub provider: Arc<dyn DataProvider>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, provider: Arc<dyn DataProvider>) -> Self {
        Self { store, provider }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/overview", get(overview_handler))
        .route("/api/new-joiners", get(new_joiners_handler))
        .route("/api/new-joiners/{id}", get(new_joiner_detail_handler))
        .route("/api/alerts", get(alerts_handler))
        .route("/api/alerts/{id}/acknowledge", post(acknowledge_handler))
        .route("/api/sync/status", get(sync_status_handler))
        .route("/api/sync/{module}", post(sync_trigger_handler))
        .with_state(state)
}

pub async fn serve_from_env(state: AppState) -> anyhow::Result<()> {
    let port: u16 = std::env::var("STP_WEB_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8000);
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "dashboard api listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct Overview {
    total_reps: usize,
    active_reps: usize,
    categories: BTreeMap<&'static str, usize>,
    phases: BTreeMap<&'static str, usize>,
    open_alerts: usize,
    sync: Vec<SyncLog>,
}

#[derive(Debug, Deserialize, Default)]
struct NewJoinerQuery {
    category: Option<String>,
    phase: Option<String>,
}

#[derive(Debug, Serialize)]
struct NewJoinerDetail {
    #[serde(flatten)]
    rep: NewJoiner,
    revenue: Vec<RevenueRecord>,
    roi: Vec<RoiRecord>,
    alerts: Vec<AlertRecord>,
}

#[derive(Debug, Deserialize)]
struct AcknowledgeBody {
    acknowledged_by: String,
}

#[derive(Debug, Deserialize, Default)]
struct AlertsQuery {
    unacknowledged: Option<bool>,
}

async fn overview_handler(State(state): State<AppState>) -> Response {
    match load_overview(&state).await {
        Ok(overview) => Json(overview).into_response(),
        Err(err) => server_error(err),
    }
}

async fn load_overview(state: &AppState) -> anyhow::Result<Overview> {
    let reps = state.store.list_new_joiners().await?;
    let alerts = state.store.list_alerts().await?;
    let sync = state.store.list_sync_logs().await?;

    let mut categories: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut phases: BTreeMap<&'static str, usize> = BTreeMap::new();
    for rep in &reps {
        *categories.entry(rep.category.label()).or_default() += 1;
        *phases.entry(rep.phase.label()).or_default() += 1;
    }

    Ok(Overview {
        total_reps: reps.len(),
        active_reps: reps.iter().filter(|r| r.active).count(),
        categories,
        phases,
        open_alerts: alerts.iter().filter(|a| a.acknowledged_at.is_none()).count(),
        sync,
    })
}

async fn new_joiners_handler(
    State(state): State<AppState>,
    Query(query): Query<NewJoinerQuery>,
) -> Response {
    match state.store.list_new_joiners().await {
        Ok(reps) => {
            let filtered: Vec<NewJoiner> = reps
                .into_iter()
                .filter(|rep| {
                    query
                        .category
                        .as_deref()
                        .map(|c| rep.category.label().eq_ignore_ascii_case(c))
                        .unwrap_or(true)
                        && query
                            .phase
                            .as_deref()
                            .map(|p| rep.phase.label().eq_ignore_ascii_case(p))
                            .unwrap_or(true)
                })
                .collect();
            Json(filtered).into_response()
        }
        Err(err) => server_error(err.into()),
    }
}

async fn new_joiner_detail_handler(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<Uuid>,
) -> Response {
    match load_detail(&state, id).await {
        Ok(Some(detail)) => Json(detail).into_response(),
        Ok(None) => not_found("new joiner not found"),
        Err(err) => server_error(err),
    }
}

async fn load_detail(state: &AppState, id: Uuid) -> anyhow::Result<Option<NewJoinerDetail>> {
    let Some(rep) = state.store.get_new_joiner(id).await? else {
        return Ok(None);
    };
    let mut revenue = state.store.revenue_for(id).await?;
    revenue.sort_by(|a, b| (b.year, b.month).cmp(&(a.year, a.month)));
    let mut roi = state.store.roi_for(id).await?;
    roi.sort_by(|a, b| b.week_start.cmp(&a.week_start));
    let alerts = state.store.alerts_for(id).await?;
    Ok(Some(NewJoinerDetail {
        rep,
        revenue,
        roi,
        alerts,
    }))
}

async fn alerts_handler(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> Response {
    match state.store.list_alerts().await {
        Ok(alerts) => {
            let filtered: Vec<AlertRecord> = alerts
                .into_iter()
                .filter(|a| {
                    !query.unacknowledged.unwrap_or(false) || a.acknowledged_at.is_none()
                })
                .collect();
            Json(filtered).into_response()
        }
        Err(err) => server_error(err.into()),
    }
}

/// Sets acknowledgment metadata on an alert. An acknowledged alert still
/// counts as existing for the engines' idempotent ensure-alert check.
async fn acknowledge_handler(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<Uuid>,
    Json(body): Json<AcknowledgeBody>,
) -> Response {
    match acknowledge(&state, id, body.acknowledged_by, Utc::now()).await {
        Ok(Some(alert)) => Json(alert).into_response(),
        Ok(None) => not_found("alert not found"),
        Err(err) => server_error(err),
    }
}

async fn acknowledge(
    state: &AppState,
    id: Uuid,
    acknowledged_by: String,
    now: DateTime<Utc>,
) -> anyhow::Result<Option<AlertRecord>> {
    if state.store.get_alert(id).await?.is_none() {
        return Ok(None);
    }
    state
        .store
        .patch_alert(
            id,
            AlertPatch {
                acknowledged_at: Some(now),
                acknowledged_by: Some(acknowledged_by),
            },
        )
        .await?;
    Ok(state.store.get_alert(id).await?)
}

async fn sync_status_handler(State(state): State<AppState>) -> Response {
    match state.store.list_sync_logs().await {
        Ok(logs) => Json(logs).into_response(),
        Err(err) => server_error(err.into()),
    }
}

async fn sync_trigger_handler(
    State(state): State<AppState>,
    AxumPath(module): AxumPath<String>,
) -> Response {
    if !stp_sync::ALL_MODULES.contains(&module.as_str()) {
        return not_found("unknown sync module");
    }
    match stp_sync::sync_module(
        state.store.as_ref(),
        state.provider.as_ref(),
        &module,
        Utc::now(),
    )
    .await
    {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err) => server_error(err),
    }
}

fn not_found(message: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

fn server_error(err: anyhow::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": format!("{err:#}") })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use chrono::{NaiveDate, TimeZone};
    use http_body_util::BodyExt;
    use stp_core::{AlertType, Category, TenurePhase};
    use stp_providers::MockProvider;
    use stp_store::MemStore;
    use tower::ServiceExt;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).single().unwrap()
    }

    async fn seeded_state() -> (AppState, Uuid, Uuid) {
        let store = Arc::new(MemStore::new());
        let nj_id = Uuid::new_v4();
        store
            .insert_new_joiner(NewJoiner {
                id: nj_id,
                emp_id: Some("E1001".to_string()),
                name: "Asha Pillai".to_string(),
                department: None,
                manager_name: None,
                location: None,
                email: None,
                join_date: NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
                tenure_months: 5,
                phase: TenurePhase::Field,
                category: Category::Performer,
                active: true,
                created_at: now(),
            })
            .await
            .unwrap();
        let alert_id = Uuid::new_v4();
        store
            .insert_alert(AlertRecord {
                id: alert_id,
                nj_id,
                alert_type: AlertType::Pa,
                triggered_at: now(),
                acknowledged_at: None,
                acknowledged_by: None,
            })
            .await
            .unwrap();
        let provider = Arc::new(MockProvider::anchored(now().date_naive()));
        (AppState::new(store, provider), nj_id, alert_id)
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn overview_reports_counts_and_open_alerts() {
        let (state, _, _) = seeded_state().await;
        let resp = app(state)
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/overview")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["total_reps"], 1);
        assert_eq!(json["open_alerts"], 1);
        assert_eq!(json["categories"]["Performer"], 1);
        assert_eq!(json["phases"]["Field"], 1);
    }

    #[tokio::test]
    async fn new_joiner_filters_match_on_labels() {
        let (state, _, _) = seeded_state().await;
        let app = app(state);

        let hit = app
            .clone()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/new-joiners?category=Performer")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(hit).await.as_array().unwrap().len(), 1);

        let miss = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/new-joiners?category=Developed")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(body_json(miss).await.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn detail_includes_history_and_unknown_id_is_404() {
        let (state, nj_id, _) = seeded_state().await;
        let app = app(state);

        let resp = app
            .clone()
            .oneshot(
                axum::http::Request::builder()
                    .uri(format!("/api/new-joiners/{nj_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["name"], "Asha Pillai");
        assert_eq!(json["alerts"].as_array().unwrap().len(), 1);

        let missing = app
            .oneshot(
                axum::http::Request::builder()
                    .uri(format!("/api/new-joiners/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn acknowledging_an_alert_sets_metadata() {
        let (state, _, alert_id) = seeded_state().await;
        let store = state.store.clone();
        let app = app(state);

        let resp = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri(format!("/api/alerts/{alert_id}/acknowledge"))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"acknowledged_by":"manager"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let alert = store.get_alert(alert_id).await.unwrap().unwrap();
        assert!(alert.acknowledged_at.is_some());
        assert_eq!(alert.acknowledged_by.as_deref(), Some("manager"));
    }

    #[tokio::test]
    async fn unacknowledged_filter_hides_acknowledged_alerts() {
        let (state, _, alert_id) = seeded_state().await;
        state
            .store
            .patch_alert(
                alert_id,
                AlertPatch {
                    acknowledged_at: Some(now()),
                    acknowledged_by: Some("manager".to_string()),
                },
            )
            .await
            .unwrap();
        let resp = app(state)
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/alerts?unacknowledged=true")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(body_json(resp).await.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn manual_sync_trigger_runs_one_module() {
        let (state, _, _) = seeded_state().await;
        let store = state.store.clone();
        let app = app(state);

        let resp = app
            .clone()
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/api/sync/new_joiners")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(store
            .get_sync_log("new_joiners")
            .await
            .unwrap()
            .is_some());

        let unknown = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/api/sync/huddles")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    }
}
