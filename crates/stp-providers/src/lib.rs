//! Provider client contracts + the mock/sheets/live implementations.
//!
//! Each external data domain is fetched through one [`DataProvider`]
//! capability. Every variant adapts its raw payload into the normalized
//! draft shapes from `stp-core` at its own boundary.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use stp_core::{
    previous_calendar_month, ClaimDraft, LeadDraft, NewJoinerDraft, RevenueDraft, RevenueSource,
    RoiColor, RoiDraft, ScoreDraft,
};

pub const CRATE_NAME: &str = "stp-providers";

pub const MODE_ENV: &str = "STP_DATA_MODE";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("malformed {domain} record: {detail}")]
    Malformed {
        domain: &'static str,
        detail: String,
    },
    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),
}

impl ProviderError {
    fn malformed(domain: &'static str, detail: impl Into<String>) -> Self {
        Self::Malformed {
            domain,
            detail: detail.into(),
        }
    }
}

/// One fetch per data domain, each returning normalized drafts.
///
/// No inline retry: a single failed call fails the caller's sync run and the
/// next scheduled run is the retry mechanism.
#[async_trait]
pub trait DataProvider: Send + Sync {
    fn variant(&self) -> &'static str;

    async fn fetch_new_joiners(&self) -> Result<Vec<NewJoinerDraft>, ProviderError>;
    async fn fetch_scores(&self) -> Result<Vec<ScoreDraft>, ProviderError>;
    async fn fetch_leads(&self) -> Result<Vec<LeadDraft>, ProviderError>;
    async fn fetch_revenue(&self) -> Result<Vec<RevenueDraft>, ProviderError>;
    async fn fetch_roi(&self) -> Result<Vec<RoiDraft>, ProviderError>;
    async fn fetch_claims(&self) -> Result<Vec<ClaimDraft>, ProviderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderMode {
    Mock,
    Sheets,
    Live,
}

impl ProviderMode {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("sheets") => Self::Sheets,
            Some("live") => Self::Live,
            _ => Self::Mock,
        }
    }

    pub fn from_env() -> Self {
        Self::parse(std::env::var(MODE_ENV).ok().as_deref())
    }
}

/// Builds the active provider from the environment-level mode flag.
pub fn provider_from_env() -> Result<std::sync::Arc<dyn DataProvider>, ProviderError> {
    Ok(match ProviderMode::from_env() {
        ProviderMode::Mock => std::sync::Arc::new(MockProvider::new()),
        ProviderMode::Sheets => std::sync::Arc::new(SheetsProvider::new(SheetsConfig::from_env()?)?),
        ProviderMode::Live => {
            std::sync::Arc::new(LiveApiProvider::new(LiveApiConfig::from_env()?)?)
        }
    })
}

fn http_client() -> Result<reqwest::Client, ProviderError> {
    let timeout_secs = std::env::var("STP_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(20);
    Ok(reqwest::Client::builder()
        .gzip(true)
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

// ---------------------------------------------------------------------------
// Mock generator
// ---------------------------------------------------------------------------

fn monday_on_or_before(date: NaiveDate) -> NaiveDate {
    date - chrono::Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn month_before(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

/// Deterministic generated cohort, anchored on a reference date so seeded
/// reps land in every tenure phase. Also backs the `seed` command.
#[derive(Debug, Clone)]
pub struct MockProvider {
    today: NaiveDate,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::anchored(Utc::now().date_naive())
    }

    pub fn anchored(today: NaiveDate) -> Self {
        Self { today }
    }

    fn joiners(&self) -> Vec<(&'static str, &'static str, i64)> {
        // (emp id, name, days since joining)
        vec![
            ("E1001", "Asha Pillai", 20),
            ("E1002", "Rohan Mehta", 70),
            ("E1003", "Priya Nair", 100),
            ("E1004", "Dev Kapoor", 130),
            ("E1005", "Sana Iqbal", 160),
        ]
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataProvider for MockProvider {
    fn variant(&self) -> &'static str {
        "mock"
    }

    async fn fetch_new_joiners(&self) -> Result<Vec<NewJoinerDraft>, ProviderError> {
        Ok(self
            .joiners()
            .into_iter()
            .map(|(emp_id, name, days_ago)| NewJoinerDraft {
                emp_id: emp_id.to_string(),
                name: name.to_string(),
                department: Some("Field Sales".to_string()),
                manager_name: Some("R. Varma".to_string()),
                location: Some("Mumbai".to_string()),
                email: Some(format!("{}@example.test", emp_id.to_ascii_lowercase())),
                join_date: self.today - chrono::Duration::days(days_ago),
                active: true,
            })
            .collect())
    }

    async fn fetch_scores(&self) -> Result<Vec<ScoreDraft>, ProviderError> {
        Ok(self
            .joiners()
            .into_iter()
            .map(|(emp_id, _, days_ago)| ScoreDraft {
                nj_key: emp_id.to_string(),
                date: self.today - chrono::Duration::days(3),
                score: 60.0 + (days_ago % 40) as f64,
                category: Some("Call Quality".to_string()),
                recordings_completed: 4,
            })
            .collect())
    }

    async fn fetch_leads(&self) -> Result<Vec<LeadDraft>, ProviderError> {
        Ok(self
            .joiners()
            .into_iter()
            .enumerate()
            .map(|(idx, (emp_id, _, _))| LeadDraft {
                nj_key: emp_id.to_string(),
                lead_id: format!("L-{:04}", idx + 1),
                allocated_date: self.today - chrono::Duration::days(10),
                last_action_date: Some(self.today - chrono::Duration::days(2)),
                status: "In Progress".to_string(),
                tat_hours: Some(18.0),
                tat_breached: idx % 2 == 1,
                is_self_gen: idx % 3 == 0,
            })
            .collect())
    }

    async fn fetch_revenue(&self) -> Result<Vec<RevenueDraft>, ProviderError> {
        let (y1, m1) = previous_calendar_month(self.today);
        let (y2, m2) = month_before(y1, m1);
        // Signs per rep over the last two calendar months, covering every
        // category branch: (older, newer).
        let signs: &[(&str, f64, f64)] = &[
            ("E1002", 1800.0, 2400.0),
            ("E1003", -300.0, 950.0),
            ("E1004", 700.0, -450.0),
            ("E1005", -500.0, -900.0),
        ];
        let mut drafts = Vec::new();
        for (emp_id, older, newer) in signs {
            drafts.push(RevenueDraft {
                nj_key: emp_id.to_string(),
                month: m2,
                year: y2,
                value: *older,
                source: RevenueSource::Synced,
            });
            drafts.push(RevenueDraft {
                nj_key: emp_id.to_string(),
                month: m1,
                year: y1,
                value: *newer,
                source: RevenueSource::Synced,
            });
        }
        Ok(drafts)
    }

    async fn fetch_roi(&self) -> Result<Vec<RoiDraft>, ProviderError> {
        let w0 = monday_on_or_before(self.today);
        let w1 = w0 - chrono::Duration::days(7);
        let weeks: &[(&str, NaiveDate, RoiColor)] = &[
            ("E1001", w0, RoiColor::Green),
            ("E1002", w1, RoiColor::Black),
            ("E1002", w0, RoiColor::Green),
            ("E1003", w1, RoiColor::Green),
            ("E1003", w0, RoiColor::Yellow),
            ("E1004", w0, RoiColor::Yellow),
            ("E1005", w1, RoiColor::Yellow),
            ("E1005", w0, RoiColor::Red),
        ];
        Ok(weeks
            .iter()
            .map(|(emp_id, week_start, color_code)| RoiDraft {
                nj_key: emp_id.to_string(),
                week_start: *week_start,
                value: match color_code {
                    RoiColor::Green => 1.6,
                    RoiColor::Black => 1.1,
                    RoiColor::Yellow => 0.7,
                    RoiColor::Red => 0.3,
                },
                color_code: *color_code,
            })
            .collect())
    }

    async fn fetch_claims(&self) -> Result<Vec<ClaimDraft>, ProviderError> {
        Ok(vec![
            ClaimDraft {
                nj_key: "E1002".to_string(),
                corporate_name: "Meridian Logistics".to_string(),
                claim_date: self.today - chrono::Duration::days(15),
                status: "Approved".to_string(),
                revenue_linked: Some(12000.0),
            },
            ClaimDraft {
                nj_key: "E1004".to_string(),
                corporate_name: "Trident Retail".to_string(),
                claim_date: self.today - chrono::Duration::days(8),
                status: "Pending".to_string(),
                revenue_linked: None,
            },
        ])
    }
}

// ---------------------------------------------------------------------------
// Spreadsheet-export provider
// ---------------------------------------------------------------------------

/// One CSV export URL per data domain.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub new_joiners_url: String,
    pub scores_url: String,
    pub leads_url: String,
    pub revenue_url: String,
    pub roi_url: String,
    pub claims_url: String,
}

impl SheetsConfig {
    pub fn from_env() -> Result<Self, ProviderError> {
        fn need(name: &'static str) -> Result<String, ProviderError> {
            std::env::var(name).map_err(|_| ProviderError::MissingEnv(name))
        }
        Ok(Self {
            new_joiners_url: need("STP_SHEET_NEW_JOINERS_URL")?,
            scores_url: need("STP_SHEET_SCORES_URL")?,
            leads_url: need("STP_SHEET_LEADS_URL")?,
            revenue_url: need("STP_SHEET_REVENUE_URL")?,
            roi_url: need("STP_SHEET_ROI_URL")?,
            claims_url: need("STP_SHEET_CLAIMS_URL")?,
        })
    }
}

pub struct SheetsProvider {
    client: reqwest::Client,
    config: SheetsConfig,
}

impl SheetsProvider {
    pub fn new(config: SheetsConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client()?,
            config,
        })
    }

    async fn fetch_csv(&self, url: &str) -> Result<String, ProviderError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl DataProvider for SheetsProvider {
    fn variant(&self) -> &'static str {
        "sheets"
    }

    async fn fetch_new_joiners(&self) -> Result<Vec<NewJoinerDraft>, ProviderError> {
        parse_new_joiners_csv(&self.fetch_csv(&self.config.new_joiners_url).await?)
    }

    async fn fetch_scores(&self) -> Result<Vec<ScoreDraft>, ProviderError> {
        parse_scores_csv(&self.fetch_csv(&self.config.scores_url).await?)
    }

    async fn fetch_leads(&self) -> Result<Vec<LeadDraft>, ProviderError> {
        parse_leads_csv(&self.fetch_csv(&self.config.leads_url).await?)
    }

    async fn fetch_revenue(&self) -> Result<Vec<RevenueDraft>, ProviderError> {
        parse_revenue_csv(&self.fetch_csv(&self.config.revenue_url).await?)
    }

    async fn fetch_roi(&self) -> Result<Vec<RoiDraft>, ProviderError> {
        parse_roi_csv(&self.fetch_csv(&self.config.roi_url).await?)
    }

    async fn fetch_claims(&self) -> Result<Vec<ClaimDraft>, ProviderError> {
        parse_claims_csv(&self.fetch_csv(&self.config.claims_url).await?)
    }
}

fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

fn csv_rows(
    text: &str,
    domain: &'static str,
) -> Result<Vec<HashMap<String, String>>, ProviderError> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header: Vec<String> = match lines.next() {
        Some(line) => split_csv_line(line)
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect(),
        None => return Ok(Vec::new()),
    };
    let mut rows = Vec::new();
    for line in lines {
        let fields = split_csv_line(line);
        if fields.len() != header.len() {
            return Err(ProviderError::malformed(
                domain,
                format!("expected {} columns, got {}", header.len(), fields.len()),
            ));
        }
        rows.push(
            header
                .iter()
                .cloned()
                .zip(fields.into_iter().map(|f| f.trim().to_string()))
                .collect(),
        );
    }
    Ok(rows)
}

fn require<'a>(
    row: &'a HashMap<String, String>,
    field: &'static str,
    domain: &'static str,
) -> Result<&'a str, ProviderError> {
    match row.get(field).map(String::as_str) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ProviderError::malformed(
            domain,
            format!("missing field {field}"),
        )),
    }
}

fn optional(row: &HashMap<String, String>, field: &str) -> Option<String> {
    row.get(field).filter(|v| !v.is_empty()).cloned()
}

fn parse_date(value: &str, domain: &'static str) -> Result<NaiveDate, ProviderError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ProviderError::malformed(domain, format!("bad date {value:?}")))
}

fn parse_number<T: std::str::FromStr>(
    value: &str,
    field: &'static str,
    domain: &'static str,
) -> Result<T, ProviderError> {
    value
        .parse()
        .map_err(|_| ProviderError::malformed(domain, format!("bad {field} {value:?}")))
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

fn parse_color(value: &str, domain: &'static str) -> Result<RoiColor, ProviderError> {
    match value.to_ascii_lowercase().as_str() {
        "green" => Ok(RoiColor::Green),
        "black" => Ok(RoiColor::Black),
        "red" => Ok(RoiColor::Red),
        "yellow" => Ok(RoiColor::Yellow),
        other => Err(ProviderError::malformed(
            domain,
            format!("unknown color code {other:?}"),
        )),
    }
}

fn parse_new_joiners_csv(text: &str) -> Result<Vec<NewJoinerDraft>, ProviderError> {
    const DOMAIN: &str = "new_joiners";
    csv_rows(text, DOMAIN)?
        .into_iter()
        .map(|row| {
            let status = optional(&row, "status").unwrap_or_else(|| "active".to_string());
            Ok(NewJoinerDraft {
                emp_id: require(&row, "empId", DOMAIN)?.to_string(),
                name: require(&row, "name", DOMAIN)?.to_string(),
                department: optional(&row, "department"),
                manager_name: optional(&row, "managerName"),
                location: optional(&row, "location"),
                email: optional(&row, "email"),
                join_date: parse_date(require(&row, "joinDate", DOMAIN)?, DOMAIN)?,
                active: !matches!(
                    status.to_ascii_lowercase().as_str(),
                    "inactive" | "exited" | "left"
                ),
            })
        })
        .collect()
}

fn parse_scores_csv(text: &str) -> Result<Vec<ScoreDraft>, ProviderError> {
    const DOMAIN: &str = "scores";
    csv_rows(text, DOMAIN)?
        .into_iter()
        .map(|row| {
            Ok(ScoreDraft {
                nj_key: require(&row, "njId", DOMAIN)?.to_string(),
                date: parse_date(require(&row, "date", DOMAIN)?, DOMAIN)?,
                score: parse_number(require(&row, "score", DOMAIN)?, "score", DOMAIN)?,
                category: optional(&row, "category"),
                recordings_completed: optional(&row, "recordingsCompleted")
                    .map(|v| parse_number(&v, "recordingsCompleted", DOMAIN))
                    .transpose()?
                    .unwrap_or(0),
            })
        })
        .collect()
}

fn parse_leads_csv(text: &str) -> Result<Vec<LeadDraft>, ProviderError> {
    const DOMAIN: &str = "leads";
    csv_rows(text, DOMAIN)?
        .into_iter()
        .map(|row| {
            Ok(LeadDraft {
                nj_key: require(&row, "njId", DOMAIN)?.to_string(),
                lead_id: require(&row, "leadId", DOMAIN)?.to_string(),
                allocated_date: parse_date(require(&row, "allocatedDate", DOMAIN)?, DOMAIN)?,
                last_action_date: optional(&row, "lastActionDate")
                    .map(|v| parse_date(&v, DOMAIN))
                    .transpose()?,
                status: require(&row, "status", DOMAIN)?.to_string(),
                tat_hours: optional(&row, "tatHours")
                    .map(|v| parse_number(&v, "tatHours", DOMAIN))
                    .transpose()?,
                tat_breached: optional(&row, "tatBreached")
                    .map(|v| parse_flag(&v))
                    .unwrap_or(false),
                is_self_gen: optional(&row, "isSelfGen")
                    .map(|v| parse_flag(&v))
                    .unwrap_or(false),
            })
        })
        .collect()
}

fn parse_revenue_csv(text: &str) -> Result<Vec<RevenueDraft>, ProviderError> {
    const DOMAIN: &str = "revenue";
    csv_rows(text, DOMAIN)?
        .into_iter()
        .map(|row| {
            let source = match optional(&row, "source").as_deref() {
                Some("manual") => RevenueSource::Manual,
                _ => RevenueSource::Synced,
            };
            Ok(RevenueDraft {
                nj_key: require(&row, "njId", DOMAIN)?.to_string(),
                month: parse_number(require(&row, "month", DOMAIN)?, "month", DOMAIN)?,
                year: parse_number(require(&row, "year", DOMAIN)?, "year", DOMAIN)?,
                value: parse_number(require(&row, "value", DOMAIN)?, "value", DOMAIN)?,
                source,
            })
        })
        .collect()
}

fn parse_roi_csv(text: &str) -> Result<Vec<RoiDraft>, ProviderError> {
    const DOMAIN: &str = "roi";
    csv_rows(text, DOMAIN)?
        .into_iter()
        .map(|row| {
            Ok(RoiDraft {
                nj_key: require(&row, "njId", DOMAIN)?.to_string(),
                week_start: parse_date(require(&row, "weekStart", DOMAIN)?, DOMAIN)?,
                value: parse_number(require(&row, "value", DOMAIN)?, "value", DOMAIN)?,
                color_code: parse_color(require(&row, "colorCode", DOMAIN)?, DOMAIN)?,
            })
        })
        .collect()
}

fn parse_claims_csv(text: &str) -> Result<Vec<ClaimDraft>, ProviderError> {
    const DOMAIN: &str = "claims";
    csv_rows(text, DOMAIN)?
        .into_iter()
        .map(|row| {
            Ok(ClaimDraft {
                nj_key: require(&row, "njId", DOMAIN)?.to_string(),
                corporate_name: require(&row, "corporateName", DOMAIN)?.to_string(),
                claim_date: parse_date(require(&row, "claimDate", DOMAIN)?, DOMAIN)?,
                status: require(&row, "status", DOMAIN)?.to_string(),
                revenue_linked: optional(&row, "revenueLinked")
                    .map(|v| parse_number(&v, "revenueLinked", DOMAIN))
                    .transpose()?,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Live REST API provider
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LiveApiConfig {
    pub base_url: String,
    pub api_token: String,
}

impl LiveApiConfig {
    pub fn from_env() -> Result<Self, ProviderError> {
        Ok(Self {
            base_url: std::env::var("STP_API_BASE_URL")
                .map_err(|_| ProviderError::MissingEnv("STP_API_BASE_URL"))?,
            api_token: std::env::var("STP_API_TOKEN")
                .map_err(|_| ProviderError::MissingEnv("STP_API_TOKEN"))?,
        })
    }
}

pub struct LiveApiProvider {
    client: reqwest::Client,
    config: LiveApiConfig,
}

impl LiveApiProvider {
    pub fn new(config: LiveApiConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client()?,
            config,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_token)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::HttpStatus {
                status: status.as_u16(),
                url,
            });
        }
        Ok(resp.json().await?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNewJoiner {
    emp_id: String,
    name: String,
    department: Option<String>,
    manager_name: Option<String>,
    location: Option<String>,
    email: Option<String>,
    join_date: NaiveDate,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScore {
    nj_id: String,
    date: NaiveDate,
    score: f64,
    category: Option<String>,
    #[serde(default)]
    recordings_completed: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLead {
    nj_id: String,
    lead_id: String,
    allocated_date: NaiveDate,
    last_action_date: Option<NaiveDate>,
    status: String,
    tat_hours: Option<f64>,
    #[serde(default)]
    tat_breached: bool,
    #[serde(default)]
    is_self_gen: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRevenue {
    nj_id: String,
    month: u32,
    year: i32,
    value: f64,
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRoi {
    nj_id: String,
    week_start: NaiveDate,
    value: f64,
    color_code: RoiColor,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClaim {
    nj_id: String,
    corporate_name: String,
    claim_date: NaiveDate,
    status: String,
    revenue_linked: Option<f64>,
}

#[async_trait]
impl DataProvider for LiveApiProvider {
    fn variant(&self) -> &'static str {
        "live"
    }

    async fn fetch_new_joiners(&self) -> Result<Vec<NewJoinerDraft>, ProviderError> {
        let raw: Vec<RawNewJoiner> = self.get_json("new-joiners").await?;
        Ok(raw
            .into_iter()
            .map(|r| NewJoinerDraft {
                emp_id: r.emp_id,
                name: r.name,
                department: r.department,
                manager_name: r.manager_name,
                location: r.location,
                email: r.email,
                join_date: r.join_date,
                active: !matches!(
                    r.status.as_deref().map(str::to_ascii_lowercase).as_deref(),
                    Some("inactive") | Some("exited") | Some("left")
                ),
            })
            .collect())
    }

    async fn fetch_scores(&self) -> Result<Vec<ScoreDraft>, ProviderError> {
        let raw: Vec<RawScore> = self.get_json("scores").await?;
        Ok(raw
            .into_iter()
            .map(|r| ScoreDraft {
                nj_key: r.nj_id,
                date: r.date,
                score: r.score,
                category: r.category,
                recordings_completed: r.recordings_completed,
            })
            .collect())
    }

    async fn fetch_leads(&self) -> Result<Vec<LeadDraft>, ProviderError> {
        let raw: Vec<RawLead> = self.get_json("leads").await?;
        Ok(raw
            .into_iter()
            .map(|r| LeadDraft {
                nj_key: r.nj_id,
                lead_id: r.lead_id,
                allocated_date: r.allocated_date,
                last_action_date: r.last_action_date,
                status: r.status,
                tat_hours: r.tat_hours,
                tat_breached: r.tat_breached,
                is_self_gen: r.is_self_gen,
            })
            .collect())
    }

    async fn fetch_revenue(&self) -> Result<Vec<RevenueDraft>, ProviderError> {
        let raw: Vec<RawRevenue> = self.get_json("revenue").await?;
        Ok(raw
            .into_iter()
            .map(|r| RevenueDraft {
                nj_key: r.nj_id,
                month: r.month,
                year: r.year,
                value: r.value,
                source: match r.source.as_deref() {
                    Some("manual") => RevenueSource::Manual,
                    _ => RevenueSource::Synced,
                },
            })
            .collect())
    }

    async fn fetch_roi(&self) -> Result<Vec<RoiDraft>, ProviderError> {
        let raw: Vec<RawRoi> = self.get_json("roi").await?;
        Ok(raw
            .into_iter()
            .map(|r| RoiDraft {
                nj_key: r.nj_id,
                week_start: r.week_start,
                value: r.value,
                color_code: r.color_code,
            })
            .collect())
    }

    async fn fetch_claims(&self) -> Result<Vec<ClaimDraft>, ProviderError> {
        let raw: Vec<RawClaim> = self.get_json("claims").await?;
        Ok(raw
            .into_iter()
            .map(|r| ClaimDraft {
                nj_key: r.nj_id,
                corporate_name: r.corporate_name,
                claim_date: r.claim_date,
                status: r.status,
                revenue_linked: r.revenue_linked,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn mode_defaults_to_mock() {
        assert_eq!(ProviderMode::parse(None), ProviderMode::Mock);
        assert_eq!(ProviderMode::parse(Some("sheets")), ProviderMode::Sheets);
        assert_eq!(ProviderMode::parse(Some("live")), ProviderMode::Live);
        assert_eq!(ProviderMode::parse(Some("anything")), ProviderMode::Mock);
    }

    #[tokio::test]
    async fn mock_cohort_is_deterministic_for_a_fixed_anchor() {
        let provider = MockProvider::anchored(date(2026, 4, 1));
        let a = provider.fetch_revenue().await.unwrap();
        let b = provider.fetch_revenue().await.unwrap();
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[tokio::test]
    async fn mock_exit_persona_has_negative_prev_month_and_red_latest_roi() {
        let today = date(2026, 4, 1);
        let provider = MockProvider::anchored(today);

        let (py, pm) = previous_calendar_month(today);
        let prev_month_nr = provider
            .fetch_revenue()
            .await
            .unwrap()
            .into_iter()
            .find(|r| r.nj_key == "E1005" && r.year == py && r.month == pm)
            .unwrap();
        assert!(prev_month_nr.value < 0.0);

        let roi = provider.fetch_roi().await.unwrap();
        let latest = roi
            .iter()
            .filter(|r| r.nj_key == "E1005")
            .max_by_key(|r| r.week_start)
            .unwrap();
        assert_eq!(latest.color_code, RoiColor::Red);
    }

    #[tokio::test]
    async fn mock_roi_weeks_are_monday_aligned() {
        let provider = MockProvider::anchored(date(2026, 4, 1));
        for draft in provider.fetch_roi().await.unwrap() {
            assert_eq!(
                draft.week_start.weekday(),
                chrono::Weekday::Mon,
                "week start {} is not a Monday",
                draft.week_start
            );
        }
    }

    #[test]
    fn revenue_csv_parses_values_and_source() {
        let text = "njId,month,year,value,source\nE1001,3,2026,1250.5,synced\nE1002,3,2026,-80,manual\n";
        let drafts = parse_revenue_csv(text).unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].value, 1250.5);
        assert_eq!(drafts[0].source, RevenueSource::Synced);
        assert_eq!(drafts[1].source, RevenueSource::Manual);
        assert_eq!(drafts[1].value, -80.0);
    }

    #[test]
    fn new_joiner_csv_handles_quoted_names_and_status() {
        let text = "empId,name,department,managerName,location,email,joinDate,status\n\
                    E1001,\"Pillai, Asha\",Field Sales,,Mumbai,,2026-01-05,active\n\
                    E1002,Rohan Mehta,,,,,2025-11-20,exited\n";
        let drafts = parse_new_joiners_csv(text).unwrap();
        assert_eq!(drafts[0].name, "Pillai, Asha");
        assert!(drafts[0].active);
        assert!(!drafts[1].active);
        assert_eq!(drafts[1].join_date, date(2025, 11, 20));
    }

    #[test]
    fn roi_csv_rejects_unknown_color_codes() {
        let text = "njId,weekStart,value,colorCode\nE1001,2026-03-23,1.2,Purple\n";
        let err = parse_roi_csv(text).unwrap_err();
        assert!(matches!(err, ProviderError::Malformed { domain: "roi", .. }));
    }

    #[test]
    fn csv_with_ragged_rows_is_malformed() {
        let text = "njId,month,year,value\nE1001,3,2026\n";
        assert!(parse_revenue_csv(text).is_err());
    }

    #[test]
    fn empty_csv_yields_no_rows() {
        assert!(parse_revenue_csv("").unwrap().is_empty());
        assert!(parse_revenue_csv("njId,month,year,value\n").unwrap().is_empty());
    }
}
