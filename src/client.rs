use crate::config::Config;
use crate::errors::DashboardError;
use crate::models::{
    DrillProductGroup, JobDetail, LaborStatus, LaborSummary, MarginSummary, MarginTrendPoint,
    MonthGroup, Period, RevenueSummary, RevenueTrendPoint, WeekId,
};
use crate::source::DataSource;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error};

/// HTTP implementation of [`DataSource`] against the KPI REST API.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DashboardError> {
        let base_url = Url::parse(base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| {
                DashboardError::DataUnavailable(format!("invalid api base url '{base_url}'"))
            })?;
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, DashboardError> {
        Self::new(
            &config.api_base_url,
            config.api_token.clone(),
            config.request_timeout,
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, DashboardError> {
        let url = self.endpoint(segments);
        debug!(%url, ?query, "fetching");

        let mut request = self.http.get(url.clone()).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| {
                error!(%url, "upstream request failed: {err}");
                DashboardError::from(err)
            })?;

        response.json::<T>().await.map_err(|err| {
            error!(%url, "failed to decode upstream response: {err}");
            DashboardError::from(err)
        })
    }
}

#[async_trait]
impl DataSource for ApiClient {
    async fn weeks(&self) -> Result<Vec<Period>, DashboardError> {
        self.get_json(&["api", "weeks"], &[]).await
    }

    async fn months(&self) -> Result<Vec<MonthGroup>, DashboardError> {
        self.get_json(&["api", "weeks", "months"], &[]).await
    }

    async fn revenue(&self, week_id: WeekId) -> Result<RevenueSummary, DashboardError> {
        self.get_json(&["api", "revenue"], &[("week_id", week_id.to_string())])
            .await
    }

    async fn revenue_trend(&self, weeks: u32) -> Result<Vec<RevenueTrendPoint>, DashboardError> {
        self.get_json(&["api", "revenue", "trend"], &[("weeks", weeks.to_string())])
            .await
    }

    async fn margin(&self, week_id: WeekId) -> Result<MarginSummary, DashboardError> {
        self.get_json(&["api", "margin"], &[("week_id", week_id.to_string())])
            .await
    }

    async fn margin_trend(&self, weeks: u32) -> Result<Vec<MarginTrendPoint>, DashboardError> {
        self.get_json(&["api", "margin", "trend"], &[("weeks", weeks.to_string())])
            .await
    }

    async fn labor(
        &self,
        week_id: WeekId,
        status: LaborStatus,
    ) -> Result<LaborSummary, DashboardError> {
        self.get_json(
            &["api", "labor"],
            &[
                ("week_id", week_id.to_string()),
                ("status", status.to_string()),
            ],
        )
        .await
    }

    async fn drill_product_group(
        &self,
        product_group: &str,
        week_id: WeekId,
    ) -> Result<DrillProductGroup, DashboardError> {
        self.get_json(
            &["api", "drill", "product", product_group],
            &[("week_id", week_id.to_string())],
        )
        .await
    }

    async fn drill_category(
        &self,
        category: &str,
        week_id: WeekId,
    ) -> Result<Vec<JobDetail>, DashboardError> {
        self.get_json(
            &["api", "drill", "category", category],
            &[("week_id", week_id.to_string())],
        )
        .await
    }

    async fn drill_job(
        &self,
        job_num: &str,
        week_id: WeekId,
    ) -> Result<JobDetail, DashboardError> {
        self.get_json(
            &["api", "drill", "job", job_num],
            &[("week_id", week_id.to_string())],
        )
        .await
    }
}
