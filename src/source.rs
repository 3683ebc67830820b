use crate::errors::DashboardError;
use crate::models::{
    DrillProductGroup, JobDetail, LaborStatus, LaborSummary, MarginSummary, MarginTrendPoint,
    MonthGroup, Period, RevenueSummary, RevenueTrendPoint, WeekId,
};
use async_trait::async_trait;

/// The upstream KPI API. Every figure the dashboard shows comes through here.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn weeks(&self) -> Result<Vec<Period>, DashboardError>;

    async fn months(&self) -> Result<Vec<MonthGroup>, DashboardError>;

    async fn revenue(&self, week_id: WeekId) -> Result<RevenueSummary, DashboardError>;

    async fn revenue_trend(&self, weeks: u32) -> Result<Vec<RevenueTrendPoint>, DashboardError>;

    async fn margin(&self, week_id: WeekId) -> Result<MarginSummary, DashboardError>;

    async fn margin_trend(&self, weeks: u32) -> Result<Vec<MarginTrendPoint>, DashboardError>;

    async fn labor(
        &self,
        week_id: WeekId,
        status: LaborStatus,
    ) -> Result<LaborSummary, DashboardError>;

    async fn drill_product_group(
        &self,
        product_group: &str,
        week_id: WeekId,
    ) -> Result<DrillProductGroup, DashboardError>;

    /// Jobs booked against one product category, highest cost first.
    async fn drill_category(
        &self,
        category: &str,
        week_id: WeekId,
    ) -> Result<Vec<JobDetail>, DashboardError>;

    async fn drill_job(
        &self,
        job_num: &str,
        week_id: WeekId,
    ) -> Result<JobDetail, DashboardError>;
}
