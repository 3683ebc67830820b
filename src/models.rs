use crate::errors::DashboardError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub type WeekId = i64;

/// One weekly reporting interval, as listed by `/api/weeks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub week_id: WeekId,
    pub label: String,
}

/// A calendar month and the weeks it covers, most recent week first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthGroup {
    pub label: String,
    pub week_ids: Vec<WeekId>,
}

impl MonthGroup {
    /// Dropdown encoding of the group: the week ids joined by commas.
    pub fn encoded(&self) -> String {
        self.week_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaborStatus {
    #[default]
    All,
    Wip,
    Completed,
}

impl LaborStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Wip => "wip",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for LaborStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LaborStatus {
    type Err = DashboardError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "all" => Ok(Self::All),
            "wip" => Ok(Self::Wip),
            "completed" => Ok(Self::Completed),
            other => Err(DashboardError::invalid(format!(
                "labor status must be 'all', 'wip' or 'completed', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueByProduct {
    pub product_group: String,
    pub direction: Direction,
    pub revenue: Decimal,
    #[serde(default)]
    pub order_count: u64,
    #[serde(default)]
    pub target_margin: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueSummary {
    pub total_inbound: Decimal,
    pub total_outbound: Decimal,
    #[serde(default)]
    pub order_count: Option<u64>,
    #[serde(default)]
    pub by_product: Vec<RevenueByProduct>,
}

impl RevenueSummary {
    /// Order count as reported, or summed from the product rows when the
    /// upstream leaves it out.
    pub fn orders(&self) -> u64 {
        self.order_count
            .unwrap_or_else(|| self.by_product.iter().map(|row| row.order_count).sum())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueTrendPoint {
    pub week_id: WeekId,
    pub iso_year: i32,
    pub iso_week: u32,
    pub inbound_revenue: Decimal,
    pub outbound_revenue: Decimal,
    pub total_revenue: Decimal,
}

impl RevenueTrendPoint {
    pub fn label(&self) -> String {
        format!("{}-W{:02}", self.iso_year, self.iso_week)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginByProduct {
    pub product_group: String,
    pub revenue: Decimal,
    pub total_cost: Decimal,
    pub gross_margin: Decimal,
    pub margin_percent: Decimal,
    #[serde(default)]
    pub target_margin: Option<Decimal>,
    #[serde(default)]
    pub variance: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginSummary {
    pub overall_margin_percent: Decimal,
    pub total_revenue: Decimal,
    pub total_cost: Decimal,
    #[serde(default)]
    pub overall_margin: Option<Decimal>,
    #[serde(default)]
    pub by_product: Vec<MarginByProduct>,
}

impl MarginSummary {
    pub fn gross_margin(&self) -> Decimal {
        self.overall_margin
            .unwrap_or(self.total_revenue - self.total_cost)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginTrendPoint {
    pub label: String,
    pub margin_percent: Decimal,
    #[serde(default)]
    pub week_id: Option<WeekId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaborByJob {
    pub job_num: String,
    #[serde(default)]
    pub sales_order_num: Option<String>,
    #[serde(default)]
    pub product_group: Option<String>,
    #[serde(default)]
    pub job_closed: bool,
    #[serde(default)]
    pub labor_hours: Decimal,
    #[serde(default)]
    pub burden_hours: Decimal,
    pub direct_labor: Decimal,
    pub burden: Decimal,
    pub total_labor: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaborSummary {
    pub total_direct_labor: Decimal,
    #[serde(default)]
    pub total_labor_hours: Decimal,
    pub total_burden: Decimal,
    #[serde(default)]
    pub total_burden_hours: Decimal,
    pub total_labor_cost: Decimal,
    pub job_count: u64,
    #[serde(default)]
    pub by_job: Vec<LaborByJob>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillCategory {
    pub category: String,
    pub revenue: Decimal,
    pub cost: Decimal,
    pub margin: Decimal,
    pub margin_percent: Decimal,
    #[serde(default)]
    pub job_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillProductGroup {
    pub product_group: String,
    pub total_revenue: Decimal,
    pub total_cost: Decimal,
    pub total_margin: Decimal,
    pub margin_percent: Decimal,
    #[serde(default)]
    pub categories: Vec<DrillCategory>,
}

/// Cost breakdown for one job, as returned by the category and job drills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDetail {
    pub job_num: String,
    #[serde(default)]
    pub sales_order_num: Option<String>,
    #[serde(default)]
    pub part_num: Option<String>,
    #[serde(default)]
    pub product_group: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub direct_labor: Decimal,
    #[serde(default)]
    pub burden: Decimal,
    #[serde(default)]
    pub material_cost: Decimal,
    #[serde(default)]
    pub total_cost: Decimal,
    #[serde(default)]
    pub revenue: Option<Decimal>,
    #[serde(default)]
    pub gross_margin: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct GranularityRequest {
    pub mode: String,
}

#[derive(Debug, Deserialize)]
pub struct PeriodRequest {
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct SliderRequest {
    pub index: i64,
}

#[derive(Debug, Deserialize)]
pub struct LaborStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct SortRequest {
    pub table: String,
    pub column: String,
    #[serde(default)]
    pub order: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn month_group_encodes_week_ids_in_order() {
        let group = MonthGroup {
            label: "Dec 2025".to_string(),
            week_ids: vec![5, 4, 3],
        };
        assert_eq!(group.encoded(), "5,4,3");
    }

    #[test]
    fn revenue_summary_accepts_string_and_number_amounts() {
        let body = r#"{
            "total_inbound": "1200.50",
            "total_outbound": 980,
            "by_product": [
                {"product_group": "Valves", "direction": "outbound", "revenue": "980", "order_count": 4}
            ]
        }"#;
        let summary: RevenueSummary = serde_json::from_str(body).unwrap();
        assert_eq!(summary.total_inbound, dec!(1200.50));
        assert_eq!(summary.total_outbound, dec!(980));
        assert_eq!(summary.orders(), 4);
    }

    #[test]
    fn labor_status_parses_known_values_only() {
        assert_eq!("wip".parse::<LaborStatus>().unwrap(), LaborStatus::Wip);
        assert!(matches!(
            "open".parse::<LaborStatus>(),
            Err(DashboardError::InvalidSelection(_))
        ));
    }
}
