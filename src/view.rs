use crate::errors::DashboardError;
use crate::models::WeekId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Currency,
    Percent,
    Hours,
    Count,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiCard {
    pub key: &'static str,
    pub label: &'static str,
    pub value: Decimal,
    pub unit: Unit,
}

impl KpiCard {
    pub fn new(key: &'static str, label: &'static str, value: Decimal, unit: Unit) -> Self {
        Self {
            key,
            label,
            value,
            unit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub key: &'static str,
    pub name: &'static str,
    pub kind: ChartKind,
    pub points: Vec<ChartPoint>,
}

impl Series {
    pub fn new(
        key: &'static str,
        name: &'static str,
        kind: ChartKind,
        points: impl IntoIterator<Item = (String, Decimal)>,
    ) -> Self {
        Self {
            key,
            name,
            kind,
            points: points
                .into_iter()
                .map(|(label, value)| ChartPoint { label, value })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Cell {
    Text(String),
    Number(Decimal),
    Empty,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn opt_text(value: Option<&str>) -> Self {
        value.map_or(Self::Empty, Self::text)
    }

    pub fn opt_number(value: Option<Decimal>) -> Self {
        value.map_or(Self::Empty, Self::Number)
    }

    fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
            _ => Ordering::Equal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub key: &'static str,
    pub label: &'static str,
    pub numeric: bool,
}

impl Column {
    pub const fn text(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            numeric: false,
        }
    }

    pub const fn number(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            numeric: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = DashboardError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(DashboardError::invalid(format!(
                "sort order must be 'asc' or 'desc', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    pub column: &'static str,
    pub order: SortOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub key: &'static str,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
    pub sort: Option<SortSpec>,
}

impl Table {
    pub fn new(key: &'static str, columns: Vec<Column>) -> Self {
        Self {
            key,
            columns,
            rows: Vec::new(),
            sort: None,
        }
    }

    pub fn push(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// Stable sort on one column. Empty cells stay at the bottom in both
    /// directions.
    pub fn sort_by(&mut self, column: &str, order: SortOrder) -> Result<(), DashboardError> {
        let (index, key) = self
            .columns
            .iter()
            .enumerate()
            .find(|(_, candidate)| candidate.key == column)
            .map(|(index, candidate)| (index, candidate.key))
            .ok_or_else(|| {
                DashboardError::invalid(format!("table '{}' has no column '{column}'", self.key))
            })?;

        self.rows.sort_by(|a, b| {
            let (left, right) = (&a[index], &b[index]);
            match (left.is_empty(), right.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => match order {
                    SortOrder::Asc => left.compare(right),
                    SortOrder::Desc => right.compare(left),
                },
            }
        });
        self.sort = Some(SortSpec { column: key, order });
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewView {
    pub week_ids: Vec<WeekId>,
    pub cards: Vec<KpiCard>,
    pub margin_trend: Series,
    pub revenue_trend: Series,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueView {
    pub week_ids: Vec<WeekId>,
    pub cards: Vec<KpiCard>,
    pub by_product: Series,
    pub table: Table,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarginView {
    pub week_ids: Vec<WeekId>,
    pub cards: Vec<KpiCard>,
    pub by_product: Series,
    pub trend: Series,
    pub table: Table,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaborView {
    pub week_ids: Vec<WeekId>,
    pub cards: Vec<KpiCard>,
    pub top_jobs: Series,
    pub table: Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DrillLevel {
    Product,
    Category,
    Job,
}

impl DrillLevel {
    /// Level reached by clicking a row of this level's table.
    pub fn child(self) -> Option<Self> {
        match self {
            Self::Product => Some(Self::Category),
            Self::Category => Some(Self::Job),
            Self::Job => None,
        }
    }
}

/// One step of the product group > category > job drill-down.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrillView {
    pub week_id: WeekId,
    pub level: DrillLevel,
    pub subject: String,
    pub drill_into: Option<DrillLevel>,
    pub cards: Vec<KpiCard>,
    pub table: Table,
}

/// Finished view model for one page, handed to the renderer as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "page", rename_all = "lowercase")]
pub enum PageView {
    Overview(OverviewView),
    Revenue(RevenueView),
    Margin(MarginView),
    Labor(LaborView),
}

impl PageView {
    pub fn tables_mut(&mut self) -> Vec<&mut Table> {
        match self {
            Self::Overview(_) => Vec::new(),
            Self::Revenue(view) => vec![&mut view.table],
            Self::Margin(view) => vec![&mut view.table],
            Self::Labor(view) => vec![&mut view.table],
        }
    }

    pub fn sort_table(
        &mut self,
        table: &str,
        column: &str,
        order: SortOrder,
    ) -> Result<(), DashboardError> {
        self.tables_mut()
            .into_iter()
            .find(|candidate| candidate.key == table)
            .ok_or_else(|| DashboardError::invalid(format!("no table named '{table}' on this page")))?
            .sort_by(column, order)
    }
}
