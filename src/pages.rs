//! Page loaders backed by the upstream API, plus the folding of several
//! weeks into one figure set for monthly selections.

use crate::dispatch::{PageLoader, PageLoaders, ReloadArgs};
use crate::errors::DashboardError;
use crate::models::{
    Direction, DrillProductGroup, JobDetail, LaborByJob, LaborStatus, LaborSummary,
    MarginByProduct, MarginSummary, RevenueByProduct, RevenueSummary, WeekId,
};
use crate::source::DataSource;
use crate::view::{
    Cell, ChartKind, Column, DrillLevel, DrillView, KpiCard, LaborView, MarginView, OverviewView,
    PageView, RevenueView, Series, SortOrder, Table, Unit,
};
use async_trait::async_trait;
use futures::future::try_join_all;
use rust_decimal::Decimal;
use std::{collections::BTreeMap, sync::Arc};

const TOP_JOBS: usize = 10;

/// `(revenue - cost) / revenue * 100`, two places, zero without revenue.
pub fn margin_percent(revenue: Decimal, cost: Decimal) -> Decimal {
    if revenue.is_zero() {
        return Decimal::ZERO;
    }
    ((revenue - cost) / revenue * Decimal::ONE_HUNDRED).round_dp(2)
}

pub fn aggregate_revenue(mut weeks: Vec<RevenueSummary>) -> RevenueSummary {
    if weeks.len() == 1 {
        return weeks.remove(0);
    }

    let mut by_key: BTreeMap<(String, Direction), RevenueByProduct> = BTreeMap::new();
    let mut total_inbound = Decimal::ZERO;
    let mut total_outbound = Decimal::ZERO;
    let mut order_count = 0u64;

    for week in weeks {
        total_inbound += week.total_inbound;
        total_outbound += week.total_outbound;
        order_count += week.orders();
        for row in week.by_product {
            let key = (row.product_group.clone(), row.direction);
            match by_key.get_mut(&key) {
                Some(entry) => {
                    entry.revenue += row.revenue;
                    entry.order_count += row.order_count;
                    entry.target_margin = entry.target_margin.or(row.target_margin);
                }
                None => {
                    by_key.insert(key, row);
                }
            }
        }
    }

    RevenueSummary {
        total_inbound,
        total_outbound,
        order_count: Some(order_count),
        by_product: by_key.into_values().collect(),
    }
}

pub fn aggregate_margin(mut weeks: Vec<MarginSummary>) -> MarginSummary {
    if weeks.len() == 1 {
        return weeks.remove(0);
    }

    let mut by_group: BTreeMap<String, (Decimal, Decimal, Option<Decimal>)> = BTreeMap::new();
    for row in weeks.iter().flat_map(|week| week.by_product.iter()) {
        let entry = by_group
            .entry(row.product_group.clone())
            .or_insert((Decimal::ZERO, Decimal::ZERO, None));
        entry.0 += row.revenue;
        entry.1 += row.total_cost;
        entry.2 = entry.2.or(row.target_margin);
    }

    let total_revenue: Decimal = weeks.iter().map(|week| week.total_revenue).sum();
    let total_cost: Decimal = weeks.iter().map(|week| week.total_cost).sum();

    let by_product = by_group
        .into_iter()
        .map(|(product_group, (revenue, total_cost, target_margin))| {
            let margin_percent = margin_percent(revenue, total_cost);
            MarginByProduct {
                product_group,
                revenue,
                total_cost,
                gross_margin: revenue - total_cost,
                margin_percent,
                target_margin,
                variance: target_margin
                    .map(|target| margin_percent - target * Decimal::ONE_HUNDRED),
            }
        })
        .collect();

    MarginSummary {
        overall_margin_percent: margin_percent(total_revenue, total_cost),
        total_revenue,
        total_cost,
        overall_margin: Some(total_revenue - total_cost),
        by_product,
    }
}

pub fn aggregate_labor(mut weeks: Vec<LaborSummary>) -> LaborSummary {
    if weeks.len() == 1 {
        return weeks.remove(0);
    }

    let mut by_job: BTreeMap<String, LaborByJob> = BTreeMap::new();
    let mut total = LaborSummary {
        total_direct_labor: Decimal::ZERO,
        total_labor_hours: Decimal::ZERO,
        total_burden: Decimal::ZERO,
        total_burden_hours: Decimal::ZERO,
        total_labor_cost: Decimal::ZERO,
        job_count: 0,
        by_job: Vec::new(),
    };
    let mut busiest_week_jobs = 0u64;

    for week in weeks {
        total.total_direct_labor += week.total_direct_labor;
        total.total_labor_hours += week.total_labor_hours;
        total.total_burden += week.total_burden;
        total.total_burden_hours += week.total_burden_hours;
        total.total_labor_cost += week.total_labor_cost;
        busiest_week_jobs = busiest_week_jobs.max(week.job_count);
        for job in week.by_job {
            match by_job.get_mut(&job.job_num) {
                Some(entry) => {
                    entry.labor_hours += job.labor_hours;
                    entry.burden_hours += job.burden_hours;
                    entry.direct_labor += job.direct_labor;
                    entry.burden += job.burden;
                    entry.total_labor += job.total_labor;
                    entry.job_closed = job.job_closed;
                }
                None => {
                    by_job.insert(job.job_num.clone(), job);
                }
            }
        }
    }

    // Upstream counts distinct jobs per week and may truncate the job rows.
    total.job_count = busiest_week_jobs.max(by_job.len() as u64);

    let mut jobs: Vec<LaborByJob> = by_job.into_values().collect();
    jobs.sort_by(|a, b| b.total_labor.cmp(&a.total_labor));
    total.by_job = jobs;
    total
}

async fn fetch_each<T, F, Fut>(week_ids: &[WeekId], fetch: F) -> Result<Vec<T>, DashboardError>
where
    F: Fn(WeekId) -> Fut,
    Fut: std::future::Future<Output = Result<T, DashboardError>>,
{
    if week_ids.is_empty() {
        return Err(DashboardError::invalid("selection has no weeks"));
    }
    try_join_all(week_ids.iter().copied().map(fetch)).await
}

async fn revenue_for(
    source: &dyn DataSource,
    week_ids: &[WeekId],
) -> Result<RevenueSummary, DashboardError> {
    fetch_each(week_ids, |week_id| source.revenue(week_id))
        .await
        .map(aggregate_revenue)
}

async fn margin_for(
    source: &dyn DataSource,
    week_ids: &[WeekId],
) -> Result<MarginSummary, DashboardError> {
    fetch_each(week_ids, |week_id| source.margin(week_id))
        .await
        .map(aggregate_margin)
}

async fn labor_for(
    source: &dyn DataSource,
    week_ids: &[WeekId],
    status: LaborStatus,
) -> Result<LaborSummary, DashboardError> {
    fetch_each(week_ids, |week_id| source.labor(week_id, status))
        .await
        .map(aggregate_labor)
}

fn revenue_cards(revenue: &RevenueSummary) -> Vec<KpiCard> {
    vec![
        KpiCard::new(
            "outbound_revenue",
            "Outbound Revenue",
            revenue.total_outbound,
            Unit::Currency,
        ),
        KpiCard::new(
            "inbound_revenue",
            "Inbound Revenue",
            revenue.total_inbound,
            Unit::Currency,
        ),
        KpiCard::new(
            "order_count",
            "Orders",
            Decimal::from(revenue.orders()),
            Unit::Count,
        ),
    ]
}

fn margin_cards(margin: &MarginSummary) -> Vec<KpiCard> {
    vec![
        KpiCard::new(
            "margin_percent",
            "Gross Margin %",
            margin.overall_margin_percent,
            Unit::Percent,
        ),
        KpiCard::new(
            "gross_margin",
            "Gross Margin",
            margin.gross_margin(),
            Unit::Currency,
        ),
        KpiCard::new("total_revenue", "Revenue", margin.total_revenue, Unit::Currency),
        KpiCard::new("total_cost", "Total Cost", margin.total_cost, Unit::Currency),
    ]
}

fn labor_cards(labor: &LaborSummary) -> Vec<KpiCard> {
    vec![
        KpiCard::new(
            "direct_labor",
            "Direct Labor",
            labor.total_direct_labor,
            Unit::Currency,
        ),
        KpiCard::new("burden", "Burden", labor.total_burden, Unit::Currency),
        KpiCard::new(
            "labor_cost",
            "Total Labor Cost",
            labor.total_labor_cost,
            Unit::Currency,
        ),
        KpiCard::new(
            "labor_hours",
            "Labor Hours",
            labor.total_labor_hours,
            Unit::Hours,
        ),
        KpiCard::new(
            "burden_hours",
            "Burden Hours",
            labor.total_burden_hours,
            Unit::Hours,
        ),
        KpiCard::new(
            "job_count",
            "Jobs",
            Decimal::from(labor.job_count),
            Unit::Count,
        ),
    ]
}

fn revenue_table(revenue: &RevenueSummary) -> Result<Table, DashboardError> {
    let mut table = Table::new(
        "revenue_by_product",
        vec![
            Column::text("product_group", "Product Group"),
            Column::text("direction", "Direction"),
            Column::number("revenue", "Revenue"),
            Column::number("order_count", "Orders"),
            Column::number("target_margin", "Target Margin"),
        ],
    );
    for row in &revenue.by_product {
        table.push(vec![
            Cell::text(row.product_group.as_str()),
            Cell::text(match row.direction {
                Direction::Inbound => "inbound",
                Direction::Outbound => "outbound",
            }),
            Cell::Number(row.revenue),
            Cell::Number(Decimal::from(row.order_count)),
            Cell::opt_number(row.target_margin),
        ]);
    }
    sorted(table, "revenue")
}

fn margin_table(margin: &MarginSummary) -> Table {
    let mut table = Table::new(
        "margin_by_product",
        vec![
            Column::text("product_group", "Product Group"),
            Column::number("revenue", "Revenue"),
            Column::number("total_cost", "Cost"),
            Column::number("gross_margin", "Gross Margin"),
            Column::number("margin_percent", "Margin %"),
            Column::number("target_margin", "Target"),
            Column::number("variance", "Variance"),
        ],
    );
    for row in &margin.by_product {
        table.push(vec![
            Cell::text(row.product_group.as_str()),
            Cell::Number(row.revenue),
            Cell::Number(row.total_cost),
            Cell::Number(row.gross_margin),
            Cell::Number(row.margin_percent),
            Cell::opt_number(row.target_margin.map(|target| target * Decimal::ONE_HUNDRED)),
            Cell::opt_number(row.variance),
        ]);
    }
    table
}

fn labor_table(labor: &LaborSummary) -> Result<Table, DashboardError> {
    let mut table = Table::new(
        "labor_by_job",
        vec![
            Column::text("job_num", "Job"),
            Column::text("sales_order_num", "Sales Order"),
            Column::text("product_group", "Product Group"),
            Column::text("status", "Status"),
            Column::number("labor_hours", "Labor Hrs"),
            Column::number("burden_hours", "Burden Hrs"),
            Column::number("direct_labor", "Direct Labor"),
            Column::number("burden", "Burden"),
            Column::number("total_labor", "Total"),
        ],
    );
    for job in &labor.by_job {
        table.push(vec![
            Cell::text(job.job_num.as_str()),
            Cell::opt_text(job.sales_order_num.as_deref()),
            Cell::opt_text(job.product_group.as_deref()),
            Cell::text(if job.job_closed { "completed" } else { "wip" }),
            Cell::Number(job.labor_hours),
            Cell::Number(job.burden_hours),
            Cell::Number(job.direct_labor),
            Cell::Number(job.burden),
            Cell::Number(job.total_labor),
        ]);
    }
    sorted(table, "total_labor")
}

fn sorted(mut table: Table, column: &str) -> Result<Table, DashboardError> {
    table.sort_by(column, SortOrder::Desc)?;
    Ok(table)
}

pub struct OverviewLoader {
    source: Arc<dyn DataSource>,
    trend_weeks: u32,
}

#[async_trait]
impl PageLoader for OverviewLoader {
    async fn load(&self, args: &ReloadArgs) -> Result<PageView, DashboardError> {
        let source = self.source.as_ref();
        let weeks = &args.group_week_ids;
        let (revenue, margin, labor, margin_trend, revenue_trend) = tokio::try_join!(
            revenue_for(source, weeks),
            margin_for(source, weeks),
            labor_for(source, weeks, LaborStatus::All),
            source.margin_trend(self.trend_weeks),
            source.revenue_trend(self.trend_weeks),
        )?;

        let mut cards = revenue_cards(&revenue);
        cards.truncate(2);
        cards.push(margin_cards(&margin).swap_remove(0));
        cards.push(KpiCard::new(
            "labor_cost",
            "Total Labor Cost",
            labor.total_labor_cost,
            Unit::Currency,
        ));
        cards.push(KpiCard::new(
            "job_count",
            "Jobs",
            Decimal::from(labor.job_count),
            Unit::Count,
        ));

        Ok(PageView::Overview(OverviewView {
            week_ids: weeks.clone(),
            cards,
            margin_trend: Series::new(
                "margin_trend",
                "Gross Margin %",
                ChartKind::Line,
                margin_trend
                    .into_iter()
                    .map(|point| (point.label, point.margin_percent)),
            ),
            revenue_trend: Series::new(
                "revenue_trend",
                "Revenue",
                ChartKind::Bar,
                revenue_trend
                    .into_iter()
                    .map(|point| (point.label(), point.total_revenue)),
            ),
        }))
    }
}

pub struct RevenueLoader {
    source: Arc<dyn DataSource>,
}

#[async_trait]
impl PageLoader for RevenueLoader {
    async fn load(&self, args: &ReloadArgs) -> Result<PageView, DashboardError> {
        let revenue = revenue_for(self.source.as_ref(), &args.group_week_ids).await?;

        let mut outbound: BTreeMap<&str, Decimal> = BTreeMap::new();
        for row in revenue
            .by_product
            .iter()
            .filter(|row| row.direction == Direction::Outbound)
        {
            *outbound.entry(row.product_group.as_str()).or_default() += row.revenue;
        }
        let by_product = Series::new(
            "revenue_by_product",
            "Outbound Revenue",
            ChartKind::Bar,
            outbound
                .into_iter()
                .map(|(group, value)| (group.to_string(), value)),
        );

        Ok(PageView::Revenue(RevenueView {
            week_ids: args.group_week_ids.clone(),
            cards: revenue_cards(&revenue),
            by_product,
            table: revenue_table(&revenue)?,
        }))
    }
}

pub struct MarginLoader {
    source: Arc<dyn DataSource>,
    trend_weeks: u32,
}

#[async_trait]
impl PageLoader for MarginLoader {
    async fn load(&self, args: &ReloadArgs) -> Result<PageView, DashboardError> {
        let source = self.source.as_ref();
        let (margin, trend) = tokio::try_join!(
            margin_for(source, &args.group_week_ids),
            source.margin_trend(self.trend_weeks),
        )?;

        Ok(PageView::Margin(MarginView {
            week_ids: args.group_week_ids.clone(),
            cards: margin_cards(&margin),
            by_product: Series::new(
                "margin_by_product",
                "Margin %",
                ChartKind::Bar,
                margin
                    .by_product
                    .iter()
                    .map(|row| (row.product_group.clone(), row.margin_percent)),
            ),
            trend: Series::new(
                "margin_trend",
                "Gross Margin %",
                ChartKind::Line,
                trend
                    .into_iter()
                    .map(|point| (point.label, point.margin_percent)),
            ),
            table: margin_table(&margin),
        }))
    }
}

pub struct LaborLoader {
    source: Arc<dyn DataSource>,
}

#[async_trait]
impl PageLoader for LaborLoader {
    async fn load(&self, args: &ReloadArgs) -> Result<PageView, DashboardError> {
        let labor = labor_for(
            self.source.as_ref(),
            &args.group_week_ids,
            args.labor_status,
        )
        .await?;

        Ok(PageView::Labor(LaborView {
            week_ids: args.group_week_ids.clone(),
            cards: labor_cards(&labor),
            top_jobs: Series::new(
                "top_jobs",
                "Total Labor",
                ChartKind::Bar,
                labor
                    .by_job
                    .iter()
                    .take(TOP_JOBS)
                    .map(|job| (job.job_num.clone(), job.total_labor)),
            ),
            table: labor_table(&labor)?,
        }))
    }
}

/// The four API-backed loaders sharing one data source.
pub fn api_loaders(source: Arc<dyn DataSource>, trend_weeks: u32) -> PageLoaders {
    PageLoaders {
        overview: Arc::new(OverviewLoader {
            source: source.clone(),
            trend_weeks,
        }),
        revenue: Arc::new(RevenueLoader {
            source: source.clone(),
        }),
        margin: Arc::new(MarginLoader {
            source: source.clone(),
            trend_weeks,
        }),
        labor: Arc::new(LaborLoader { source }),
    }
}

pub async fn load_product_drill(
    source: &dyn DataSource,
    product_group: &str,
    week_id: WeekId,
) -> Result<DrillView, DashboardError> {
    let drill = source.drill_product_group(product_group, week_id).await?;
    Ok(product_drill_view(week_id, drill))
}

pub async fn load_category_drill(
    source: &dyn DataSource,
    category: &str,
    week_id: WeekId,
) -> Result<DrillView, DashboardError> {
    let jobs = source.drill_category(category, week_id).await?;
    Ok(category_drill_view(week_id, category, &jobs))
}

pub async fn load_job_drill(
    source: &dyn DataSource,
    job_num: &str,
    week_id: WeekId,
) -> Result<DrillView, DashboardError> {
    let job = source.drill_job(job_num, week_id).await?;
    Ok(job_drill_view(week_id, job))
}

fn drill(
    week_id: WeekId,
    level: DrillLevel,
    subject: String,
    cards: Vec<KpiCard>,
    table: Table,
) -> DrillView {
    DrillView {
        week_id,
        level,
        subject,
        drill_into: level.child(),
        cards,
        table,
    }
}

fn product_drill_view(week_id: WeekId, drill_group: DrillProductGroup) -> DrillView {
    let mut table = Table::new(
        "drill_categories",
        vec![
            Column::text("category", "Category"),
            Column::number("revenue", "Revenue"),
            Column::number("cost", "Cost"),
            Column::number("margin", "Margin"),
            Column::number("margin_percent", "Margin %"),
            Column::number("job_count", "Jobs"),
        ],
    );
    for category in &drill_group.categories {
        table.push(vec![
            Cell::text(category.category.as_str()),
            Cell::Number(category.revenue),
            Cell::Number(category.cost),
            Cell::Number(category.margin),
            Cell::Number(category.margin_percent),
            Cell::Number(Decimal::from(category.job_count)),
        ]);
    }

    let cards = vec![
        KpiCard::new("total_revenue", "Revenue", drill_group.total_revenue, Unit::Currency),
        KpiCard::new("total_cost", "Total Cost", drill_group.total_cost, Unit::Currency),
        KpiCard::new("total_margin", "Gross Margin", drill_group.total_margin, Unit::Currency),
        KpiCard::new(
            "margin_percent",
            "Gross Margin %",
            drill_group.margin_percent,
            Unit::Percent,
        ),
    ];
    drill(week_id, DrillLevel::Product, drill_group.product_group, cards, table)
}

fn category_drill_view(week_id: WeekId, category: &str, jobs: &[JobDetail]) -> DrillView {
    let mut table = Table::new(
        "drill_jobs",
        vec![
            Column::text("job_num", "Job"),
            Column::text("sales_order_num", "Sales Order"),
            Column::text("part_num", "Part"),
            Column::number("direct_labor", "Direct Labor"),
            Column::number("burden", "Burden"),
            Column::number("material_cost", "Material"),
            Column::number("total_cost", "Total Cost"),
        ],
    );
    for job in jobs {
        table.push(vec![
            Cell::text(job.job_num.as_str()),
            Cell::opt_text(job.sales_order_num.as_deref()),
            Cell::opt_text(job.part_num.as_deref()),
            Cell::Number(job.direct_labor),
            Cell::Number(job.burden),
            Cell::Number(job.material_cost),
            Cell::Number(job.total_cost),
        ]);
    }

    let cards = vec![
        KpiCard::new(
            "total_cost",
            "Total Cost",
            jobs.iter().map(|job| job.total_cost).sum(),
            Unit::Currency,
        ),
        KpiCard::new(
            "job_count",
            "Jobs",
            Decimal::from(jobs.len() as u64),
            Unit::Count,
        ),
    ];
    drill(week_id, DrillLevel::Category, category.to_string(), cards, table)
}

fn job_drill_view(week_id: WeekId, job: JobDetail) -> DrillView {
    let mut table = Table::new(
        "job_costs",
        vec![
            Column::text("component", "Component"),
            Column::number("amount", "Amount"),
        ],
    );
    for (label, amount) in [
        ("Direct Labor", job.direct_labor),
        ("Burden", job.burden),
        ("Material", job.material_cost),
        ("Total Cost", job.total_cost),
    ] {
        table.push(vec![Cell::text(label), Cell::Number(amount)]);
    }

    let mut cards = vec![KpiCard::new(
        "total_cost",
        "Total Cost",
        job.total_cost,
        Unit::Currency,
    )];
    if let Some(revenue) = job.revenue {
        cards.push(KpiCard::new("revenue", "Revenue", revenue, Unit::Currency));
    }
    if let Some(margin) = job.gross_margin {
        cards.push(KpiCard::new("gross_margin", "Gross Margin", margin, Unit::Currency));
    }
    drill(week_id, DrillLevel::Job, job.job_num, cards, table)
}
