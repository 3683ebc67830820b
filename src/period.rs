use crate::errors::DashboardError;
use crate::models::{MonthGroup, Period, WeekId};
use crate::source::DataSource;
use tracing::{info, warn};

/// The known weeks and months, both most recent first.
///
/// Replaced wholesale on reload; there is no patching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodStore {
    periods: Vec<Period>,
    months: Vec<MonthGroup>,
}

impl PeriodStore {
    pub fn new(periods: Vec<Period>, months: Vec<MonthGroup>) -> Self {
        let months = months
            .into_iter()
            .filter(|month| {
                if month.week_ids.is_empty() {
                    warn!(month = %month.label, "dropping month without weeks");
                    false
                } else {
                    true
                }
            })
            .collect();
        Self { periods, months }
    }

    /// Fetches weeks and months concurrently. Either failure fails the load.
    pub async fn load(source: &dyn DataSource) -> Result<Self, DashboardError> {
        let (periods, months) = tokio::try_join!(source.weeks(), source.months())?;
        info!(
            weeks = periods.len(),
            months = months.len(),
            "loaded reporting periods"
        );
        Ok(Self::new(periods, months))
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn months(&self) -> &[MonthGroup] {
        &self.months
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Period at a slider position; 0 is the most recent week.
    pub fn period_at(&self, reverse_index: usize) -> Option<&Period> {
        self.periods.get(reverse_index)
    }

    pub fn position_of(&self, week_id: WeekId) -> Option<usize> {
        self.periods.iter().position(|period| period.week_id == week_id)
    }

    pub fn max_slider_index(&self) -> Option<usize> {
        self.periods.len().checked_sub(1)
    }
}
