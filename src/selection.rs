//! Period selection: granularity toggle, period dropdown and timeline slider
//! kept consistent by one pure transition function.
//!
//! The slider always indexes the weekly period list in reverse chronological
//! order (0 is the most recent week). In monthly mode it is neither hidden nor
//! re-ranged, and scrubbing it pins the selection to a single week while the
//! granularity stays monthly. That mismatch is surfaced with a warning rather
//! than resolved here.

use crate::errors::DashboardError;
use crate::models::WeekId;
use crate::period::PeriodStore;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Weekly,
    Monthly,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = DashboardError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(DashboardError::invalid(format!(
                "granularity must be 'weekly' or 'monthly', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionState {
    pub granularity: Granularity,
    pub current_week_id: WeekId,
    pub current_group_week_ids: Vec<WeekId>,
    pub slider_index: usize,
    pub dropdown_value: String,
    pub slider_label: String,
}

impl SelectionState {
    /// Weekly mode on the most recent period, or `None` when no periods exist.
    pub fn initial(store: &PeriodStore) -> Option<Self> {
        let latest = store.period_at(0)?;
        Some(Self {
            granularity: Granularity::Weekly,
            current_week_id: latest.week_id,
            current_group_week_ids: vec![latest.week_id],
            slider_index: 0,
            dropdown_value: latest.week_id.to_string(),
            slider_label: latest.label.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorEvent {
    SetGranularity(Granularity),
    SelectByDropdown(String),
    SelectBySlider(usize),
}

/// Applies one widget event. On error the caller keeps its previous state.
pub fn transition(
    store: &PeriodStore,
    state: &SelectionState,
    event: &SelectorEvent,
) -> Result<SelectionState, DashboardError> {
    match event {
        SelectorEvent::SetGranularity(mode) => set_granularity(store, state, *mode),
        SelectorEvent::SelectByDropdown(value) => select_by_dropdown(store, state, value),
        SelectorEvent::SelectBySlider(index) => select_by_slider(store, state, *index),
    }
}

fn set_granularity(
    store: &PeriodStore,
    state: &SelectionState,
    mode: Granularity,
) -> Result<SelectionState, DashboardError> {
    match mode {
        Granularity::Weekly => {
            let latest = store
                .period_at(0)
                .ok_or_else(|| DashboardError::invalid("no weeks are available"))?;
            let mut next = pin_week(store, state, latest.week_id, 0);
            next.granularity = Granularity::Weekly;
            Ok(next)
        }
        Granularity::Monthly => {
            let latest = store
                .months()
                .first()
                .ok_or_else(|| DashboardError::invalid("no months are available"))?;
            Ok(SelectionState {
                granularity: Granularity::Monthly,
                current_week_id: latest.week_ids[0],
                current_group_week_ids: latest.week_ids.clone(),
                dropdown_value: latest.encoded(),
                ..state.clone()
            })
        }
    }
}

fn select_by_dropdown(
    store: &PeriodStore,
    state: &SelectionState,
    value: &str,
) -> Result<SelectionState, DashboardError> {
    match state.granularity {
        Granularity::Weekly => {
            let week_id = parse_week_id(value)?;
            let index = store.position_of(week_id).ok_or_else(|| {
                DashboardError::invalid(format!("week {week_id} is not a known period"))
            })?;
            Ok(pin_week(store, state, week_id, index))
        }
        Granularity::Monthly => {
            let week_ids = value
                .split(',')
                .map(parse_week_id)
                .collect::<Result<Vec<_>, _>>()?;
            // Only a listed month is a valid group; this also rules out
            // unknown and repeated week ids.
            let month = store
                .months()
                .iter()
                .find(|month| month.week_ids == week_ids)
                .ok_or_else(|| {
                    DashboardError::invalid(format!("'{value}' is not a known month"))
                })?;
            Ok(SelectionState {
                current_week_id: month.week_ids[0],
                current_group_week_ids: month.week_ids.clone(),
                dropdown_value: month.encoded(),
                ..state.clone()
            })
        }
    }
}

fn select_by_slider(
    store: &PeriodStore,
    state: &SelectionState,
    reverse_index: usize,
) -> Result<SelectionState, DashboardError> {
    let period = store.period_at(reverse_index).ok_or_else(|| {
        DashboardError::invalid(format!(
            "slider position {reverse_index} is outside 0..={}",
            store.max_slider_index().unwrap_or_default()
        ))
    })?;
    if state.granularity == Granularity::Monthly {
        warn!(
            week_id = period.week_id,
            "slider scrubbed in monthly mode; selection pinned to a single week"
        );
    }
    Ok(pin_week(store, state, period.week_id, reverse_index))
}

/// Single-week selection with dropdown and slider mirrored onto it.
fn pin_week(
    store: &PeriodStore,
    state: &SelectionState,
    week_id: WeekId,
    reverse_index: usize,
) -> SelectionState {
    let slider_label = store
        .period_at(reverse_index)
        .map(|period| period.label.clone())
        .unwrap_or_default();
    SelectionState {
        granularity: state.granularity,
        current_week_id: week_id,
        current_group_week_ids: vec![week_id],
        slider_index: reverse_index,
        dropdown_value: week_id.to_string(),
        slider_label,
    }
}

fn parse_week_id(raw: &str) -> Result<WeekId, DashboardError> {
    raw.trim()
        .parse::<WeekId>()
        .map_err(|_| DashboardError::invalid(format!("'{raw}' is not a week id")))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropdownOption {
    pub value: String,
    pub label: String,
}

pub fn dropdown_options(store: &PeriodStore, granularity: Granularity) -> Vec<DropdownOption> {
    match granularity {
        Granularity::Weekly => store
            .periods()
            .iter()
            .map(|period| DropdownOption {
                value: period.week_id.to_string(),
                label: period.label.clone(),
            })
            .collect(),
        Granularity::Monthly => store
            .months()
            .iter()
            .map(|month| DropdownOption {
                value: month.encoded(),
                label: month.label.clone(),
            })
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SliderView {
    pub index: usize,
    pub max: usize,
    pub label: String,
}

/// Everything the three selection widgets need to draw themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectorView {
    pub granularity: Granularity,
    pub options: Vec<DropdownOption>,
    pub selected: String,
    pub slider: SliderView,
    pub week_id: WeekId,
    pub group_week_ids: Vec<WeekId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Reload,
    Unchanged,
}

/// Owns the period lists and the live selection for one open page.
#[derive(Debug, Clone)]
pub struct Selector {
    store: PeriodStore,
    state: Option<SelectionState>,
}

impl Selector {
    /// Starts on the most recent week. With no periods the selector stays
    /// uninitialized and ignores every event.
    pub fn new(store: PeriodStore) -> Self {
        let state = SelectionState::initial(&store);
        if state.is_none() {
            debug!("no periods available; selector left uninitialized");
        }
        Self { store, state }
    }

    pub fn store(&self) -> &PeriodStore {
        &self.store
    }

    pub fn state(&self) -> Option<&SelectionState> {
        self.state.as_ref()
    }

    pub fn apply(&mut self, event: SelectorEvent) -> Result<Outcome, DashboardError> {
        let Some(current) = &self.state else {
            debug!(?event, "ignoring event on uninitialized selector");
            return Ok(Outcome::Unchanged);
        };
        let next = transition(&self.store, current, &event).inspect_err(|err| {
            warn!(?event, "rejected selection: {err}");
        })?;
        self.state = Some(next);
        Ok(Outcome::Reload)
    }

    pub fn set_granularity(&mut self, mode: Granularity) -> Result<Outcome, DashboardError> {
        self.apply(SelectorEvent::SetGranularity(mode))
    }

    pub fn select_by_dropdown(&mut self, value: &str) -> Result<Outcome, DashboardError> {
        self.apply(SelectorEvent::SelectByDropdown(value.to_string()))
    }

    pub fn select_by_slider(&mut self, reverse_index: usize) -> Result<Outcome, DashboardError> {
        self.apply(SelectorEvent::SelectBySlider(reverse_index))
    }

    pub fn view(&self) -> Option<SelectorView> {
        let state = self.state.as_ref()?;
        Some(SelectorView {
            granularity: state.granularity,
            options: dropdown_options(&self.store, state.granularity),
            selected: state.dropdown_value.clone(),
            slider: SliderView {
                index: state.slider_index,
                max: self.store.max_slider_index().unwrap_or_default(),
                label: state.slider_label.clone(),
            },
            week_id: state.current_week_id,
            group_week_ids: state.current_group_week_ids.clone(),
        })
    }
}
