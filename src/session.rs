use crate::dispatch::{Page, ReloadArgs, StatusSink};
use crate::errors::DashboardError;
use crate::models::LaborStatus;
use crate::period::PeriodStore;
use crate::selection::{Selector, SelectorView};
use crate::source::DataSource;
use crate::view::PageView;
use chrono::Local;
use serde::Serialize;
use tracing::info;

/// The dashboard as one open page sees it. Rebuilt on every page open.
#[derive(Debug, Clone)]
pub struct Session {
    pub page: Page,
    pub selector: Selector,
    pub labor_status: LaborStatus,
    pub view: Option<PageView>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub page: Page,
    pub selector: Option<SelectorView>,
    pub labor_status: LaborStatus,
    pub view: Option<PageView>,
    pub rendered_at: String,
}

impl Session {
    /// Loads the period lists for a freshly opened page. On failure the
    /// sink gets exactly one notice and no session is produced.
    pub async fn open(
        source: &dyn DataSource,
        page: Page,
        sink: &dyn StatusSink,
    ) -> Result<Self, DashboardError> {
        sink.set_loading(true);
        let loaded = PeriodStore::load(source).await;
        sink.set_loading(false);

        let store = loaded.inspect_err(|err| {
            sink.notify_error(&format!("Failed to load reporting periods: {err}"));
        })?;
        info!(%page, weeks = store.periods().len(), "opened dashboard session");

        Ok(Self {
            page,
            selector: Selector::new(store),
            labor_status: LaborStatus::default(),
            view: None,
        })
    }

    /// Arguments for the next reload, if the selector has a selection.
    pub fn reload_args(&self) -> Option<ReloadArgs> {
        self.selector
            .state()
            .map(|state| ReloadArgs::from_selection(state, self.labor_status))
    }

    pub fn response(&self) -> DashboardResponse {
        DashboardResponse {
            page: self.page,
            selector: self.selector.view(),
            labor_status: self.labor_status,
            view: self.view.clone(),
            rendered_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}
