use crate::errors::DashboardError;
use crate::models::{LaborStatus, WeekId};
use crate::selection::SelectionState;
use crate::view::PageView;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::Arc};
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    Overview,
    Revenue,
    Margin,
    Labor,
}

impl Page {
    pub const ALL: [Page; 4] = [Page::Overview, Page::Revenue, Page::Margin, Page::Labor];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Revenue => "revenue",
            Self::Margin => "margin",
            Self::Labor => "labor",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::Revenue => "Revenue",
            Self::Margin => "Gross Margin",
            Self::Labor => "Labor & Burden",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Page {
    type Err = DashboardError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|page| page.as_str() == value)
            .ok_or_else(|| DashboardError::invalid(format!("unknown page '{value}'")))
    }
}

/// Period arguments handed to a page loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadArgs {
    pub week_id: WeekId,
    pub group_week_ids: Vec<WeekId>,
    pub labor_status: LaborStatus,
}

impl ReloadArgs {
    pub fn from_selection(state: &SelectionState, labor_status: LaborStatus) -> Self {
        Self {
            week_id: state.current_week_id,
            group_week_ids: state.current_group_week_ids.clone(),
            labor_status,
        }
    }
}

#[async_trait]
pub trait PageLoader: Send + Sync {
    async fn load(&self, args: &ReloadArgs) -> Result<PageView, DashboardError>;
}

/// Receives the loading indicator and user-facing error notices.
pub trait StatusSink: Send + Sync {
    fn set_loading(&self, loading: bool);

    fn notify_error(&self, message: &str);
}

/// Sink for callers that report errors through their own channel.
pub struct LogSink;

impl StatusSink for LogSink {
    fn set_loading(&self, loading: bool) {
        debug!(loading, "loading indicator");
    }

    fn notify_error(&self, message: &str) {
        error!("{message}");
    }
}

#[derive(Clone)]
pub struct PageLoaders {
    pub overview: Arc<dyn PageLoader>,
    pub revenue: Arc<dyn PageLoader>,
    pub margin: Arc<dyn PageLoader>,
    pub labor: Arc<dyn PageLoader>,
}

impl PageLoaders {
    pub fn for_page(&self, page: Page) -> &Arc<dyn PageLoader> {
        match page {
            Page::Overview => &self.overview,
            Page::Revenue => &self.revenue,
            Page::Margin => &self.margin,
            Page::Labor => &self.labor,
        }
    }
}

/// Picks the loader for a page and runs it between loading toggles.
#[derive(Clone)]
pub struct Dispatcher {
    loaders: PageLoaders,
}

impl Dispatcher {
    pub fn new(loaders: PageLoaders) -> Self {
        Self { loaders }
    }

    /// Failures are notified once and returned; the selection that caused
    /// the reload is left as it is.
    pub async fn reload(
        &self,
        page: Page,
        args: &ReloadArgs,
        sink: &dyn StatusSink,
    ) -> Result<PageView, DashboardError> {
        info!(%page, week_id = args.week_id, weeks = ?args.group_week_ids, "reloading page");
        sink.set_loading(true);
        let result = self.loaders.for_page(page).load(args).await;
        if let Err(err) = &result {
            sink.notify_error(&format!("Failed to load {}: {err}", page.title()));
        }
        sink.set_loading(false);
        result
    }
}
