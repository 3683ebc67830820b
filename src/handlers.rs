use crate::dispatch::{LogSink, Page, ReloadArgs};
use crate::errors::{AppError, DashboardError};
use crate::models::{
    GranularityRequest, LaborStatus, LaborStatusRequest, PeriodRequest, SliderRequest,
    SortRequest, WeekId,
};
use crate::pages::{load_category_drill, load_job_drill, load_product_drill};
use crate::selection::{Granularity, Outcome, SelectorEvent};
use crate::session::{DashboardResponse, Session};
use crate::state::AppState;
use crate::ui::render_page;
use crate::view::{DrillView, SortOrder};
use axum::{
    extract::{Path, State},
    response::{Html, Redirect},
    Json,
};
use tracing::info;

pub async fn index() -> Redirect {
    Redirect::to("/overview")
}

pub async fn page(Path(page): Path<String>) -> Result<Html<String>, AppError> {
    let page = page
        .parse::<Page>()
        .map_err(|_| AppError::not_found(format!("no page named '{page}'")))?;
    Ok(Html(render_page(page)))
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn get_session(
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, AppError> {
    let guard = state.session.lock().await;
    let session = guard.as_ref().ok_or_else(AppError::no_session)?;
    Ok(Json(session.response()))
}

pub async fn open_session(
    State(state): State<AppState>,
    Path(page): Path<String>,
) -> Result<Json<DashboardResponse>, AppError> {
    let page = page
        .parse::<Page>()
        .map_err(|_| AppError::not_found(format!("no page named '{page}'")))?;

    // A failed load keeps whatever session was open before.
    let session = Session::open(state.source.as_ref(), page, &LogSink).await?;
    let args = session.reload_args();
    *state.session.lock().await = Some(session);

    refresh(&state, page, args).await
}

pub async fn set_granularity(
    State(state): State<AppState>,
    Json(payload): Json<GranularityRequest>,
) -> Result<Json<DashboardResponse>, AppError> {
    let mode = payload.mode.parse::<Granularity>()?;
    apply_event(&state, SelectorEvent::SetGranularity(mode)).await
}

pub async fn select_period(
    State(state): State<AppState>,
    Json(payload): Json<PeriodRequest>,
) -> Result<Json<DashboardResponse>, AppError> {
    apply_event(&state, SelectorEvent::SelectByDropdown(payload.value)).await
}

pub async fn scrub_slider(
    State(state): State<AppState>,
    Json(payload): Json<SliderRequest>,
) -> Result<Json<DashboardResponse>, AppError> {
    let index = usize::try_from(payload.index).map_err(|_| {
        DashboardError::invalid(format!("slider position {} is negative", payload.index))
    })?;
    apply_event(&state, SelectorEvent::SelectBySlider(index)).await
}

pub async fn set_labor_status(
    State(state): State<AppState>,
    Json(payload): Json<LaborStatusRequest>,
) -> Result<Json<DashboardResponse>, AppError> {
    let status = payload.status.parse::<LaborStatus>()?;
    let (page, args) = {
        let mut guard = state.session.lock().await;
        let session = guard.as_mut().ok_or_else(AppError::no_session)?;
        session.labor_status = status;
        if session.page != Page::Labor {
            return Ok(Json(session.response()));
        }
        (session.page, session.reload_args())
    };
    refresh(&state, page, args).await
}

pub async fn sort_table(
    State(state): State<AppState>,
    Json(payload): Json<SortRequest>,
) -> Result<Json<DashboardResponse>, AppError> {
    let order = match payload.order.as_deref() {
        Some(order) => order.parse::<SortOrder>()?,
        None => SortOrder::default(),
    };
    let mut guard = state.session.lock().await;
    let session = guard.as_mut().ok_or_else(AppError::no_session)?;
    let view = session
        .view
        .as_mut()
        .ok_or_else(|| DashboardError::invalid("nothing has been rendered yet"))?;
    view.sort_table(&payload.table, &payload.column, order)?;
    Ok(Json(session.response()))
}

pub async fn drill_product(
    State(state): State<AppState>,
    Path(product_group): Path<String>,
) -> Result<Json<DrillView>, AppError> {
    let week_id = current_week(&state).await?;
    info!(%product_group, week_id, "drilling into product group");
    let view = load_product_drill(state.source.as_ref(), &product_group, week_id).await?;
    Ok(Json(view))
}

pub async fn drill_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<DrillView>, AppError> {
    let week_id = current_week(&state).await?;
    info!(%category, week_id, "drilling into category");
    let view = load_category_drill(state.source.as_ref(), &category, week_id).await?;
    Ok(Json(view))
}

pub async fn drill_job(
    State(state): State<AppState>,
    Path(job_num): Path<String>,
) -> Result<Json<DrillView>, AppError> {
    let week_id = current_week(&state).await?;
    info!(%job_num, week_id, "drilling into job");
    let view = load_job_drill(state.source.as_ref(), &job_num, week_id).await?;
    Ok(Json(view))
}

/// Primary week of the open selection; drills always use a single week.
async fn current_week(state: &AppState) -> Result<WeekId, AppError> {
    let guard = state.session.lock().await;
    let session = guard.as_ref().ok_or_else(AppError::no_session)?;
    let week_id = session
        .selector
        .state()
        .map(|selection| selection.current_week_id)
        .ok_or_else(|| DashboardError::invalid("no week is selected"))?;
    Ok(week_id)
}

async fn apply_event(
    state: &AppState,
    event: SelectorEvent,
) -> Result<Json<DashboardResponse>, AppError> {
    let (page, args) = {
        let mut guard = state.session.lock().await;
        let session = guard.as_mut().ok_or_else(AppError::no_session)?;
        match session.selector.apply(event)? {
            Outcome::Unchanged => return Ok(Json(session.response())),
            Outcome::Reload => (session.page, session.reload_args()),
        }
    };
    refresh(state, page, args).await
}

/// Runs the reload without holding the session lock, then stores the view
/// if the same page is still open. Overlapping reloads are not cancelled;
/// the last one to finish wins.
async fn refresh(
    state: &AppState,
    page: Page,
    args: Option<ReloadArgs>,
) -> Result<Json<DashboardResponse>, AppError> {
    let view = match args {
        Some(args) => Some(state.dispatcher.reload(page, &args, &LogSink).await?),
        None => None,
    };

    let mut guard = state.session.lock().await;
    let session = guard.as_mut().ok_or_else(AppError::no_session)?;
    if session.page == page && view.is_some() {
        session.view = view;
    }
    Ok(Json(session.response()))
}
