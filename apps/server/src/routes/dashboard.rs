use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use agency_db::DashboardOverview;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(overview))
}

/// Counters for today (UTC) and the current month.
pub async fn overview(State(state): State<AppState>) -> ApiResult<Json<DashboardOverview>> {
    let today = Utc::now().date_naive();
    Ok(Json(state.db.dashboard().overview(today).await?))
}
