use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, put};
use axum::{Json, Router};

use agency_core::filter::{MovementFilter, StockFilter};
use agency_core::{NewMovement, Paged, StockLevel, StockLevelView, StockMovementView, StockThresholds};
use agency_db::{MovementOutcome, StockOverview, StockSummaryEntry};

use super::csv_attachment;
use crate::actor::Actor;
use crate::error::ApiResult;
use crate::state::{AppState, PageQuery};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/levels", get(list_levels))
        .route("/levels/{product_id}", put(update_thresholds))
        .route("/overview", get(overview))
        .route("/alerts", get(alerts))
        .route("/summary", get(summary))
        .route("/export", get(export_levels))
        .route("/movements", get(list_movements).post(create_movement))
        .route("/movements/export", get(export_movements))
}

/// `?search=&status=low|out&page=&per_page=`
pub async fn list_levels(
    State(state): State<AppState>,
    Query(filter): Query<StockFilter>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Paged<StockLevelView>>> {
    let filter = filter.normalized()?;
    let page = state.page(page);
    Ok(Json(state.db.stock().list_levels(&filter, page).await?))
}

/// Creates the level when the product has none yet.
pub async fn update_thresholds(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Json(thresholds): Json<StockThresholds>,
) -> ApiResult<Json<StockLevel>> {
    let level = state
        .db
        .stock()
        .update_thresholds(&product_id, thresholds)
        .await?;
    Ok(Json(level))
}

pub async fn overview(State(state): State<AppState>) -> ApiResult<Json<StockOverview>> {
    Ok(Json(state.db.stock().overview().await?))
}

pub async fn alerts(State(state): State<AppState>) -> ApiResult<Json<Vec<StockLevelView>>> {
    Ok(Json(state.db.stock().alerts().await?))
}

pub async fn summary(State(state): State<AppState>) -> ApiResult<Json<Vec<StockSummaryEntry>>> {
    Ok(Json(state.db.stock().summary().await?))
}

pub async fn export_levels(
    State(state): State<AppState>,
    Query(filter): Query<StockFilter>,
) -> ApiResult<Response> {
    let filter = filter.normalized()?;
    let csv = state.db.csv().export_stock_levels(&filter).await?;
    Ok(csv_attachment("stock_levels.csv", csv))
}

/// `?product_id=&movement_type=IN|OUT|ADJUSTMENT|TRANSFER&page=&per_page=`
pub async fn list_movements(
    State(state): State<AppState>,
    Query(filter): Query<MovementFilter>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Paged<StockMovementView>>> {
    let page = state.page(page);
    Ok(Json(
        state
            .db
            .stock()
            .list_movements(&filter.normalized(), page)
            .await?,
    ))
}

/// Records a movement and returns it with the new level.
pub async fn create_movement(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<NewMovement>,
) -> ApiResult<(StatusCode, Json<MovementOutcome>)> {
    let outcome = state.db.stock().add_movement(input, actor.as_str()).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn export_movements(
    State(state): State<AppState>,
    Query(filter): Query<MovementFilter>,
) -> ApiResult<Response> {
    let csv = state
        .db
        .csv()
        .export_movements(&filter.normalized())
        .await?;
    Ok(csv_attachment("stock_movements.csv", csv))
}
