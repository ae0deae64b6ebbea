//! Sales, their lines and the PENDING → COMPLETED / CANCELLED lifecycle.
//!
//! Line changes recompute the stored total before answering, so the body
//! returned always carries a total that matches its items.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use agency_core::filter::SaleFilter;
use agency_core::{NewSale, NewSaleItem, Paged, SaleItemView, SaleView};
use agency_db::{DailySales, MonthlySales};

use super::csv_attachment;
use crate::actor::Actor;
use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, PageQuery};

/// Days covered by the sales summary, today included.
const SUMMARY_DAYS: i64 = 30;

/// Months returned by the monthly report.
const DEFAULT_MONTHS: u32 = 12;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sales).post(create_sale))
        .route("/summary", get(summary))
        .route("/monthly", get(monthly))
        .route("/export", get(export_sales))
        .route("/{id}", get(get_sale))
        .route("/{id}/items", post(add_item))
        .route("/{id}/items/{item_id}", delete(remove_item))
        .route("/{id}/complete", post(complete_sale))
        .route("/{id}/cancel", post(cancel_sale))
        .route("/{id}/recompute", post(recompute_total))
}

/// A sale with its lines in entry order.
#[derive(Debug, Serialize)]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: SaleView,
    pub items: Vec<SaleItemView>,
}

#[derive(Debug, Serialize)]
pub struct SalesSummary {
    pub daily_sales: Vec<DailySales>,
}

#[derive(Debug, Serialize)]
pub struct RecomputedTotal {
    pub sale_id: String,
    pub total_amount_cents: i64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MonthlyQuery {
    pub months: Option<u32>,
}

async fn load_detail(state: &AppState, id: &str) -> ApiResult<SaleDetail> {
    let sale = state
        .db
        .sales()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", id))?;
    let items = state.db.sales().items(id).await?;
    Ok(SaleDetail { sale, items })
}

/// `?search=&status=&customer_id=&date_from=&date_to=&page=&per_page=`
pub async fn list_sales(
    State(state): State<AppState>,
    Query(filter): Query<SaleFilter>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Paged<SaleView>>> {
    let filter = filter.normalized()?;
    let page = state.page(page);
    Ok(Json(state.db.sales().list(&filter, page).await?))
}

/// Opens an empty PENDING sale.
pub async fn create_sale(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<NewSale>,
) -> ApiResult<(StatusCode, Json<SaleDetail>)> {
    let sale = state.db.sales().create(input, actor.as_str()).await?;
    let detail = load_detail(&state, &sale.id).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SaleDetail>> {
    Ok(Json(load_detail(&state, &id).await?))
}

pub async fn add_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<NewSaleItem>,
) -> ApiResult<(StatusCode, Json<SaleDetail>)> {
    let (item, total) = state.db.sales().add_item_and_recompute(&id, input).await?;
    info!(sale_id = %id, item_id = %item.item.id, total = %total, "Sale item added over HTTP");
    Ok((StatusCode::CREATED, Json(load_detail(&state, &id).await?)))
}

pub async fn remove_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(String, String)>,
) -> ApiResult<Json<SaleDetail>> {
    state.db.sales().remove_item_and_recompute(&id, &item_id).await?;
    Ok(Json(load_detail(&state, &id).await?))
}

/// Deducts stock for every line. 409 `INSUFFICIENT_STOCK` leaves
/// everything unchanged.
pub async fn complete_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
    actor: Actor,
) -> ApiResult<Json<SaleDetail>> {
    state.db.sales().complete(&id, actor.as_str()).await?;
    Ok(Json(load_detail(&state, &id).await?))
}

/// Restores stock when the sale was completed.
pub async fn cancel_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
    actor: Actor,
) -> ApiResult<Json<SaleDetail>> {
    state.db.sales().cancel(&id, actor.as_str()).await?;
    Ok(Json(load_detail(&state, &id).await?))
}

pub async fn recompute_total(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RecomputedTotal>> {
    let total = state.db.sales().recompute_total(&id).await?;
    Ok(Json(RecomputedTotal {
        sale_id: id,
        total_amount_cents: total.cents(),
    }))
}

/// Completed sales per day over the last 30 days.
pub async fn summary(State(state): State<AppState>) -> ApiResult<Json<SalesSummary>> {
    let today = Utc::now().date_naive();
    let from = today - Duration::days(SUMMARY_DAYS - 1);
    let daily_sales = state.db.dashboard().daily_sales(from, today).await?;
    Ok(Json(SalesSummary { daily_sales }))
}

/// `?months=` (default 12), oldest first.
pub async fn monthly(
    State(state): State<AppState>,
    Query(query): Query<MonthlyQuery>,
) -> ApiResult<Json<Vec<MonthlySales>>> {
    let months = query.months.unwrap_or(DEFAULT_MONTHS).clamp(1, 120);
    Ok(Json(state.db.dashboard().monthly_sales(months).await?))
}

pub async fn export_sales(
    State(state): State<AppState>,
    Query(filter): Query<SaleFilter>,
) -> ApiResult<Response> {
    let filter = filter.normalized()?;
    let csv = state.db.csv().export_sales(&filter).await?;
    Ok(csv_attachment("sales.csv", csv))
}
