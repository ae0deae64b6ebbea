use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;

use agency_core::filter::ProductFilter;
use agency_core::records::ImportReport;
use agency_core::{Paged, Product, ProductInput, ProductView};

use super::csv_attachment;
use crate::actor::Actor;
use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, PageQuery};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/export", get(export_products))
        .route("/import", post(import_products))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
}

/// `?search=&category_id=&is_active=&page=&per_page=`
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Paged<ProductView>>> {
    let filter = filter.normalized()?;
    let page = state.page(page);
    Ok(Json(state.db.products().list(&filter, page).await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<ProductInput>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = state.db.products().create(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProductView>> {
    state
        .db
        .products()
        .get_view(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Product", &id))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ProductInput>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.db.products().update(&id, input).await?))
}

/// Removes the product with its stock level, ledger rows and sale lines.
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.db.products().delete(&id).await? {
        info!(product_id = %id, "Product deleted over HTTP");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Product", &id))
    }
}

pub async fn export_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> ApiResult<Response> {
    let filter = filter.normalized()?;
    let csv = state.db.csv().export_products(&filter).await?;
    Ok(csv_attachment("products.csv", csv))
}

/// CSV body. Row problems are reported, not raised.
pub async fn import_products(
    State(state): State<AppState>,
    actor: Actor,
    body: String,
) -> ApiResult<Json<ImportReport>> {
    let report = state.db.csv().import_products(&body, actor.as_str()).await?;
    Ok(Json(report))
}
