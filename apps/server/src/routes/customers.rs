use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;

use agency_core::filter::CustomerFilter;
use agency_core::records::ImportReport;
use agency_core::{Customer, CustomerInput, Paged};

use super::csv_attachment;
use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, PageQuery};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route("/export", get(export_customers))
        .route("/import", post(import_customers))
        .route(
            "/{id}",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
}

/// `?search=&page=&per_page=`
pub async fn list_customers(
    State(state): State<AppState>,
    Query(filter): Query<CustomerFilter>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Paged<Customer>>> {
    let filter = filter.normalized()?;
    let page = state.page(page);
    Ok(Json(state.db.customers().list(&filter, page).await?))
}

pub async fn create_customer(
    State(state): State<AppState>,
    Json(input): Json<CustomerInput>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    let customer = state.db.customers().create(input).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Customer>> {
    state
        .db
        .customers()
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Customer", &id))
}

pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CustomerInput>,
) -> ApiResult<Json<Customer>> {
    Ok(Json(state.db.customers().update(&id, input).await?))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.db.customers().delete(&id).await? {
        info!(customer_id = %id, "Customer deleted over HTTP");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Customer", &id))
    }
}

pub async fn export_customers(
    State(state): State<AppState>,
    Query(filter): Query<CustomerFilter>,
) -> ApiResult<Response> {
    let filter = filter.normalized()?;
    let csv = state.db.csv().export_customers(&filter).await?;
    Ok(csv_attachment("customers.csv", csv))
}

pub async fn import_customers(
    State(state): State<AppState>,
    body: String,
) -> ApiResult<Json<ImportReport>> {
    Ok(Json(state.db.csv().import_customers(&body).await?))
}
