use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use crate::dtos::{ApiResponse, ProductBatch, ProductPatch, ProductResponse};
use crate::models::Product;
use crate::services::metrics;
use crate::startup::AppState;

const PRODUCT_NOT_FOUND: &str = "product not found";

/// `GET /api/products`
#[tracing::instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ProductResponse>>>, AppError> {
    let products = state.store.list().await?;

    Ok(Json(ApiResponse::data(
        products.into_iter().map(ProductResponse::from).collect(),
    )))
}

/// `POST /api/products`
#[tracing::instrument(skip(state, batch))]
pub async fn create_products(
    State(state): State<AppState>,
    batch: ProductBatch,
) -> Result<(StatusCode, Json<ApiResponse<Vec<ProductResponse>>>), AppError> {
    let products: Vec<Product> = batch.into_inner().into_iter().map(Product::new).collect();

    let inserted = state.store.insert_many(products).await?;

    tracing::info!(count = inserted.len(), "Created products");
    metrics::record_products_created(inserted.len());

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(
            inserted.into_iter().map(ProductResponse::from).collect(),
        )),
    ))
}

/// `GET /api/products/:id`
///
/// Absent and malformed ids both answer 404.
#[tracing::instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ProductResponse>>, AppError> {
    let product = state
        .store
        .find_by_id(&id)
        .await
        .map_err(|_| AppError::not_found(PRODUCT_NOT_FOUND))?
        .ok_or_else(|| AppError::not_found(PRODUCT_NOT_FOUND))?;

    Ok(Json(ApiResponse::data(ProductResponse::from(product))))
}

/// `PUT /api/products/:id`
///
/// A well-formed id that matches nothing still answers 200, with `data: null`.
#[tracing::instrument(skip(state, update))]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ProductPatch(update): ProductPatch,
) -> Result<Json<ApiResponse<Option<ProductResponse>>>, AppError> {
    let updated = state.store.update_by_id(&id, &update).await?;

    if updated.is_some() {
        metrics::record_products_updated();
    }

    Ok(Json(ApiResponse::data(updated.map(ProductResponse::from))))
}

/// `DELETE /api/products/:id`
///
/// Succeeds whether or not a product matched. Any store failure, including a
/// malformed id, is reported as not found.
#[tracing::instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    state
        .store
        .delete_by_id(&id)
        .await
        .map_err(|_| AppError::not_found(PRODUCT_NOT_FOUND))?;

    metrics::record_products_deleted();

    Ok(Json(ApiResponse::message("Product Deleted")))
}
