use crate::{
    auth::CurrentUser,
    errors::ServiceError,
    handlers::common::{created_response, no_content_response, success_response},
    models::catalog::{ProductInput, VariantInput},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

/// Staff catalog editing
pub fn admin_products_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_product))
        .route("/:id", put(update_product).delete(delete_product))
        .route("/:id/variants", post(add_variant))
}

pub fn admin_categories_routes() -> Router<AppState> {
    Router::new().route("/", post(create_category))
}

pub fn categories_routes() -> Router<AppState> {
    Router::new().route("/", get(list_categories))
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

async fn create_product(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<ProductInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state
        .services
        .product_catalog
        .create_product(user.user(), input)
        .await?;
    Ok(created_response(product))
}

async fn update_product(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ProductInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state
        .services
        .product_catalog
        .update_product(user.user(), id, input)
        .await?;
    Ok(success_response(product))
}

async fn delete_product(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .product_catalog
        .delete_product(user.user(), id)
        .await?;
    Ok(no_content_response())
}

async fn add_variant(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<VariantInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let variant = state
        .services
        .product_catalog
        .add_variant(user.user(), id, input)
        .await?;
    Ok(created_response(variant))
}

async fn create_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let category = state
        .services
        .product_catalog
        .create_category(user.user(), &request.name)
        .await?;
    Ok(created_response(category))
}

async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let categories = state.services.product_catalog.list_categories().await?;
    Ok(success_response(categories))
}
