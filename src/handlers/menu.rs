use crate::{
    auth::CurrentUser,
    errors::ServiceError,
    handlers::common::success_response,
    services::commerce::Selection,
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct MenuQuery {
    /// Staff only; ignored for customers.
    #[serde(default)]
    pub include_unavailable: bool,
}

/// Public menu endpoints
pub fn menu_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_menu))
        .route("/:id", get(get_product))
        .route("/:id/quote", post(quote))
}

async fn list_menu(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<MenuQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let include_unavailable =
        query.include_unavailable && user.user().map(|u| u.is_admin()).unwrap_or(false);
    let menu = state
        .services
        .product_catalog
        .list_menu(include_unavailable)
        .await?;
    Ok(success_response(menu))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.product_catalog.get_product(id).await?;
    Ok(success_response(product))
}

/// Prices a customization without touching any cart.
async fn quote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(selection): Json<Selection>,
) -> Result<impl IntoResponse, ServiceError> {
    let line = state.services.pricing.quote(id, &selection).await?;
    Ok(success_response(line))
}
