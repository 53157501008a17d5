use crate::{
    auth::CurrentUser,
    errors::ServiceError,
    handlers::common::{no_content_response, success_response, LimitParams},
    models::OrderStatus,
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, put},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

/// Customer order history
pub fn orders_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_my_orders))
        .route("/:id", get(get_order))
}

/// Staff order board
pub fn admin_orders_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_recent_orders))
        .route("/:id/status", put(update_order_status))
        .route("/:id", delete(delete_order))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

async fn list_my_orders(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ServiceError> {
    let orders = state.services.order.list_orders_for_user(user.user()).await?;
    Ok(success_response(orders))
}

async fn get_order(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.order.get_order(user.user(), id).await?;
    Ok(success_response(order))
}

async fn list_recent_orders(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<LimitParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let orders = state
        .services
        .order
        .list_recent_orders(user.user(), params.limit())
        .await?;
    Ok(success_response(orders))
}

async fn update_order_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state
        .services
        .order_status
        .update_status(user.user(), id, request.status)
        .await?;
    Ok(success_response(order))
}

async fn delete_order(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.order.delete_order(user.user(), id).await?;
    Ok(no_content_response())
}
