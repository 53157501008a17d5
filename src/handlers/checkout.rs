use crate::{
    auth::{require_user, CurrentUser},
    errors::ServiceError,
    handlers::common::{created_response, success_response},
    models::Cart,
    services::commerce::Selection,
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, patch, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

/// Checkout of a client-held cart
pub fn checkout_routes() -> Router<AppState> {
    Router::new().route("/", post(checkout))
}

/// Server-kept cart of the signed-in customer
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart).delete(clear_cart))
        .route("/lines", post(add_line))
        .route("/lines/:index", patch(update_line).delete(remove_line))
        .route("/checkout", post(checkout_saved_cart))
}

/// Writes the submitted cart as an order. The client clears its copy on 201.
async fn checkout(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(cart): Json<Cart>,
) -> Result<impl IntoResponse, ServiceError> {
    let placed = state.services.checkout.place_order(user.user(), &cart).await?;
    Ok(created_response(placed))
}

#[derive(Debug, Deserialize)]
pub struct AddLineRequest {
    pub product_id: Uuid,
    #[serde(flatten)]
    pub selection: Selection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateLineRequest {
    Quantity(i64),
    Delta(i64),
}

fn cart_key(user: &CurrentUser) -> Result<String, ServiceError> {
    Ok(require_user(user.user())?.user_id.to_string())
}

async fn get_cart(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ServiceError> {
    let cart = state.services.cart.load(&cart_key(&user)?).await?;
    Ok(success_response(cart))
}

async fn add_line(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<AddLineRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let key = cart_key(&user)?;
    let line = state
        .services
        .pricing
        .quote(request.product_id, &request.selection)
        .await?;
    let cart = state.services.cart.add_line(&key, line).await?;
    Ok(success_response(cart))
}

async fn update_line(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(index): Path<usize>,
    Json(request): Json<UpdateLineRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let key = cart_key(&user)?;
    let cart = match request {
        UpdateLineRequest::Quantity(quantity) => {
            state.services.cart.set_quantity(&key, index, quantity).await?
        }
        UpdateLineRequest::Delta(delta) => {
            state.services.cart.adjust_quantity(&key, index, delta).await?
        }
    };
    Ok(success_response(cart))
}

async fn remove_line(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(index): Path<usize>,
) -> Result<impl IntoResponse, ServiceError> {
    let cart = state
        .services
        .cart
        .remove_line(&cart_key(&user)?, index)
        .await?;
    Ok(success_response(cart))
}

async fn clear_cart(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ServiceError> {
    let cart = state.services.cart.clear(&cart_key(&user)?).await?;
    Ok(success_response(cart))
}

async fn checkout_saved_cart(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ServiceError> {
    let key = cart_key(&user)?;
    let placed = state
        .services
        .cart
        .checkout(&key, &state.services.checkout, user.user())
        .await?;
    Ok(created_response(placed))
}
