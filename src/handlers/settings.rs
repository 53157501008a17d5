use crate::{
    auth::CurrentUser,
    errors::ServiceError,
    handlers::common::success_response,
    services::store_settings::SettingKey,
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use serde_json::Value;

pub fn settings_routes() -> Router<AppState> {
    Router::new().route("/:key", get(get_setting))
}

pub fn admin_settings_routes() -> Router<AppState> {
    Router::new().route("/:key", put(update_setting))
}

async fn get_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let key = SettingKey::parse(&key)?;
    let value = state.services.settings.get_setting(key).await?;
    Ok(success_response(value))
}

async fn update_setting(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(key): Path<String>,
    Json(value): Json<Value>,
) -> Result<impl IntoResponse, ServiceError> {
    let key = SettingKey::parse(&key)?;
    let value = state
        .services
        .settings
        .update_setting(user.user(), key, value)
        .await?;
    Ok(success_response(value))
}
