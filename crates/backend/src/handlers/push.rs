//! Push subscription bookkeeping and test delivery.

use axum::{
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
};
use serde::Serialize;
use serde_json::json;
use shared_types::{
    DeliveryReport, NotificationCategory, NotificationPriority, PushEndpointResponse,
    SubscribeRequest, UnsubscribeRequest, VapidPublicKeyResponse,
};

use crate::auth;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::services::push;
use crate::AppState;

/// GET /api/push/vapid-public-key
pub async fn vapid_public_key(
    State(state): State<AppState>,
) -> ApiResult<Json<VapidPublicKeyResponse>> {
    let client = state
        .push
        .as_ref()
        .ok_or_else(|| ApiError::Config("push notifications are not configured".to_string()))?;

    Ok(Json(VapidPublicKeyResponse {
        public_key: client.public_key().to_string(),
    }))
}

/// POST /api/push/subscribe
pub async fn subscribe(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SubscribeRequest>,
) -> ApiResult<(StatusCode, Json<PushEndpointResponse>)> {
    let user = auth::extract_auth_user(&headers, &state.auth)?;

    if payload.endpoint.trim().is_empty() {
        return Err(ApiError::validation("Subscription endpoint required"));
    }
    if payload.keys.p256dh.trim().is_empty() || payload.keys.auth.trim().is_empty() {
        return Err(ApiError::validation("Subscription keys required"));
    }

    let mut conn = state.pool.get().await?;
    let row = db::push_endpoints::upsert(
        &mut conn,
        user.id,
        &payload.endpoint,
        &payload.keys.p256dh,
        &payload.keys.auth,
    )
    .await?;

    Ok((StatusCode::CREATED, Json((&row).into())))
}

#[derive(Debug, Serialize)]
pub struct UnsubscribeResponse {
    pub removed: usize,
}

/// DELETE /api/push/unsubscribe
pub async fn unsubscribe(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UnsubscribeRequest>,
) -> ApiResult<Json<UnsubscribeResponse>> {
    let user = auth::extract_auth_user(&headers, &state.auth)?;
    let mut conn = state.pool.get().await?;

    let removed =
        db::push_endpoints::delete_by_endpoint(&mut conn, user.id, &payload.endpoint).await?;

    Ok(Json(UnsubscribeResponse { removed }))
}

/// POST /api/push/test — send yourself a test notification.
pub async fn send_test(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<DeliveryReport>> {
    let user = auth::extract_auth_user(&headers, &state.auth)?;
    let mut conn = state.pool.get().await?;

    let report = push::notify(
        &mut conn,
        state.push.as_deref(),
        user.id,
        "Test Notification",
        "This is a test notification from freefor.games",
        NotificationCategory::Test,
        NotificationPriority::Normal,
        json!({ "test": true }),
    )
    .await?;

    Ok(Json(report))
}
