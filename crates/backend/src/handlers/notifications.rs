//! In-app notification history endpoints.

use axum::{
    extract::{Json, Query, State},
    http::HeaderMap,
};
use chrono::Utc;
use serde::Serialize;
use shared_types::{MarkReadRequest, Notification, NotificationListResponse, NotificationQuery};

use crate::auth;
use crate::db;
use crate::error::ApiResult;
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<Json<NotificationListResponse>> {
    let user = auth::extract_auth_user(&headers, &state.auth)?;
    let mut conn = state.pool.get().await?;

    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let category = query.category.map(|c| c.as_str().to_string());
    let rows = db::notifications::list_for_user(
        &mut conn,
        user.id,
        page,
        limit,
        query.unread_only.unwrap_or(false),
        category.as_deref(),
    )
    .await?;
    let unread_count = db::notifications::unread_count(&mut conn, user.id).await?;

    let mut notifications = Vec::with_capacity(rows.len());
    for row in rows {
        notifications.push(Notification::try_from(row)?);
    }

    Ok(Json(NotificationListResponse {
        notifications,
        unread_count,
    }))
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub updated: usize,
}

/// POST /api/notifications/read
pub async fn mark_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<MarkReadRequest>,
) -> ApiResult<Json<MarkReadResponse>> {
    let user = auth::extract_auth_user(&headers, &state.auth)?;
    let mut conn = state.pool.get().await?;

    let updated =
        db::notifications::mark_read(&mut conn, user.id, payload.ids.as_deref()).await?;

    Ok(Json(MarkReadResponse { updated }))
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub deleted: usize,
}

/// DELETE /api/notifications/expired
///
/// Records older than their expiry stamp are removable by anyone's call; the
/// stamp is set 30 days out at creation.
pub async fn delete_expired(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<CleanupResponse>> {
    auth::extract_auth_user(&headers, &state.auth)?;
    let mut conn = state.pool.get().await?;

    let deleted = db::notifications::delete_expired(&mut conn, Utc::now()).await?;

    Ok(Json(CleanupResponse { deleted }))
}
