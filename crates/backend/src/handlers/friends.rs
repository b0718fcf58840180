//! Friend-graph endpoints.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::json;
use shared_types::{
    FriendEdge, FriendRequestsResponse, FriendsResponse, FriendshipStatusResponse,
    NotificationCategory, NotificationPriority,
};
use uuid::Uuid;

use crate::auth;
use crate::error::ApiResult;
use crate::services::friendship::FriendshipService;
use crate::services::push;
use crate::AppState;

/// POST /api/friends/request/:user_id
pub async fn send_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(recipient_id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<FriendEdge>)> {
    let user = auth::extract_auth_user(&headers, &state.auth)?;
    let mut conn = state.pool.get().await?;

    let edge = FriendshipService::request(&mut conn, user.id, recipient_id).await?;

    // Delivery problems never fail the request itself.
    if let Err(e) = push::notify(
        &mut conn,
        state.push.as_deref(),
        recipient_id,
        "Friend Request",
        &format!("{} sent you a friend request", user.username),
        NotificationCategory::FriendRequest,
        NotificationPriority::High,
        json!({ "edge_id": edge.id }),
    )
    .await
    {
        tracing::warn!("Friend request notification failed: {}", e);
    }

    Ok((StatusCode::CREATED, Json(edge)))
}

/// POST /api/friends/accept/:edge_id
pub async fn accept_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(edge_id): Path<Uuid>,
) -> ApiResult<Json<FriendEdge>> {
    let user = auth::extract_auth_user(&headers, &state.auth)?;
    let mut conn = state.pool.get().await?;

    let edge = FriendshipService::accept(&mut conn, user.id, edge_id).await?;

    if let Err(e) = push::notify(
        &mut conn,
        state.push.as_deref(),
        edge.requester_id,
        "Friend Request Accepted",
        &format!("{} accepted your friend request", user.username),
        NotificationCategory::FriendAccepted,
        NotificationPriority::Normal,
        json!({ "edge_id": edge.id }),
    )
    .await
    {
        tracing::warn!("Friend accept notification failed: {}", e);
    }

    Ok(Json(edge))
}

/// POST /api/friends/decline/:edge_id
pub async fn decline_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(edge_id): Path<Uuid>,
) -> ApiResult<Json<FriendEdge>> {
    let user = auth::extract_auth_user(&headers, &state.auth)?;
    let mut conn = state.pool.get().await?;

    let edge = FriendshipService::decline(&mut conn, user.id, edge_id).await?;
    Ok(Json(edge))
}

/// DELETE /api/friends/cancel/:edge_id
pub async fn cancel_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(edge_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let user = auth::extract_auth_user(&headers, &state.auth)?;
    let mut conn = state.pool.get().await?;

    FriendshipService::cancel(&mut conn, user.id, edge_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/friends/remove/:edge_id
pub async fn remove_friend(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(edge_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let user = auth::extract_auth_user(&headers, &state.auth)?;
    let mut conn = state.pool.get().await?;

    FriendshipService::remove(&mut conn, user.id, edge_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/friends/block/:user_id
pub async fn block_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(target_id): Path<Uuid>,
) -> ApiResult<Json<FriendEdge>> {
    let user = auth::extract_auth_user(&headers, &state.auth)?;
    let mut conn = state.pool.get().await?;

    let edge = FriendshipService::block(&mut conn, user.id, target_id).await?;
    Ok(Json(edge))
}

/// POST /api/friends/unblock/:user_id
pub async fn unblock_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(target_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let user = auth::extract_auth_user(&headers, &state.auth)?;
    let mut conn = state.pool.get().await?;

    FriendshipService::unblock(&mut conn, user.id, target_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/friends/status/:user_id
pub async fn friendship_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(other_id): Path<Uuid>,
) -> ApiResult<Json<FriendshipStatusResponse>> {
    let user = auth::extract_auth_user(&headers, &state.auth)?;
    let mut conn = state.pool.get().await?;

    let status = FriendshipService::status(&mut conn, user.id, other_id).await?;
    Ok(Json(status))
}

/// GET /api/friends
pub async fn list_friends(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<FriendsResponse>> {
    let user = auth::extract_auth_user(&headers, &state.auth)?;
    let mut conn = state.pool.get().await?;

    let response = FriendshipService::friends_and_blocked(&mut conn, user.id).await?;
    Ok(Json(response))
}

/// GET /api/friends/requests
pub async fn list_requests(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<FriendRequestsResponse>> {
    let user = auth::extract_auth_user(&headers, &state.auth)?;
    let mut conn = state.pool.get().await?;

    let response = FriendshipService::pending_requests(&mut conn, user.id).await?;
    Ok(Json(response))
}
