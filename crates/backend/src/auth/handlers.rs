//! Identity resolution endpoint.

use axum::{extract::State, http::HeaderMap, Json};
use shared_types::AuthUserResponse;

use super::middleware::extract_auth_user;
use crate::db;
use crate::error::ApiResult;
use crate::AppState;

/// GET /api/auth/me — resolve the caller's token to their identity.
pub async fn auth_me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<AuthUserResponse>> {
    let user = extract_auth_user(&headers, &state.auth)?;
    let mut conn = state.pool.get().await?;

    let row = db::users::get_by_id(&mut conn, user.id).await?;

    Ok(Json(AuthUserResponse {
        id: row.id,
        username: row.username,
        display_name: row.display_name,
    }))
}
