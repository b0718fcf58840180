//! Profile viewing, editing, and discovery search.

use axum::{
    extract::{Json, Path, Query, State},
    http::HeaderMap,
};
use serde::Serialize;
use shared_types::{ProfileSearchQuery, PublicProfile, UpdateProfileRequest};

use crate::auth;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 50;

/// The caller's own profile, including fields hidden from public view.
#[derive(Debug, Serialize)]
pub struct MyProfileResponse {
    pub profile: PublicProfile,
    pub email: String,
    pub is_public: bool,
}

/// GET /api/profiles/me
pub async fn get_me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<MyProfileResponse>> {
    let user = auth::extract_auth_user(&headers, &state.auth)?;
    let mut conn = state.pool.get().await?;

    let row = db::users::get_by_id(&mut conn, user.id).await?;
    db::users::touch_last_active(&mut conn, user.id).await?;

    Ok(Json(MyProfileResponse {
        profile: (&row).into(),
        email: row.email.clone(),
        is_public: row.is_public,
    }))
}

/// PUT /api/profiles/me
pub async fn update_me(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(patch): Json<UpdateProfileRequest>,
) -> ApiResult<Json<MyProfileResponse>> {
    let user = auth::extract_auth_user(&headers, &state.auth)?;
    let mut conn = state.pool.get().await?;

    let current = db::users::get_by_id(&mut conn, user.id).await?;

    if let Some(name) = &patch.display_name {
        if name.trim().is_empty() {
            return Err(ApiError::validation("Display name cannot be empty"));
        }
    }

    let display_name = patch.display_name.unwrap_or(current.display_name);
    let bio = patch.bio.unwrap_or(current.bio);
    let avatar_url = patch.avatar_url.or(current.avatar_url);
    let preferred_games = match patch.preferred_games {
        Some(games) => games.into_iter().map(Some).collect(),
        None => current.preferred_games,
    };
    let platforms = match patch.platforms {
        Some(platforms) => platforms.into_iter().map(Some).collect(),
        None => current.platforms,
    };
    let timezone = patch.timezone.unwrap_or(current.timezone);
    let region = patch.region.unwrap_or(current.region);
    let is_public = patch.is_public.unwrap_or(current.is_public);

    let row = db::users::update_profile(
        &mut conn,
        user.id,
        &display_name,
        &bio,
        avatar_url.as_deref(),
        preferred_games,
        platforms,
        &timezone,
        &region,
        is_public,
    )
    .await?;

    Ok(Json(MyProfileResponse {
        profile: (&row).into(),
        email: row.email.clone(),
        is_public: row.is_public,
    }))
}

/// GET /api/profiles/:username — public profiles only.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<PublicProfile>> {
    let mut conn = state.pool.get().await?;

    let row = db::users::find_public_by_username(&mut conn, &username)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(Json((&row).into()))
}

/// GET /api/profiles — discovery search with optional game/platform/region
/// filters.
pub async fn search_profiles(
    State(state): State<AppState>,
    Query(query): Query<ProfileSearchQuery>,
) -> ApiResult<Json<Vec<PublicProfile>>> {
    let mut conn = state.pool.get().await?;

    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let rows = db::users::search_public(
        &mut conn,
        query.game.as_deref(),
        query.platform.as_deref(),
        query.region.as_deref(),
        page,
        limit,
    )
    .await?;

    Ok(Json(rows.iter().map(PublicProfile::from).collect()))
}
