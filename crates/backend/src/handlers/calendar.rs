//! Google Calendar connection and sync endpoints.

use axum::{
    extract::{Json, State},
    http::HeaderMap,
};
use chrono::Utc;
use serde::Serialize;
use shared_types::{
    CalendarConnectionResponse, CalendarListEntry, CalendarSyncSummary, ConnectCalendarRequest,
    ConnectionStatus, EntrySource, SyncRequest,
};

use crate::auth;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::CalendarConnectionRow;
use crate::services::google_calendar::{CalendarProvider, GoogleCalendarClient, ProviderError};
use crate::services::sync::{run_sync, PgEntryStore};
use crate::AppState;

const PROVIDER: EntrySource = EntrySource::GoogleCalendar;

fn connection_response(row: Option<&CalendarConnectionRow>) -> CalendarConnectionResponse {
    match row {
        Some(row) => CalendarConnectionResponse {
            provider: PROVIDER,
            connected: true,
            status: row.status_parsed(),
            calendar_ids: row.calendar_id_list(),
            last_synced: row.last_synced,
        },
        None => CalendarConnectionResponse {
            provider: PROVIDER,
            connected: false,
            status: None,
            calendar_ids: Vec::new(),
            last_synced: None,
        },
    }
}

/// GET /api/calendar/google
pub async fn get_connection(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<CalendarConnectionResponse>> {
    let user = auth::extract_auth_user(&headers, &state.auth)?;
    let mut conn = state.pool.get().await?;

    let row = db::calendar_connections::find_for_owner(&mut conn, user.id, PROVIDER.as_str())
        .await?;

    Ok(Json(connection_response(row.as_ref())))
}

/// POST /api/calendar/google/connect
pub async fn connect(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ConnectCalendarRequest>,
) -> ApiResult<Json<CalendarConnectionResponse>> {
    let user = auth::extract_auth_user(&headers, &state.auth)?;

    if payload.access_token.trim().is_empty() {
        return Err(ApiError::validation("Access token required"));
    }

    let mut conn = state.pool.get().await?;
    let row = db::calendar_connections::upsert(
        &mut conn,
        user.id,
        PROVIDER.as_str(),
        &payload.access_token,
        payload.refresh_token.as_deref(),
    )
    .await?;

    Ok(Json(connection_response(Some(&row))))
}

#[derive(Debug, Serialize)]
pub struct DisconnectResponse {
    pub connected: bool,
    pub removed_entries: usize,
}

/// DELETE /api/calendar/google/disconnect
///
/// Also removes every availability entry this provider synced for the user.
pub async fn disconnect(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<DisconnectResponse>> {
    let user = auth::extract_auth_user(&headers, &state.auth)?;
    let mut conn = state.pool.get().await?;

    db::calendar_connections::delete(&mut conn, user.id, PROVIDER.as_str()).await?;
    let removed_entries =
        db::availability::delete_by_source(&mut conn, user.id, PROVIDER.as_str()).await?;

    tracing::info!(
        "Disconnected {} for user {}, removed {} synced entries",
        PROVIDER.as_str(),
        user.id,
        removed_entries
    );

    Ok(Json(DisconnectResponse {
        connected: false,
        removed_entries,
    }))
}

async fn require_connection(
    conn: &mut diesel_async::AsyncPgConnection,
    owner: uuid::Uuid,
) -> Result<CalendarConnectionRow, ApiError> {
    db::calendar_connections::find_for_owner(conn, owner, PROVIDER.as_str())
        .await?
        .ok_or_else(|| ApiError::validation("Google Calendar not connected"))
}

/// An expired credential flips the stored connection to reconnect_required
/// before surfacing, so the client prompts instead of silently retrying.
async fn mark_reconnect_required(
    conn: &mut diesel_async::AsyncPgConnection,
    connection: &CalendarConnectionRow,
) {
    if let Err(e) = db::calendar_connections::set_status(
        conn,
        connection.id,
        ConnectionStatus::ReconnectRequired.as_str(),
    )
    .await
    {
        tracing::error!("Failed to flag connection for reconnect: {}", e);
    }
}

/// GET /api/calendar/google/calendars
pub async fn list_calendars(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<CalendarListEntry>>> {
    let user = auth::extract_auth_user(&headers, &state.auth)?;
    let mut conn = state.pool.get().await?;

    let connection = require_connection(&mut conn, user.id).await?;
    let client =
        GoogleCalendarClient::new(connection.access_token.clone(), state.sync.http_timeout)?;

    match client.list_calendars().await {
        Ok(calendars) => Ok(Json(calendars)),
        Err(ProviderError::ExpiredCredential) => {
            mark_reconnect_required(&mut conn, &connection).await;
            Err(ApiError::ExpiredCredential(
                "Google Calendar token expired. Please reconnect.".to_string(),
            ))
        }
        Err(ProviderError::Upstream(msg)) => Err(ApiError::Upstream(msg)),
    }
}

/// POST /api/calendar/google/sync
pub async fn sync(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SyncRequest>,
) -> ApiResult<Json<CalendarSyncSummary>> {
    let user = auth::extract_auth_user(&headers, &state.auth)?;

    if payload.calendar_ids.is_empty() {
        return Err(ApiError::validation("Calendar IDs required"));
    }

    let mut conn = state.pool.get().await?;
    let connection = require_connection(&mut conn, user.id).await?;

    // Remember the selection for the settings UI.
    db::calendar_connections::set_calendar_ids(&mut conn, connection.id, &payload.calendar_ids)
        .await?;

    let client =
        GoogleCalendarClient::new(connection.access_token.clone(), state.sync.http_timeout)?;
    let mut store = PgEntryStore { conn: &mut conn };

    let summary = match run_sync(
        &client,
        &mut store,
        user.id,
        PROVIDER,
        &payload.calendar_ids,
        Utc::now(),
    )
    .await
    {
        Ok(summary) => summary,
        Err(ApiError::ExpiredCredential(msg)) => {
            mark_reconnect_required(&mut conn, &connection).await;
            return Err(ApiError::ExpiredCredential(msg));
        }
        Err(other) => return Err(other),
    };

    db::calendar_connections::mark_synced(&mut conn, connection.id).await?;

    Ok(Json(summary))
}
