//! Availability CRUD and window queries.

use axum::{
    extract::{Json, Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use chrono::{Duration, Utc};
use shared_types::{
    expand_in_window, AvailabilityEntry, AvailabilityWindowResponse, CreateAvailabilityRequest,
    EntrySource, OverlapRequest, OverlapResponse, PublicAvailabilityResponse, RecurrenceRule,
    TimeRange, UpdateAvailabilityRequest, WindowQuery,
};

use crate::auth;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::NewAvailabilityEntry;
use crate::services::overlap;
use crate::AppState;

const DEFAULT_WINDOW_DAYS: i64 = 7;

/// Recurrence payload must travel with `is_recurring`, and the rule itself
/// must be well formed.
fn validate_recurrence(
    is_recurring: bool,
    recurrence: Option<&RecurrenceRule>,
) -> Result<(), ApiError> {
    match (is_recurring, recurrence) {
        (false, Some(_)) => Err(ApiError::validation(
            "Recurrence payload requires is_recurring",
        )),
        (true, None) => Err(ApiError::validation(
            "Recurring entries need a recurrence rule",
        )),
        (true, Some(rule)) => Ok(rule.validate()?),
        (false, None) => Ok(()),
    }
}

/// Externally-synced entries never change through the edit paths; the
/// override kind exists for that.
fn ensure_mutable(entry: &AvailabilityEntry, action: &str) -> Result<(), ApiError> {
    if entry.source.is_external() {
        return Err(ApiError::ImmutableSource(format!(
            "Cannot {} calendar sync entries. Use override instead.",
            action
        )));
    }
    Ok(())
}

/// Resolve an optional query window, defaulting to the next week.
fn resolve_window(query: &WindowQuery) -> Result<TimeRange, ApiError> {
    let start = query.start.unwrap_or_else(Utc::now);
    let end = query
        .end
        .unwrap_or_else(|| start + Duration::days(DEFAULT_WINDOW_DAYS));
    Ok(TimeRange::new(start, end)?)
}

async fn entries_in_window(
    conn: &mut diesel_async::AsyncPgConnection,
    owner: uuid::Uuid,
    window: &TimeRange,
) -> Result<Vec<AvailabilityEntry>, ApiError> {
    let rows = db::availability::window_for_owner(conn, owner, window.start, window.end).await?;
    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        entries.push(AvailabilityEntry::try_from(row)?);
    }
    Ok(expand_in_window(entries, window))
}

/// GET /api/availability/me
pub async fn get_my_availability(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Json<AvailabilityWindowResponse>> {
    let user = auth::extract_auth_user(&headers, &state.auth)?;
    let window = resolve_window(&query)?;
    let mut conn = state.pool.get().await?;

    let availability = entries_in_window(&mut conn, user.id, &window).await?;

    Ok(Json(AvailabilityWindowResponse {
        availability,
        window,
    }))
}

/// GET /api/availability/user/:username — public calendars only.
pub async fn get_user_availability(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Json<PublicAvailabilityResponse>> {
    let window = resolve_window(&query)?;
    let mut conn = state.pool.get().await?;

    let user_row = db::users::find_public_by_username(&mut conn, &username)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    let availability = entries_in_window(&mut conn, user_row.id, &window).await?;

    Ok(Json(PublicAvailabilityResponse {
        user: (&user_row).into(),
        availability,
        window,
    }))
}

/// POST /api/availability
pub async fn create_availability(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateAvailabilityRequest>,
) -> ApiResult<(StatusCode, Json<AvailabilityEntry>)> {
    let user = auth::extract_auth_user(&headers, &state.auth)?;

    TimeRange::new(payload.start_time, payload.end_time)?;
    validate_recurrence(payload.is_recurring, payload.recurrence.as_ref())?;

    let label = payload
        .label
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| payload.kind.default_label().to_string());
    let (frequency, interval, days, until) =
        NewAvailabilityEntry::recurrence_columns(payload.recurrence.as_ref());

    let mut conn = state.pool.get().await?;
    let row = db::availability::create(
        &mut conn,
        NewAvailabilityEntry {
            owner_id: user.id,
            kind: payload.kind.as_str().to_string(),
            label,
            start_time: payload.start_time,
            end_time: payload.end_time,
            is_recurring: payload.is_recurring,
            recurrence_frequency: frequency,
            recurrence_interval: interval,
            recurrence_days_of_week: days,
            recurrence_until: until,
            source: EntrySource::Manual.as_str().to_string(),
            external_event_id: None,
            visible: payload.visible.unwrap_or(true),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(row.try_into()?)))
}

/// PUT /api/availability/:id
pub async fn update_availability(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<uuid::Uuid>,
    Json(patch): Json<UpdateAvailabilityRequest>,
) -> ApiResult<Json<AvailabilityEntry>> {
    let user = auth::extract_auth_user(&headers, &state.auth)?;
    let mut conn = state.pool.get().await?;

    let current: AvailabilityEntry = db::availability::find_owned(&mut conn, id, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Availability entry"))?
        .try_into()?;

    ensure_mutable(&current, "edit")?;

    let kind = patch.kind.unwrap_or(current.kind);
    let label = patch.label.unwrap_or(current.label);
    let start_time = patch.start_time.unwrap_or(current.start_time);
    let end_time = patch.end_time.unwrap_or(current.end_time);
    let is_recurring = patch.is_recurring.unwrap_or(current.is_recurring);
    let visible = patch.visible.unwrap_or(current.visible);
    let recurrence = if is_recurring {
        patch.recurrence.or(current.recurrence)
    } else {
        patch.recurrence
    };

    TimeRange::new(start_time, end_time)?;
    validate_recurrence(is_recurring, recurrence.as_ref())?;

    let row = db::availability::update_entry(
        &mut conn,
        id,
        kind.as_str(),
        &label,
        start_time,
        end_time,
        is_recurring,
        NewAvailabilityEntry::recurrence_columns(recurrence.as_ref()),
        visible,
    )
    .await?;

    Ok(Json(row.try_into()?))
}

/// DELETE /api/availability/:id
pub async fn delete_availability(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<uuid::Uuid>,
) -> ApiResult<StatusCode> {
    let user = auth::extract_auth_user(&headers, &state.auth)?;
    let mut conn = state.pool.get().await?;

    let current: AvailabilityEntry = db::availability::find_owned(&mut conn, id, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Availability entry"))?
        .try_into()?;

    ensure_mutable(&current, "delete")?;

    db::availability::delete(&mut conn, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/availability/find-overlap — public, like the calendars it reads.
pub async fn find_overlap(
    State(state): State<AppState>,
    Json(payload): Json<OverlapRequest>,
) -> ApiResult<Json<OverlapResponse>> {
    let mut conn = state.pool.get().await?;
    let response = overlap::find_overlap(&mut conn, &payload).await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Frequency;

    #[test]
    fn recurrence_payload_without_flag_is_rejected() {
        let rule = RecurrenceRule {
            frequency: Frequency::Weekly,
            interval: 1,
            days_of_week: vec![1],
            until: None,
        };
        assert!(matches!(
            validate_recurrence(false, Some(&rule)),
            Err(ApiError::Validation(_))
        ));
        assert!(validate_recurrence(true, Some(&rule)).is_ok());
        assert!(matches!(
            validate_recurrence(true, None),
            Err(ApiError::Validation(_))
        ));
        assert!(validate_recurrence(false, None).is_ok());
    }

    #[test]
    fn externally_synced_entries_are_immutable() {
        let entry = AvailabilityEntry {
            id: uuid::Uuid::new_v4(),
            owner_id: uuid::Uuid::new_v4(),
            kind: shared_types::AvailabilityKind::Busy,
            label: "Standup".to_string(),
            start_time: Utc::now(),
            end_time: Utc::now() + Duration::hours(1),
            is_recurring: false,
            recurrence: None,
            source: EntrySource::GoogleCalendar,
            external_event_id: Some("evt-1".to_string()),
            visible: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(matches!(
            ensure_mutable(&entry, "edit"),
            Err(ApiError::ImmutableSource(_))
        ));
        assert!(matches!(
            ensure_mutable(&entry, "delete"),
            Err(ApiError::ImmutableSource(_))
        ));

        let mut manual = entry;
        manual.source = EntrySource::Manual;
        manual.external_event_id = None;
        assert!(ensure_mutable(&manual, "edit").is_ok());
    }

    #[test]
    fn default_window_is_a_week() {
        let window = resolve_window(&WindowQuery::default()).unwrap();
        assert_eq!(window.duration(), Duration::days(DEFAULT_WINDOW_DAYS));
    }

    #[test]
    fn inverted_query_window_is_rejected() {
        let now = Utc::now();
        let query = WindowQuery {
            start: Some(now),
            end: Some(now - Duration::hours(1)),
        };
        assert!(resolve_window(&query).is_err());
    }
}
