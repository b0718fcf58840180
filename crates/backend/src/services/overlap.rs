//! Overlap engine.
//!
//! Resolves a set of public users, groups each one's visible `available`
//! entries inside the window (recurring templates expanded), and computes the
//! sub-ranges where everyone is simultaneously free. Any unresolvable
//! username fails the whole call; there are no partial results.

use diesel_async::AsyncPgConnection;
use shared_types::{
    expand_in_window, overlap::intersect_all, AvailabilityEntry, OverlapRequest, OverlapResponse,
    TimeRange, UserAvailability,
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::db;
use crate::error::ApiError;

const MAX_USERS: usize = 10;

pub async fn find_overlap(
    conn: &mut AsyncPgConnection,
    request: &OverlapRequest,
) -> Result<OverlapResponse, ApiError> {
    if request.usernames.is_empty() {
        return Err(ApiError::validation("At least one username is required"));
    }
    if request.usernames.len() > MAX_USERS {
        return Err(ApiError::validation(format!(
            "At most {} users per overlap query",
            MAX_USERS
        )));
    }
    let window = TimeRange::new(request.start, request.end)?;

    let mut seen = std::collections::HashSet::new();
    let usernames: Vec<String> = request
        .usernames
        .iter()
        .map(|u| u.to_lowercase())
        .filter(|u| seen.insert(u.clone()))
        .collect();

    let user_rows = db::users::find_public_by_usernames(conn, &usernames).await?;
    if user_rows.len() != usernames.len() {
        return Err(ApiError::not_found("One or more users"));
    }
    // Respond in the order the caller asked for.
    let by_name: HashMap<&str, &crate::models::UserRow> = user_rows
        .iter()
        .map(|row| (row.username.as_str(), row))
        .collect();
    let ordered: Vec<&crate::models::UserRow> = usernames
        .iter()
        .filter_map(|name| by_name.get(name.as_str()).copied())
        .collect();

    let owner_ids: Vec<Uuid> = ordered.iter().map(|row| row.id).collect();
    let entry_rows =
        db::availability::available_in_window(conn, &owner_ids, window.start, window.end).await?;

    let mut per_owner: HashMap<Uuid, Vec<AvailabilityEntry>> = HashMap::new();
    for row in entry_rows {
        let entry: AvailabilityEntry = row.try_into()?;
        per_owner.entry(entry.owner_id).or_default().push(entry);
    }

    let mut per_user = Vec::with_capacity(ordered.len());
    let mut range_lists = Vec::with_capacity(ordered.len());
    for user_row in &ordered {
        let entries = expand_in_window(
            per_owner.remove(&user_row.id).unwrap_or_default(),
            &window,
        );
        range_lists.push(entries.iter().map(|e| e.range()).collect());
        per_user.push(UserAvailability {
            user: (*user_row).into(),
            entries,
        });
    }

    let common_windows = intersect_all(&range_lists);

    Ok(OverlapResponse {
        per_user,
        common_windows,
        window,
    })
}
