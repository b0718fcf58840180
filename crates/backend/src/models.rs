// Database models for Diesel
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use shared_types::{
    AvailabilityEntry, AvailabilityKind, ConnectionStatus, EntrySource, FriendEdge, FriendStatus,
    Frequency, Notification, NotificationCategory, NotificationPriority, PublicProfile,
    PushEndpointResponse, RecurrenceRule, UserSummary,
};
use uuid::Uuid;

/// Database representation of availability_entries.
/// Recurrence is flattened into nullable columns; JSON payloads elsewhere are
/// stored as TEXT.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::availability_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AvailabilityEntryRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub kind: String,
    pub label: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_recurring: bool,
    pub recurrence_frequency: Option<String>,
    pub recurrence_interval: Option<i32>,
    pub recurrence_days_of_week: Option<Vec<Option<i16>>>,
    pub recurrence_until: Option<DateTime<Utc>>,
    pub source: String,
    pub external_event_id: Option<String>,
    pub visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AvailabilityEntryRow> for AvailabilityEntry {
    type Error = anyhow::Error;

    fn try_from(row: AvailabilityEntryRow) -> Result<Self> {
        let kind = AvailabilityKind::parse(&row.kind)
            .ok_or_else(|| anyhow!("unknown availability kind: {}", row.kind))?;
        let source = EntrySource::parse(&row.source)
            .ok_or_else(|| anyhow!("unknown entry source: {}", row.source))?;

        let recurrence = if row.is_recurring {
            let frequency = row
                .recurrence_frequency
                .as_deref()
                .and_then(Frequency::parse)
                .ok_or_else(|| anyhow!("recurring entry {} has no valid frequency", row.id))?;
            Some(RecurrenceRule {
                frequency,
                interval: row.recurrence_interval.unwrap_or(1).max(1) as u32,
                days_of_week: row
                    .recurrence_days_of_week
                    .unwrap_or_default()
                    .into_iter()
                    .flatten()
                    .map(|d| d as u8)
                    .collect(),
                until: row.recurrence_until,
            })
        } else {
            None
        };

        Ok(AvailabilityEntry {
            id: row.id,
            owner_id: row.owner_id,
            kind,
            label: row.label,
            start_time: row.start_time,
            end_time: row.end_time,
            is_recurring: row.is_recurring,
            recurrence,
            source,
            external_event_id: row.external_event_id,
            visible: row.visible,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Insertable struct for new availability entries
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::availability_entries)]
pub struct NewAvailabilityEntry {
    pub owner_id: Uuid,
    pub kind: String,
    pub label: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_recurring: bool,
    pub recurrence_frequency: Option<String>,
    pub recurrence_interval: Option<i32>,
    pub recurrence_days_of_week: Option<Vec<Option<i16>>>,
    pub recurrence_until: Option<DateTime<Utc>>,
    pub source: String,
    pub external_event_id: Option<String>,
    pub visible: bool,
}

impl NewAvailabilityEntry {
    /// Flatten an optional recurrence rule into the nullable columns.
    pub fn recurrence_columns(
        rule: Option<&RecurrenceRule>,
    ) -> (
        Option<String>,
        Option<i32>,
        Option<Vec<Option<i16>>>,
        Option<DateTime<Utc>>,
    ) {
        match rule {
            Some(rule) => (
                Some(rule.frequency.as_str().to_string()),
                Some(rule.interval as i32),
                Some(rule.days_of_week.iter().map(|&d| Some(d as i16)).collect()),
                rule.until,
            ),
            None => (None, None, None, None),
        }
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub preferred_games: Vec<Option<String>>,
    pub platforms: Vec<Option<String>>,
    pub timezone: String,
    pub region: String,
    pub is_public: bool,
    pub last_active: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&UserRow> for UserSummary {
    fn from(row: &UserRow) -> Self {
        UserSummary {
            id: row.id,
            username: row.username.clone(),
            display_name: row.display_name.clone(),
            timezone: row.timezone.clone(),
        }
    }
}

impl From<&UserRow> for PublicProfile {
    fn from(row: &UserRow) -> Self {
        PublicProfile {
            username: row.username.clone(),
            display_name: row.display_name.clone(),
            bio: row.bio.clone(),
            avatar_url: row.avatar_url.clone(),
            preferred_games: row.preferred_games.iter().flatten().cloned().collect(),
            platforms: row.platforms.iter().flatten().cloned().collect(),
            timezone: row.timezone.clone(),
            region: row.region.clone(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::friend_edges)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FriendEdgeRow {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub recipient_id: Uuid,
    pub status: String,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<FriendEdgeRow> for FriendEdge {
    type Error = anyhow::Error;

    fn try_from(row: FriendEdgeRow) -> Result<Self> {
        let status = FriendStatus::parse(&row.status)
            .ok_or_else(|| anyhow!("unknown friendship status: {}", row.status))?;
        Ok(FriendEdge {
            id: row.id,
            requester_id: row.requester_id,
            recipient_id: row.recipient_id,
            status,
            accepted_at: row.accepted_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub category: String,
    pub payload: String,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub priority: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = anyhow::Error;

    fn try_from(row: NotificationRow) -> Result<Self> {
        let category = NotificationCategory::parse(&row.category)
            .ok_or_else(|| anyhow!("unknown notification category: {}", row.category))?;
        let priority = NotificationPriority::parse(&row.priority)
            .ok_or_else(|| anyhow!("unknown notification priority: {}", row.priority))?;
        // Payload is opaque; a row predating a format change still lists fine.
        let payload = serde_json::from_str(&row.payload).unwrap_or(serde_json::Value::Null);
        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            body: row.body,
            category,
            payload,
            is_read: row.is_read,
            read_at: row.read_at,
            priority,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::push_endpoints)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PushEndpointRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub endpoint_url: String,
    pub p256dh: String,
    pub auth_key: String,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&PushEndpointRow> for PushEndpointResponse {
    fn from(row: &PushEndpointRow) -> Self {
        PushEndpointResponse {
            id: row.id,
            endpoint: row.endpoint_url.clone(),
            is_active: row.is_active,
            last_used_at: row.last_used_at,
            created_at: row.created_at,
        }
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::calendar_connections)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CalendarConnectionRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub provider: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub calendar_ids: Vec<Option<String>>,
    pub status: String,
    pub last_synced: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CalendarConnectionRow {
    pub fn status_parsed(&self) -> Option<ConnectionStatus> {
        ConnectionStatus::parse(&self.status)
    }

    pub fn calendar_id_list(&self) -> Vec<String> {
        self.calendar_ids.iter().flatten().cloned().collect()
    }
}
