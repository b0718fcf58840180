//! Domain types shared between the API surface and its consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod overlap;
pub mod recurrence;
pub mod time_range;

pub use recurrence::{Frequency, RecurrenceError, RecurrenceRule};
pub use time_range::{InvalidRange, TimeRange};

/// What an availability entry means for the owner's calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityKind {
    Available,
    Busy,
    Override,
}

impl AvailabilityKind {
    pub fn as_str(&self) -> &str {
        match self {
            AvailabilityKind::Available => "available",
            AvailabilityKind::Busy => "busy",
            AvailabilityKind::Override => "override",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(AvailabilityKind::Available),
            "busy" => Some(AvailabilityKind::Busy),
            "override" => Some(AvailabilityKind::Override),
            _ => None,
        }
    }

    /// Label applied when the caller doesn't supply one.
    pub fn default_label(&self) -> &str {
        match self {
            AvailabilityKind::Available => "Available for games",
            _ => "Busy",
        }
    }
}

/// Provenance of an availability entry. Externally-synced entries carry the
/// provider's event id and are immutable through the normal edit paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    Manual,
    GoogleCalendar,
    Outlook,
}

impl EntrySource {
    pub fn as_str(&self) -> &str {
        match self {
            EntrySource::Manual => "manual",
            EntrySource::GoogleCalendar => "google_calendar",
            EntrySource::Outlook => "outlook",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(EntrySource::Manual),
            "google_calendar" => Some(EntrySource::GoogleCalendar),
            "outlook" => Some(EntrySource::Outlook),
            _ => None,
        }
    }

    pub fn is_external(&self) -> bool {
        !matches!(self, EntrySource::Manual)
    }
}

/// One block on a user's calendar, concrete or a recurring template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityEntry {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub kind: AvailabilityKind,
    pub label: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_recurring: bool,
    pub recurrence: Option<RecurrenceRule>,
    pub source: EntrySource,
    pub external_event_id: Option<String>,
    pub visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AvailabilityEntry {
    /// The entry's stored range. Persisted entries always satisfy
    /// `start < end`, so this never fails for data read back from the store.
    pub fn range(&self) -> TimeRange {
        TimeRange {
            start: self.start_time,
            end: self.end_time,
        }
    }

    /// Concrete ranges this entry occupies inside `window`: the stored range
    /// for one-off entries, expanded occurrences for recurring templates.
    pub fn occurrences_in(&self, window: &TimeRange) -> Vec<TimeRange> {
        match (&self.recurrence, self.is_recurring) {
            (Some(rule), true) => recurrence::expand(rule, &self.range(), window),
            _ => {
                if self.range().overlaps(window) {
                    vec![self.range()]
                } else {
                    Vec::new()
                }
            }
        }
    }
}

/// Materialize a window's worth of entries: one-off entries pass through,
/// recurring templates become one entry per occurrence. Sorted by start time.
pub fn expand_in_window(
    entries: Vec<AvailabilityEntry>,
    window: &TimeRange,
) -> Vec<AvailabilityEntry> {
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        for occurrence in entry.occurrences_in(window) {
            let mut materialized = entry.clone();
            materialized.start_time = occurrence.start;
            materialized.end_time = occurrence.end;
            out.push(materialized);
        }
    }
    out.sort_by_key(|e| e.start_time);
    out
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAvailabilityRequest {
    pub kind: AvailabilityKind,
    pub label: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub is_recurring: bool,
    pub recurrence: Option<RecurrenceRule>,
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub kind: Option<AvailabilityKind>,
    pub label: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_recurring: Option<bool>,
    pub recurrence: Option<RecurrenceRule>,
    pub visible: Option<bool>,
}

/// Query window for availability listings; handlers default to the next seven
/// days when unset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WindowQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityWindowResponse {
    pub availability: Vec<AvailabilityEntry>,
    pub window: TimeRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicAvailabilityResponse {
    pub user: UserSummary,
    pub availability: Vec<AvailabilityEntry>,
    pub window: TimeRange,
}

// User-facing profile types

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicProfile {
    pub username: String,
    pub display_name: String,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub preferred_games: Vec<String>,
    pub platforms: Vec<String>,
    pub timezone: String,
    pub region: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub preferred_games: Option<Vec<String>>,
    pub platforms: Option<Vec<String>>,
    pub timezone: Option<String>,
    pub region: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileSearchQuery {
    pub game: Option<String>,
    pub platform: Option<String>,
    pub region: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

// Friend graph

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendStatus {
    Pending,
    Accepted,
    Declined,
    Blocked,
}

impl FriendStatus {
    pub fn as_str(&self) -> &str {
        match self {
            FriendStatus::Pending => "pending",
            FriendStatus::Accepted => "accepted",
            FriendStatus::Declined => "declined",
            FriendStatus::Blocked => "blocked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(FriendStatus::Pending),
            "accepted" => Some(FriendStatus::Accepted),
            "declined" => Some(FriendStatus::Declined),
            "blocked" => Some(FriendStatus::Blocked),
            _ => None,
        }
    }
}

/// Directed relationship document. For `blocked` edges the requester is the
/// blocker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendEdge {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub recipient_id: Uuid,
    pub status: FriendStatus,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl FriendEdge {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.requester_id == user_id || self.recipient_id == user_id
    }

    /// The party that isn't `user_id`.
    pub fn other_party(&self, user_id: Uuid) -> Uuid {
        if self.requester_id == user_id {
            self.recipient_id
        } else {
            self.requester_id
        }
    }
}

/// Relationship as seen from one side; `status: "none"` means no edge exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendshipStatusResponse {
    pub status: String,
    pub edge: Option<FriendEdge>,
    pub is_requester: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendsResponse {
    pub friends: Vec<UserSummary>,
    pub blocked: Vec<UserSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRequest {
    pub edge_id: Uuid,
    pub user: UserSummary,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRequestsResponse {
    pub received: Vec<PendingRequest>,
    pub sent: Vec<PendingRequest>,
}

// Overlap engine

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlapRequest {
    pub usernames: Vec<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// One user's available-time candidates inside the queried window, ordered by
/// start time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAvailability {
    pub user: UserSummary,
    pub entries: Vec<AvailabilityEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlapResponse {
    pub per_user: Vec<UserAvailability>,
    /// Sub-ranges where every queried user is simultaneously free.
    pub common_windows: Vec<TimeRange>,
    pub window: TimeRange,
}

// Calendar integration

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    ReconnectRequired,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::ReconnectRequired => "reconnect_required",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "connected" => Some(ConnectionStatus::Connected),
            "reconnect_required" => Some(ConnectionStatus::ReconnectRequired),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectCalendarRequest {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConnectionResponse {
    pub provider: EntrySource,
    pub connected: bool,
    pub status: Option<ConnectionStatus>,
    pub calendar_ids: Vec<String>,
    pub last_synced: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarListEntry {
    pub id: String,
    pub name: String,
    pub primary: bool,
    pub access_role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    pub calendar_ids: Vec<String>,
}

/// Outcome of syncing one provider calendar. `error` is set when the fetch
/// failed; sibling calendars still run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarSyncOutcome {
    pub calendar_id: String,
    pub created: usize,
    pub skipped: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarSyncSummary {
    pub synced_events: usize,
    pub calendars: Vec<CalendarSyncOutcome>,
}

// Notifications

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    General,
    FriendRequest,
    FriendAccepted,
    GameInvitation,
    AvailabilityMatch,
    System,
    Test,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationCategory::General => "general",
            NotificationCategory::FriendRequest => "friend_request",
            NotificationCategory::FriendAccepted => "friend_accepted",
            NotificationCategory::GameInvitation => "game_invitation",
            NotificationCategory::AvailabilityMatch => "availability_match",
            NotificationCategory::System => "system",
            NotificationCategory::Test => "test",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "general" => Some(NotificationCategory::General),
            "friend_request" => Some(NotificationCategory::FriendRequest),
            "friend_accepted" => Some(NotificationCategory::FriendAccepted),
            "game_invitation" => Some(NotificationCategory::GameInvitation),
            "availability_match" => Some(NotificationCategory::AvailabilityMatch),
            "system" => Some(NotificationCategory::System),
            "test" => Some(NotificationCategory::Test),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
}

impl NotificationPriority {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationPriority::Low => "low",
            NotificationPriority::Normal => "normal",
            NotificationPriority::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(NotificationPriority::Low),
            "normal" => Some(NotificationPriority::Normal),
            "high" => Some(NotificationPriority::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub category: NotificationCategory,
    pub payload: serde_json::Value,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub priority: NotificationPriority,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub unread_only: Option<bool>,
    pub category: Option<NotificationCategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

/// Mark everything unread as read, or only the listed ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarkReadRequest {
    pub ids: Option<Vec<Uuid>>,
}

// Push subscriptions

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushKeys {
    pub p256dh: String,
    pub auth: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub endpoint: String,
    pub keys: PushKeys,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsubscribeRequest {
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEndpointResponse {
    pub id: Uuid,
    pub endpoint: String,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fan-out result: the record always exists; delivery counts are best-effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub notification_id: Uuid,
    pub attempted: usize,
    pub delivered: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VapidPublicKeyResponse {
    pub public_key: String,
}

// Auth

/// Identity payload returned to the client after token validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUserResponse {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_enums_round_trip() {
        for kind in [
            AvailabilityKind::Available,
            AvailabilityKind::Busy,
            AvailabilityKind::Override,
        ] {
            assert_eq!(AvailabilityKind::parse(kind.as_str()), Some(kind));
        }
        for status in [
            FriendStatus::Pending,
            FriendStatus::Accepted,
            FriendStatus::Declined,
            FriendStatus::Blocked,
        ] {
            assert_eq!(FriendStatus::parse(status.as_str()), Some(status));
        }
        for source in [
            EntrySource::Manual,
            EntrySource::GoogleCalendar,
            EntrySource::Outlook,
        ] {
            assert_eq!(EntrySource::parse(source.as_str()), Some(source));
        }
        assert_eq!(AvailabilityKind::parse("weekend"), None);
    }

    #[test]
    fn default_labels_follow_kind() {
        assert_eq!(
            AvailabilityKind::Available.default_label(),
            "Available for games"
        );
        assert_eq!(AvailabilityKind::Busy.default_label(), "Busy");
        assert_eq!(AvailabilityKind::Override.default_label(), "Busy");
    }

    #[test]
    fn expand_in_window_materializes_templates() {
        use chrono::TimeZone;

        let ts = |d: u32, h: u32| Utc.with_ymd_and_hms(2024, 3, d, h, 0, 0).unwrap();
        let window = TimeRange::new(ts(4, 0), ts(11, 0)).unwrap();

        let base = AvailabilityEntry {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            kind: AvailabilityKind::Available,
            label: "Available for games".to_string(),
            start_time: ts(5, 18),
            end_time: ts(5, 20),
            is_recurring: false,
            recurrence: None,
            source: EntrySource::Manual,
            external_event_id: None,
            visible: true,
            created_at: ts(1, 0),
            updated_at: ts(1, 0),
        };

        let mut daily = base.clone();
        daily.start_time = ts(4, 9);
        daily.end_time = ts(4, 10);
        daily.is_recurring = true;
        daily.recurrence = Some(RecurrenceRule {
            frequency: Frequency::Daily,
            interval: 1,
            days_of_week: vec![],
            until: None,
        });

        let expanded = expand_in_window(vec![base.clone(), daily], &window);
        // Seven daily occurrences plus the one-off, sorted by start.
        assert_eq!(expanded.len(), 8);
        assert_eq!(expanded[0].start_time, ts(4, 9));
        assert!(expanded.windows(2).all(|w| w[0].start_time <= w[1].start_time));
        assert!(expanded.iter().any(|e| e.id == base.id));
    }

    #[test]
    fn edge_other_party_resolves_both_directions() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let edge = FriendEdge {
            id: Uuid::new_v4(),
            requester_id: a,
            recipient_id: b,
            status: FriendStatus::Accepted,
            accepted_at: None,
            created_at: Utc::now(),
        };
        assert_eq!(edge.other_party(a), b);
        assert_eq!(edge.other_party(b), a);
        assert!(edge.involves(a) && edge.involves(b));
    }
}
