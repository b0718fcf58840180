//! External calendar sync adapter.
//!
//! Pulls provider events in a fixed look-ahead window and mirrors them as
//! `busy` entries keyed by the provider's event id. Re-sync never updates in
//! place: an event already mirrored is left untouched until the user
//! disconnects and reconnects the provider.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use diesel_async::AsyncPgConnection;
use shared_types::{CalendarSyncOutcome, CalendarSyncSummary, EntrySource, TimeRange};
use uuid::Uuid;

use super::google_calendar::{CalendarProvider, ExternalEvent, ProviderError};
use crate::db;
use crate::error::ApiError;
use crate::models::NewAvailabilityEntry;

/// How far ahead sync looks from "now" at call time.
pub const LOOKAHEAD_DAYS: i64 = 30;

/// Configuration for talking to external calendar providers.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Bound on every outbound provider call; a timeout is a recoverable
    /// per-calendar failure, never a hang.
    pub http_timeout: std::time::Duration,
}

impl SyncConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let timeout_secs = std::env::var("SYNC_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        Self {
            http_timeout: std::time::Duration::from_secs(timeout_secs),
        }
    }
}

pub fn sync_window(now: DateTime<Utc>) -> TimeRange {
    TimeRange {
        start: now,
        end: now + Duration::days(LOOKAHEAD_DAYS),
    }
}

/// A provider event mapped to the busy block sync will store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusyBlock {
    pub external_id: String,
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Map a provider event to a storable block. All-day events (no concrete
/// instants) and degenerate ranges are skipped.
pub fn busy_block(event: &ExternalEvent) -> Option<BusyBlock> {
    let start = event.start?;
    let end = event.end?;
    if start >= end {
        return None;
    }
    Some(BusyBlock {
        external_id: event.id.clone(),
        label: event.title.clone().unwrap_or_else(|| "Busy".to_string()),
        start,
        end,
    })
}

/// Persistence seam for sync, so idempotency is testable without a database.
#[async_trait]
pub trait EntryStore {
    async fn has_external(
        &mut self,
        owner: Uuid,
        source: EntrySource,
        external_id: &str,
    ) -> anyhow::Result<bool>;

    async fn insert_busy(
        &mut self,
        owner: Uuid,
        source: EntrySource,
        block: &BusyBlock,
    ) -> anyhow::Result<()>;
}

/// Production store backed by the availability table.
pub struct PgEntryStore<'a> {
    pub conn: &'a mut AsyncPgConnection,
}

#[async_trait]
impl EntryStore for PgEntryStore<'_> {
    async fn has_external(
        &mut self,
        owner: Uuid,
        source: EntrySource,
        external_id: &str,
    ) -> anyhow::Result<bool> {
        let existing =
            db::availability::find_external(self.conn, owner, source.as_str(), external_id)
                .await?;
        Ok(existing.is_some())
    }

    async fn insert_busy(
        &mut self,
        owner: Uuid,
        source: EntrySource,
        block: &BusyBlock,
    ) -> anyhow::Result<()> {
        db::availability::create(
            self.conn,
            NewAvailabilityEntry {
                owner_id: owner,
                kind: "busy".to_string(),
                label: block.label.clone(),
                start_time: block.start,
                end_time: block.end,
                is_recurring: false,
                recurrence_frequency: None,
                recurrence_interval: None,
                recurrence_days_of_week: None,
                recurrence_until: None,
                source: source.as_str().to_string(),
                external_event_id: Some(block.external_id.clone()),
                visible: true,
            },
        )
        .await?;
        Ok(())
    }
}

/// Sync every selected calendar for one owner.
///
/// Calendars run sequentially; a fetch failure on one is recorded in its
/// outcome and does not abort the rest. An expired credential aborts the whole
/// call (every remaining fetch would fail the same way) so the caller can mark
/// the connection for reconnect.
pub async fn run_sync<P, S>(
    provider: &P,
    store: &mut S,
    owner: Uuid,
    source: EntrySource,
    calendar_ids: &[String],
    now: DateTime<Utc>,
) -> Result<CalendarSyncSummary, ApiError>
where
    P: CalendarProvider + Sync,
    S: EntryStore + Send,
{
    let window = sync_window(now);
    let mut calendars = Vec::with_capacity(calendar_ids.len());
    let mut synced_events = 0;

    for calendar_id in calendar_ids {
        match provider.fetch_events(calendar_id, &window).await {
            Err(ProviderError::ExpiredCredential) => {
                return Err(ApiError::ExpiredCredential(
                    "Calendar token expired. Please reconnect.".to_string(),
                ));
            }
            Err(ProviderError::Upstream(msg)) => {
                tracing::warn!("Failed to sync calendar {}: {}", calendar_id, msg);
                calendars.push(CalendarSyncOutcome {
                    calendar_id: calendar_id.clone(),
                    created: 0,
                    skipped: 0,
                    error: Some(msg),
                });
            }
            Ok(events) => {
                let mut created = 0;
                let mut skipped = 0;
                for event in &events {
                    let block = match busy_block(event) {
                        Some(block) => block,
                        None => {
                            skipped += 1;
                            continue;
                        }
                    };
                    if store.has_external(owner, source, &block.external_id).await? {
                        skipped += 1;
                        continue;
                    }
                    store.insert_busy(owner, source, &block).await?;
                    created += 1;
                }
                synced_events += created;
                calendars.push(CalendarSyncOutcome {
                    calendar_id: calendar_id.clone(),
                    created,
                    skipped,
                    error: None,
                });
            }
        }
    }

    Ok(CalendarSyncSummary {
        synced_events,
        calendars,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shared_types::CalendarListEntry;
    use std::collections::{HashMap, HashSet};

    fn ts(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn event(id: &str, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> ExternalEvent {
        ExternalEvent {
            id: id.to_string(),
            title: Some(format!("event {}", id)),
            start,
            end,
        }
    }

    struct MockProvider {
        calendars: HashMap<String, Vec<ExternalEvent>>,
        failing: HashSet<String>,
        expired: bool,
    }

    #[async_trait]
    impl CalendarProvider for MockProvider {
        async fn list_calendars(&self) -> Result<Vec<CalendarListEntry>, ProviderError> {
            Ok(vec![])
        }

        async fn fetch_events(
            &self,
            calendar_id: &str,
            _window: &TimeRange,
        ) -> Result<Vec<ExternalEvent>, ProviderError> {
            if self.expired {
                return Err(ProviderError::ExpiredCredential);
            }
            if self.failing.contains(calendar_id) {
                return Err(ProviderError::Upstream("boom".to_string()));
            }
            Ok(self.calendars.get(calendar_id).cloned().unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        seen: HashSet<(Uuid, String)>,
        inserted: Vec<BusyBlock>,
    }

    #[async_trait]
    impl EntryStore for MemoryStore {
        async fn has_external(
            &mut self,
            owner: Uuid,
            _source: EntrySource,
            external_id: &str,
        ) -> anyhow::Result<bool> {
            Ok(self.seen.contains(&(owner, external_id.to_string())))
        }

        async fn insert_busy(
            &mut self,
            owner: Uuid,
            _source: EntrySource,
            block: &BusyBlock,
        ) -> anyhow::Result<()> {
            self.seen.insert((owner, block.external_id.clone()));
            self.inserted.push(block.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn sync_is_idempotent_across_runs() {
        let provider = MockProvider {
            calendars: HashMap::from([(
                "work".to_string(),
                vec![
                    event("e1", Some(ts(10, 9)), Some(ts(10, 10))),
                    event("e2", Some(ts(11, 9)), Some(ts(11, 10))),
                ],
            )]),
            failing: HashSet::new(),
            expired: false,
        };
        let mut store = MemoryStore::default();
        let owner = Uuid::new_v4();
        let ids = vec!["work".to_string()];

        let first = run_sync(
            &provider,
            &mut store,
            owner,
            EntrySource::GoogleCalendar,
            &ids,
            ts(1, 0),
        )
        .await
        .unwrap();
        assert_eq!(first.synced_events, 2);

        let second = run_sync(
            &provider,
            &mut store,
            owner,
            EntrySource::GoogleCalendar,
            &ids,
            ts(1, 0),
        )
        .await
        .unwrap();
        assert_eq!(second.synced_events, 0);
        assert_eq!(second.calendars[0].skipped, 2);
        // Exactly one local entry per external event id.
        assert_eq!(store.inserted.len(), 2);
    }

    #[tokio::test]
    async fn all_day_events_are_skipped() {
        let provider = MockProvider {
            calendars: HashMap::from([(
                "personal".to_string(),
                vec![
                    event("timed", Some(ts(10, 9)), Some(ts(10, 10))),
                    event("all-day", None, None),
                    event("half-formed", Some(ts(12, 9)), None),
                ],
            )]),
            failing: HashSet::new(),
            expired: false,
        };
        let mut store = MemoryStore::default();

        let summary = run_sync(
            &provider,
            &mut store,
            Uuid::new_v4(),
            EntrySource::GoogleCalendar,
            &["personal".to_string()],
            ts(1, 0),
        )
        .await
        .unwrap();

        assert_eq!(summary.synced_events, 1);
        assert_eq!(summary.calendars[0].skipped, 2);
        assert_eq!(store.inserted[0].external_id, "timed");
    }

    #[tokio::test]
    async fn one_failing_calendar_does_not_abort_the_rest() {
        let provider = MockProvider {
            calendars: HashMap::from([
                (
                    "ok".to_string(),
                    vec![event("e1", Some(ts(10, 9)), Some(ts(10, 10)))],
                ),
                ("broken".to_string(), vec![]),
            ]),
            failing: HashSet::from(["broken".to_string()]),
            expired: false,
        };
        let mut store = MemoryStore::default();

        let summary = run_sync(
            &provider,
            &mut store,
            Uuid::new_v4(),
            EntrySource::GoogleCalendar,
            &["broken".to_string(), "ok".to_string()],
            ts(1, 0),
        )
        .await
        .unwrap();

        assert_eq!(summary.synced_events, 1);
        assert!(summary.calendars[0].error.is_some());
        assert!(summary.calendars[1].error.is_none());
    }

    #[tokio::test]
    async fn expired_credential_aborts_the_call() {
        let provider = MockProvider {
            calendars: HashMap::new(),
            failing: HashSet::new(),
            expired: true,
        };
        let mut store = MemoryStore::default();

        let result = run_sync(
            &provider,
            &mut store,
            Uuid::new_v4(),
            EntrySource::GoogleCalendar,
            &["work".to_string()],
            ts(1, 0),
        )
        .await;

        assert!(matches!(result, Err(ApiError::ExpiredCredential(_))));
        assert!(store.inserted.is_empty());
    }

    #[test]
    fn busy_block_rejects_inverted_ranges() {
        let bad = event("e", Some(ts(10, 10)), Some(ts(10, 9)));
        assert!(busy_block(&bad).is_none());
    }

    #[test]
    fn sync_window_spans_thirty_days() {
        let now = ts(1, 0);
        let window = sync_window(now);
        assert_eq!(window.start, now);
        assert_eq!(window.end, now + Duration::days(30));
    }
}
