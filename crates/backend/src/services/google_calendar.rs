//! Google Calendar REST client behind the provider seam used by sync.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use shared_types::{CalendarListEntry, TimeRange};
use std::time::Duration;
use thiserror::Error;

const API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Failure modes of an external calendar provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The stored token was rejected; the caller must reconnect.
    #[error("calendar credential expired")]
    ExpiredCredential,
    #[error("calendar provider error: {0}")]
    Upstream(String),
}

/// One event as reported by the provider. Start/end are `None` for all-day
/// events, which sync skips.
#[derive(Debug, Clone)]
pub struct ExternalEvent {
    pub id: String,
    pub title: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// External calendar API boundary; mocked in sync tests.
#[async_trait]
pub trait CalendarProvider {
    async fn list_calendars(&self) -> Result<Vec<CalendarListEntry>, ProviderError>;

    async fn fetch_events(
        &self,
        calendar_id: &str,
        window: &TimeRange,
    ) -> Result<Vec<ExternalEvent>, ProviderError>;
}

/// Client for the Google Calendar v3 REST API using a stored bearer token.
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    access_token: String,
}

impl GoogleCalendarClient {
    pub fn new(access_token: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, access_token })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| ProviderError::Upstream(e.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::ExpiredCredential);
        }
        if !response.status().is_success() {
            return Err(ProviderError::Upstream(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Upstream(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarListItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListItem {
    id: String,
    summary: Option<String>,
    #[serde(default)]
    primary: bool,
    access_role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventListResponse {
    #[serde(default)]
    items: Vec<EventItem>,
}

#[derive(Debug, Deserialize)]
struct EventItem {
    id: String,
    summary: Option<String>,
    start: Option<EventTime>,
    end: Option<EventTime>,
}

/// Google sends either `dateTime` (timed event) or `date` (all-day).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    date_time: Option<DateTime<Utc>>,
    #[allow(dead_code)]
    date: Option<NaiveDate>,
}

#[async_trait]
impl CalendarProvider for GoogleCalendarClient {
    async fn list_calendars(&self) -> Result<Vec<CalendarListEntry>, ProviderError> {
        let url = format!("{}/users/me/calendarList", API_BASE);
        let response: CalendarListResponse = self.get_json(url, &[]).await?;

        Ok(response
            .items
            .into_iter()
            .map(|item| CalendarListEntry {
                name: item.summary.unwrap_or_else(|| item.id.clone()),
                id: item.id,
                primary: item.primary,
                access_role: item.access_role.unwrap_or_default(),
            })
            .collect())
    }

    async fn fetch_events(
        &self,
        calendar_id: &str,
        window: &TimeRange,
    ) -> Result<Vec<ExternalEvent>, ProviderError> {
        let url = format!(
            "{}/calendars/{}/events",
            API_BASE,
            urlencoding::encode(calendar_id)
        );
        let query = [
            ("timeMin", window.start.to_rfc3339()),
            ("timeMax", window.end.to_rfc3339()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ];
        let response: EventListResponse = self.get_json(url, &query).await?;

        Ok(response
            .items
            .into_iter()
            .map(|item| ExternalEvent {
                id: item.id,
                title: item.summary,
                start: item.start.and_then(|t| t.date_time),
                end: item.end.and_then(|t| t.date_time),
            })
            .collect())
    }
}
