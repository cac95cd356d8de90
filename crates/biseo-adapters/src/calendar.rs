//! Calendar backends.
//!
//! [`CalendarBackend`] is the narrow contract the schedule workflow consumes.
//! [`GoogleCalendar`] implements it against the Google Calendar v3 REST API
//! with a caller-supplied OAuth access token.  Token refresh is the caller's
//! business.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

use crate::error::{AdapterError, Result};
use crate::http::{build_client, ensure_success, join_segments, parse_base_url, read_json};
use crate::types::{CalendarEvent, EventDraft};

/// Default Google Calendar API root.
pub const GOOGLE_CALENDAR_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Upper bound on events fetched per window.
const MAX_RESULTS: &str = "250";

/// Operations the schedule workflow needs from a calendar.
#[async_trait]
pub trait CalendarBackend: Send + Sync {
    /// Events overlapping `[start, end)`, ordered by start time.
    async fn list_events(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<CalendarEvent>>;

    /// Events in `[start, end)` whose text matches `query`.
    async fn search_events(
        &self,
        query: &str,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<CalendarEvent>>;

    async fn insert_event(&self, draft: &EventDraft) -> Result<CalendarEvent>;

    /// Replace an existing event, keeping its id.
    async fn update_event(&self, event: &CalendarEvent) -> Result<CalendarEvent>;

    async fn delete_event(&self, event_id: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct EventsPage {
    #[serde(default)]
    items: Vec<CalendarEvent>,
}

/// Google Calendar v3 client bound to one calendar.
pub struct GoogleCalendar {
    http: reqwest::Client,
    base_url: Url,
    calendar_id: String,
    access_token: String,
}

impl GoogleCalendar {
    pub fn new(
        base_url: &str,
        calendar_id: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(AdapterError::Config(
                "google calendar access token is empty".into(),
            ));
        }
        Ok(Self {
            http: build_client(timeout),
            base_url: parse_base_url(base_url)?,
            calendar_id: calendar_id.into(),
            access_token,
        })
    }

    fn events_url(&self, event_id: Option<&str>) -> Result<Url> {
        let mut segments = vec!["calendars", self.calendar_id.as_str(), "events"];
        if let Some(id) = event_id {
            segments.push(id);
        }
        join_segments(&self.base_url, &segments)
    }

    async fn fetch_window(
        &self,
        query: Option<&str>,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<CalendarEvent>> {
        let mut params = vec![
            ("timeMin", start.to_rfc3339_opts(SecondsFormat::Secs, false)),
            ("timeMax", end.to_rfc3339_opts(SecondsFormat::Secs, false)),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
            ("maxResults", MAX_RESULTS.to_string()),
        ];
        if let Some(q) = query {
            params.push(("q", q.to_string()));
        }

        let response = self
            .http
            .get(self.events_url(None)?)
            .bearer_auth(&self.access_token)
            .query(&params)
            .send()
            .await?;
        let page: EventsPage = read_json(response, "calendar events").await?;
        Ok(page.items)
    }
}

#[async_trait]
impl CalendarBackend for GoogleCalendar {
    #[instrument(skip(self), fields(calendar = %self.calendar_id))]
    async fn list_events(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<CalendarEvent>> {
        let events = self.fetch_window(None, start, end).await?;
        debug!(count = events.len(), "listed calendar events");
        Ok(events)
    }

    #[instrument(skip(self), fields(calendar = %self.calendar_id))]
    async fn search_events(
        &self,
        query: &str,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<CalendarEvent>> {
        let events = self.fetch_window(Some(query), start, end).await?;
        debug!(count = events.len(), "searched calendar events");
        Ok(events)
    }

    #[instrument(skip(self, draft), fields(calendar = %self.calendar_id, summary = %draft.summary))]
    async fn insert_event(&self, draft: &EventDraft) -> Result<CalendarEvent> {
        let response = self
            .http
            .post(self.events_url(None)?)
            .bearer_auth(&self.access_token)
            .json(draft)
            .send()
            .await?;
        let event: CalendarEvent = read_json(response, "calendar event").await?;
        info!(event_id = %event.id, "calendar event created");
        Ok(event)
    }

    #[instrument(skip(self, event), fields(calendar = %self.calendar_id, event_id = %event.id))]
    async fn update_event(&self, event: &CalendarEvent) -> Result<CalendarEvent> {
        let response = self
            .http
            .put(self.events_url(Some(&event.id))?)
            .bearer_auth(&self.access_token)
            .json(event)
            .send()
            .await?;
        let updated: CalendarEvent =
            read_json(response, &format!("calendar event {}", event.id)).await?;
        info!("calendar event updated");
        Ok(updated)
    }

    #[instrument(skip(self), fields(calendar = %self.calendar_id))]
    async fn delete_event(&self, event_id: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.events_url(Some(event_id))?)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        ensure_success(response, &format!("calendar event {event_id}")).await?;
        info!("calendar event deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_token() {
        let result = GoogleCalendar::new(
            GOOGLE_CALENDAR_BASE_URL,
            "primary",
            "  ",
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(AdapterError::Config(_))));
    }

    #[test]
    fn event_urls_include_calendar_and_id() {
        let calendar = GoogleCalendar::new(
            GOOGLE_CALENDAR_BASE_URL,
            "primary",
            "token",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            calendar.events_url(None).unwrap().as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/primary/events"
        );
        assert!(
            calendar
                .events_url(Some("abc123"))
                .unwrap()
                .as_str()
                .ends_with("/events/abc123")
        );
    }
}
