//! Google Calendar v3 REST backend.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    calendar::{CalendarBackend, CalendarEvent, EventDraft},
    http::{self, HttpClientBuilder},
};

pub const GOOGLE_CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3/";
const GROUP_CALENDAR_DOMAIN: &str = "group.calendar.google.com";
const PAGE_SIZE: &str = "2500";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    #[serde(default)]
    items: Vec<GoogleEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleEvent {
    id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    start: Option<GoogleEventTime>,
    end: Option<GoogleEventTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventTime {
    date_time: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventBody<'a> {
    summary: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    start: EventTimeBody<'a>,
    end: EventTimeBody<'a>,
    reminders: Reminders,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventTimeBody<'a> {
    date_time: String,
    time_zone: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Reminders {
    use_default: bool,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl<'a> From<&'a EventDraft> for EventBody<'a> {
    fn from(draft: &'a EventDraft) -> Self {
        Self {
            summary: &draft.summary,
            description: draft.description.as_deref(),
            start: EventTimeBody {
                date_time: draft.start.to_rfc3339(),
                time_zone: &draft.time_zone,
            },
            end: EventTimeBody {
                date_time: draft.end.to_rfc3339(),
                time_zone: &draft.time_zone,
            },
            reminders: Reminders {
                use_default: draft.use_default_reminders,
            },
        }
    }
}

impl GoogleEvent {
    /// `None` for all-day and cancelled events.
    fn into_timed(self) -> Option<CalendarEvent> {
        if self.status.as_deref() == Some("cancelled") {
            return None;
        }
        let start = self.start.and_then(|t| t.date_time)?;
        let end = self.end.and_then(|t| t.date_time)?;
        Some(CalendarEvent {
            id: self.id,
            summary: self.summary.unwrap_or_default(),
            start,
            end,
            description: self.description,
        })
    }
}

/// Google Calendar authenticated with an OAuth bearer token.
pub struct GoogleCalendar {
    client: Client,
    base_url: Url,
    access_token: String,
}

impl GoogleCalendar {
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        let base_url = Url::parse(GOOGLE_CALENDAR_API)
            .map_err(|e| Error::Config(format!("Invalid calendar API URL: {e}")))?;
        Ok(Self::with_client(
            HttpClientBuilder::new().build()?,
            base_url,
            access_token,
        ))
    }

    pub fn with_client(client: Client, base_url: Url, access_token: impl Into<String>) -> Self {
        Self {
            client,
            base_url,
            access_token: access_token.into(),
        }
    }

    /// Expands a bare group calendar id to `<id>@group.calendar.google.com`.
    /// Full ids and `primary` are returned unchanged.
    pub fn normalize_calendar_id(calendar_id: &str) -> String {
        let calendar_id = calendar_id.trim();
        if calendar_id.contains('@') || calendar_id == "primary" {
            calendar_id.to_string()
        } else {
            format!("{calendar_id}@{GROUP_CALENDAR_DOMAIN}")
        }
    }

    fn events_url(&self, calendar_id: &str, event_id: Option<&str>) -> Result<Url> {
        let calendar_id = Self::normalize_calendar_id(calendar_id);
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| Error::Config("Calendar API URL cannot be a base".to_string()))?;
            segments
                .pop_if_empty()
                .extend(["calendars", calendar_id.as_str(), "events"]);
            if let Some(event_id) = event_id {
                segments.push(event_id);
            }
        }
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(http::handle_error_req)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        Err(Error::Calendar(format!("HTTP {status}: {message}")))
    }

    async fn read_event(response: Response) -> Result<CalendarEvent> {
        let body = response.text().await.map_err(http::handle_error_req)?;
        let event: GoogleEvent = serde_json::from_str(&body)?;
        let id = event.id.clone();
        event
            .into_timed()
            .ok_or_else(|| Error::wire("start.dateTime", format!("event {id} has no timed start")))
    }
}

#[async_trait]
impl CalendarBackend for GoogleCalendar {
    async fn list_events(&self, calendar_id: &str) -> Result<Vec<CalendarEvent>> {
        let url = self.events_url(calendar_id, None)?;
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("showDeleted", "false"),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
                ("maxResults", PAGE_SIZE),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let response = self.send(self.client.get(url.clone()).query(&query)).await?;
            let body = response.text().await.map_err(http::handle_error_req)?;
            let page: EventsPage = serde_json::from_str(&body)?;

            for item in page.items {
                let id = item.id.clone();
                match item.into_timed() {
                    Some(event) => events.push(event),
                    None => tracing::debug!("Skipping all-day or cancelled event {}", id),
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::info!("Listed {} events on calendar {}", events.len(), calendar_id);
        Ok(events)
    }

    async fn insert_event(&self, calendar_id: &str, event: &EventDraft) -> Result<CalendarEvent> {
        let url = self.events_url(calendar_id, None)?;
        let response = self
            .send(self.client.post(url).json(&EventBody::from(event)))
            .await?;
        Self::read_event(response).await
    }

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &EventDraft,
    ) -> Result<CalendarEvent> {
        let url = self.events_url(calendar_id, Some(event_id))?;
        let response = self
            .send(self.client.put(url).json(&EventBody::from(event)))
            .await?;
        Self::read_event(response).await
    }
}
