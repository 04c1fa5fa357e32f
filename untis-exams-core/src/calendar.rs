pub mod google;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::Result;

pub use google::GoogleCalendar;

/// A timed event as it exists on the remote calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Opaque id used for targeted updates
    pub id: String,
    pub summary: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub description: Option<String>,
}

/// Desired state of an event, sent on insert and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    pub summary: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub description: Option<String>,
    /// IANA name of the timezone the times were computed in
    pub time_zone: String,
    pub use_default_reminders: bool,
}

/// The three calendar operations reconciliation relies on.
#[async_trait]
pub trait CalendarBackend: Send + Sync {
    /// All non-deleted events of the calendar, recurring events expanded to
    /// single instances, ordered by start time.
    async fn list_events(&self, calendar_id: &str) -> Result<Vec<CalendarEvent>>;

    async fn insert_event(&self, calendar_id: &str, event: &EventDraft) -> Result<CalendarEvent>;

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &EventDraft,
    ) -> Result<CalendarEvent>;
}
