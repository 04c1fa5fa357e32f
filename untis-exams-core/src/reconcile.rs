//! Diff-based push of exams into a calendar.
//!
//! Remote events are matched by `(summary, start date)` only, so an exam
//! whose time was corrected updates the already pushed event instead of
//! creating a second one. Two exams with the same subject on the same day
//! therefore share one remote event.

use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;

use crate::{
    Error, Exam, Result,
    calendar::{CalendarBackend, CalendarEvent, EventDraft},
};

/// Where and in which timezone exams are pushed.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub calendar_id: String,
    pub timezone: Tz,
}

/// What reconciliation did for one exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    Inserted { event_id: String },
    Updated { event_id: String },
    Unchanged { event_id: String },
}

#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub exam: Exam,
    pub action: SyncAction,
}

#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub outcomes: Vec<SyncOutcome>,
}

impl SyncReport {
    pub fn inserted(&self) -> usize {
        self.count(|a| matches!(a, SyncAction::Inserted { .. }))
    }

    pub fn updated(&self) -> usize {
        self.count(|a| matches!(a, SyncAction::Updated { .. }))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|a| matches!(a, SyncAction::Unchanged { .. }))
    }

    fn count(&self, f: impl Fn(&SyncAction) -> bool) -> usize {
        self.outcomes.iter().filter(|o| f(&o.action)).count()
    }
}

/// Makes a calendar reflect a set of exams with as few remote writes as
/// possible.
///
/// The event list is read once up front and not refreshed while exams are
/// pushed; do not run two reconcilers against the same calendar at once.
pub struct CalendarReconciler<'a, B: CalendarBackend + ?Sized> {
    backend: &'a B,
    options: SyncOptions,
}

impl<'a, B: CalendarBackend + ?Sized> CalendarReconciler<'a, B> {
    pub fn new(backend: &'a B, options: SyncOptions) -> Self {
        Self { backend, options }
    }

    /// Pushes `exams` in order, one remote call at a time.
    ///
    /// The first failing insert or update aborts the run with
    /// [`Error::Reconciliation`]; writes issued before it are kept.
    pub async fn reconcile<'e, I>(&self, exams: I) -> Result<SyncReport>
    where
        I: IntoIterator<Item = &'e Exam>,
    {
        let calendar_id = self.options.calendar_id.as_str();
        let existing = self.backend.list_events(calendar_id).await?;
        tracing::info!(
            "Reconciling against {} existing events on {}",
            existing.len(),
            calendar_id
        );

        let mut report = SyncReport::default();
        for exam in exams {
            let action = self
                .sync_exam(exam, &existing)
                .await
                .map_err(|e| Error::Reconciliation {
                    exam: exam.to_string(),
                    source: Box::new(e),
                })?;
            report.outcomes.push(SyncOutcome {
                exam: exam.clone(),
                action,
            });
        }

        tracing::info!(
            "Sync finished: {} inserted, {} updated, {} unchanged",
            report.inserted(),
            report.updated(),
            report.unchanged()
        );
        Ok(report)
    }

    async fn sync_exam(&self, exam: &Exam, existing: &[CalendarEvent]) -> Result<SyncAction> {
        let draft = self.draft(exam)?;
        let calendar_id = self.options.calendar_id.as_str();

        match find_match(exam, existing, &self.options.timezone) {
            Some(event) if same_times(event, &draft.start, &draft.end) => {
                tracing::debug!("{} already up to date as {}", exam, event.id);
                Ok(SyncAction::Unchanged {
                    event_id: event.id.clone(),
                })
            }
            Some(event) => {
                tracing::debug!("Updating {} for {}", event.id, exam);
                self.backend
                    .update_event(calendar_id, &event.id, &draft)
                    .await?;
                Ok(SyncAction::Updated {
                    event_id: event.id.clone(),
                })
            }
            None => {
                tracing::debug!("Inserting {}", exam);
                let created = self.backend.insert_event(calendar_id, &draft).await?;
                Ok(SyncAction::Inserted {
                    event_id: created.id,
                })
            }
        }
    }

    /// Calendar representation of an exam.
    pub fn draft(&self, exam: &Exam) -> Result<EventDraft> {
        let tz = &self.options.timezone;
        Ok(EventDraft {
            summary: exam.subject.clone(),
            start: exam.start(tz)?.fixed_offset(),
            end: exam.end(tz)?.fixed_offset(),
            description: describe(exam),
            time_zone: tz.name().to_string(),
            use_default_reminders: true,
        })
    }
}

/// First event with the exam's subject whose start falls on the exam's date.
pub fn find_match<'e>(
    exam: &Exam,
    events: &'e [CalendarEvent],
    tz: &Tz,
) -> Option<&'e CalendarEvent> {
    events.iter().find(|event| {
        event.summary == exam.subject && event.start.with_timezone(tz).date_naive() == exam.date
    })
}

fn same_times(
    event: &CalendarEvent,
    start: &DateTime<FixedOffset>,
    end: &DateTime<FixedOffset>,
) -> bool {
    event.start == *start && event.end == *end
}

/// Event description built from the exam's name, type and text.
pub fn describe(exam: &Exam) -> Option<String> {
    let mut lines = Vec::new();
    if let Some(name) = &exam.name {
        lines.push(name.clone());
    }
    if let Some(exam_type) = &exam.exam_type {
        lines.push(format!("Type: {exam_type}"));
    }
    if let Some(text) = &exam.description {
        lines.push(text.clone());
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
