use std::{
    fmt,
    hash::{self, Hash},
};

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, codec};

/// One scheduled exam as reported by WebUntis.
///
/// Equality and hashing only look at [`ExamKey`]; `subject`, `description`
/// and `exam_type` can be rewritten without creating a different exam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    /// Category tag such as "Schularbeit"
    pub exam_type: Option<String>,
    pub name: Option<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Display label, possibly replaced through [`crate::SubjectAliases`]
    pub subject: String,
    pub description: Option<String>,
}

/// Identity of an exam: `(name, date, start_time, end_time)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExamKey {
    pub name: Option<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl Exam {
    pub fn key(&self) -> ExamKey {
        ExamKey {
            name: self.name.clone(),
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }

    /// Start instant of the exam in `tz`. Computed on demand, never stored.
    pub fn start<Tz: TimeZone>(&self, tz: &Tz) -> Result<DateTime<Tz>> {
        Self::combine(tz, self.date, self.start_time, "startTime")
    }

    pub fn end<Tz: TimeZone>(&self, tz: &Tz) -> Result<DateTime<Tz>> {
        Self::combine(tz, self.date, self.end_time, "endTime")
    }

    fn combine<Tz: TimeZone>(
        tz: &Tz,
        date: NaiveDate,
        time: NaiveTime,
        field: &str,
    ) -> Result<DateTime<Tz>> {
        // An ambiguous local time (DST fold) resolves to the first occurrence
        tz.from_local_datetime(&date.and_time(time))
            .earliest()
            .ok_or_else(|| {
                Error::wire(
                    field,
                    format!("{date} {time} does not exist in the configured timezone"),
                )
            })
    }
}

impl PartialEq for Exam {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.date == other.date
            && self.start_time == other.start_time
            && self.end_time == other.end_time
    }
}

impl Eq for Exam {}

impl Hash for Exam {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.date.hash(state);
        self.start_time.hash(state);
        self.end_time.hash(state);
    }
}

impl fmt::Display for Exam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {} {}-{}",
            self.subject,
            codec::encode_date(self.date),
            codec::encode_time(self.start_time),
            codec::encode_time(self.end_time)
        )
    }
}

/// Target WebUntis instance for one school.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct School {
    /// Server host, e.g. `neilo.webuntis.com`
    pub server: String,
    /// Internal login name of the school (not the display name)
    pub login_name: String,
}

impl From<SchoolDescriptor> for School {
    fn from(descriptor: SchoolDescriptor) -> Self {
        Self {
            server: descriptor.server,
            login_name: descriptor.login_name,
        }
    }
}

/// A school returned by the WebUntis school search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolDescriptor {
    pub server: String,
    pub display_name: String,
    pub login_name: String,
    #[serde(default)]
    pub address: Option<String>,
}

/// User credentials. Held in memory only.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Timelike};
    use std::collections::HashSet;

    fn exam(subject: &str, name: Option<&str>, start: (u32, u32)) -> Exam {
        Exam {
            exam_type: Some("Test".to_string()),
            name: name.map(str::to_string),
            date: NaiveDate::from_ymd_opt(2024, 9, 12).unwrap(),
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(start.0, start.1 + 45, 0).unwrap(),
            subject: subject.to_string(),
            description: None,
        }
    }

    #[test]
    fn test_identity_ignores_mutable_fields() {
        let a = exam("Mathematics", Some("SA 1"), (8, 0));
        let mut b = a.clone();
        b.subject = "M".to_string();
        b.description = Some("chapters 1-3".to_string());
        b.exam_type = None;

        assert_eq!(a, b);
        assert_eq!(a.key(), b.key());

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_identity_uses_name_and_times() {
        let a = exam("Math", Some("SA 1"), (8, 0));
        assert_ne!(a, exam("Math", Some("SA 2"), (8, 0)));
        assert_ne!(a, exam("Math", None, (8, 0)));
        assert_ne!(a, exam("Math", Some("SA 1"), (9, 0)));
    }

    #[test]
    fn test_start_end_instants() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let exam = exam("Math", None, (8, 0));
        let start = exam.start(&tz).unwrap();
        let end = exam.end(&tz).unwrap();
        assert_eq!(start.hour(), 8);
        assert_eq!((end - start).num_minutes(), 45);
        assert_eq!(start.naive_utc().hour(), 6);
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials::new("student", "hunter2");
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("student"));
        assert!(!rendered.contains("hunter2"));
    }
}
