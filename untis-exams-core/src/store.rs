use std::collections::HashSet;

use crate::{Exam, ExamKey, SubjectAliases};

/// Exams known in this run, deduplicated by [`ExamKey`] and kept in
/// insertion order. The store only grows.
#[derive(Debug, Default, Clone)]
pub struct ExamStore {
    exams: Vec<Exam>,
    keys: HashSet<ExamKey>,
}

impl ExamStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every exam not already known and returns the full accumulated set.
    ///
    /// Exams fetched earlier but missing from `exams` are kept.
    pub fn merge(&mut self, exams: impl IntoIterator<Item = Exam>) -> &[Exam] {
        let before = self.exams.len();
        for exam in exams {
            self.add(exam);
        }
        tracing::debug!(
            "Merged {} new exams, {} known",
            self.exams.len() - before,
            self.exams.len()
        );
        &self.exams
    }

    /// Returns `false` if an exam with the same identity was already present.
    pub fn add(&mut self, exam: Exam) -> bool {
        if !self.keys.insert(exam.key()) {
            return false;
        }
        self.exams.push(exam);
        true
    }

    pub fn contains(&self, exam: &Exam) -> bool {
        self.keys.contains(&exam.key())
    }

    /// Rewrites every subject through `aliases`. Identity is unaffected.
    pub fn translate_subjects(&mut self, aliases: &SubjectAliases) {
        for exam in &mut self.exams {
            exam.subject = aliases.translate(&exam.subject);
        }
    }

    pub fn exams(&self) -> &[Exam] {
        &self.exams
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Exam> {
        self.exams.iter()
    }

    pub fn len(&self) -> usize {
        self.exams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exams.is_empty()
    }
}

impl<'a> IntoIterator for &'a ExamStore {
    type Item = &'a Exam;
    type IntoIter = std::slice::Iter<'a, Exam>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn exam(subject: &str, day: u32, hour: u32) -> Exam {
        Exam {
            exam_type: None,
            name: Some(format!("{subject} test")),
            date: NaiveDate::from_ymd_opt(2024, 9, day).unwrap(),
            start_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(hour, 45, 0).unwrap(),
            subject: subject.to_string(),
            description: None,
        }
    }

    #[test]
    fn test_add_reports_duplicates() {
        let mut store = ExamStore::new();
        assert!(store.add(exam("Math", 12, 8)));
        assert!(!store.add(exam("Math", 12, 8)));

        let mut renamed = exam("Math", 12, 8);
        renamed.subject = "M".to_string();
        assert!(!store.add(renamed));
        assert_eq!(store.len(), 1);
        assert_eq!(store.exams()[0].subject, "Math");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let batch = vec![exam("Math", 12, 8), exam("Physics", 13, 10)];

        let mut once = ExamStore::new();
        once.merge(batch.clone());

        let mut twice = ExamStore::new();
        twice.merge(batch.clone());
        let merged = twice.merge(batch).to_vec();

        assert_eq!(merged, once.exams());
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_never_truncates() {
        let mut store = ExamStore::new();
        store.merge(vec![exam("Math", 12, 8), exam("Physics", 13, 10)]);
        let merged = store.merge(vec![exam("Physics", 13, 10), exam("German", 20, 9)]);

        let subjects: Vec<_> = merged.iter().map(|e| e.subject.as_str()).collect();
        assert_eq!(subjects, ["Math", "Physics", "German"]);
    }

    #[test]
    fn test_translate_keeps_identity() {
        let mut store = ExamStore::new();
        store.merge(vec![exam("Mathematics", 12, 8), exam("Physics", 13, 10)]);

        let mut aliases = SubjectAliases::new();
        aliases.add_alias("Mathematics", "M");
        store.translate_subjects(&aliases);

        assert_eq!(store.exams()[0].subject, "M");
        assert_eq!(store.exams()[1].subject, "Physics");
        assert!(store.contains(&exam("Mathematics", 12, 8)));
        assert!(!store.add(exam("Mathematics", 12, 8)));
    }
}
