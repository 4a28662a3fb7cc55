//! Read-only student grade records and grade-status derivation.
//!
//! The dataset is a JSON array of `{ "name": ..., "grades": [{ "subject", "grade", "max" }] }`,
//! loaded once at startup and shared by every request.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value as JsonValue};

use crate::error::Error;
use crate::types::StudentId;

/// Qualitative label derived from a numeric grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GradeStatus {
    Excellent,
    Good,
    Satisfactory,
    Unsatisfactory,
    /// Placeholder status for students without records.
    NoData,
}

impl GradeStatus {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Satisfactory => "satisfactory",
            Self::Unsatisfactory => "unsatisfactory",
            Self::NoData => "—",
        }
    }
}

impl std::fmt::Display for GradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for GradeStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// `> 80` excellent, `60..=80` good, `40..=59` satisfactory, anything lower unsatisfactory.
#[must_use]
pub fn grade_status(grade: i64) -> GradeStatus {
    match grade {
        g if g > 80 => GradeStatus::Excellent,
        60..=80 => GradeStatus::Good,
        40..=59 => GradeStatus::Satisfactory,
        _ => GradeStatus::Unsatisfactory,
    }
}

/// The same bands for any dataset score, so `85.5` is excellent and `59.5` satisfactory.
#[must_use]
pub fn score_status(score: &Number) -> GradeStatus {
    if let Some(grade) = score.as_i64() {
        return grade_status(grade);
    }
    match score.as_f64() {
        Some(g) if g > 80.0 => GradeStatus::Excellent,
        Some(g) if g >= 60.0 => GradeStatus::Good,
        Some(g) if g >= 40.0 => GradeStatus::Satisfactory,
        _ => GradeStatus::Unsatisfactory,
    }
}

fn zero() -> Number {
    Number::from(0)
}

/// One stored grade, as it appears in the dataset.
///
/// Scores keep their JSON form, so `85.5` stays `85.5` and `90` stays `90`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grade {
    #[serde(default)]
    pub subject: String,
    #[serde(default = "zero")]
    pub grade: Number,
    #[serde(default = "zero")]
    pub max: Number,
}

/// A grade ready for display, with its derived status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeRecord {
    pub subject: String,
    pub grade: Number,
    pub max: Number,
    pub status: GradeStatus,
}

impl GradeRecord {
    /// Stand-in row shown for a student with no grades.
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            subject: "no data".into(),
            grade: zero(),
            max: zero(),
            status: GradeStatus::NoData,
        }
    }
}

impl From<&Grade> for GradeRecord {
    fn from(g: &Grade) -> Self {
        Self {
            subject: g.subject.clone(),
            grade: g.grade.clone(),
            max: g.max.clone(),
            status: score_status(&g.grade),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRecord {
    pub name: StudentId,
    pub grades: Vec<Grade>,
}

/// In-memory gradebook backed by a JSON dataset. Student order is dataset order.
#[derive(Debug, Clone, Default)]
pub struct JsonGradebook {
    students: Vec<StudentRecord>,
}

impl JsonGradebook {
    #[must_use]
    pub fn new(students: Vec<StudentRecord>) -> Self {
        let mut book = Self::default();
        for student in students {
            book.insert(student);
        }
        book
    }

    /// Parses a dataset. Malformed items are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Data`] if the text is not JSON or the top level is not an array.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let raw: JsonValue =
            serde_json::from_str(text).map_err(|e| Error::Data(format!("invalid JSON: {e}")))?;
        let JsonValue::Array(items) = raw else {
            return Err(Error::Data("top level is not a list".into()));
        };

        let mut book = Self::default();
        for item in items {
            match parse_student(&item) {
                Some(student) => book.insert(student),
                None => tracing::warn!(item = %item, "Skipping malformed gradebook item"),
            }
        }
        Ok(book)
    }

    /// Loads a dataset file. Any failure is logged and yields an empty gradebook.
    #[must_use]
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Gradebook data file unreadable");
                return Self::default();
            }
        };
        match Self::from_json(&text) {
            Ok(book) => {
                tracing::info!(path = %path.display(), students = book.len(), "Gradebook loaded");
                book
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Gradebook data rejected");
                Self::default()
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.students.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    #[must_use]
    pub fn list_students(&self) -> Vec<StudentId> {
        self.students.iter().map(|s| s.name.clone()).collect()
    }

    /// Grades with derived status; a single placeholder row when there are none.
    #[must_use]
    pub fn grades_for(&self, student_id: &StudentId) -> Vec<GradeRecord> {
        let grades = self
            .students
            .iter()
            .find(|s| &s.name == student_id)
            .map(|s| s.grades.as_slice())
            .unwrap_or_default();

        if grades.is_empty() {
            tracing::debug!(student = %student_id, "No grades found");
            return vec![GradeRecord::placeholder()];
        }
        grades.iter().map(GradeRecord::from).collect()
    }

    // A repeated name replaces the earlier record but keeps its position.
    fn insert(&mut self, student: StudentRecord) {
        match self.students.iter_mut().find(|s| s.name == student.name) {
            Some(existing) => *existing = student,
            None => self.students.push(student),
        }
    }
}

fn parse_student(item: &JsonValue) -> Option<StudentRecord> {
    let name = item.get("name")?.as_str()?;
    let grades = item
        .get("grades")?
        .as_array()?
        .iter()
        .filter_map(|g| match Grade::deserialize(g) {
            Ok(grade) => Some(grade),
            Err(e) => {
                tracing::warn!(
                    student = name,
                    entry = %g,
                    error = %e,
                    "Skipping malformed grade entry"
                );
                None
            }
        })
        .collect();
    Some(StudentRecord {
        name: StudentId::from(name),
        grades,
    })
}
