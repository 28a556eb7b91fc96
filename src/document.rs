use crate::error::SeedError;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedDocument {
    #[serde(rename = "University", default)]
    pub universities: Vec<University>,
    #[serde(rename = "Professors", default)]
    pub professors: Vec<Professor>,
    #[serde(rename = "Students", default)]
    pub students: Vec<Student>,
    #[serde(rename = "AcademicTerms", default)]
    pub academic_terms: Vec<AcademicTerm>,
    #[serde(rename = "Sections", default)]
    pub sections: Vec<Section>,
    #[serde(rename = "Enrollments", default)]
    pub enrollments: Vec<Enrollment>,
    #[serde(rename = "AttendanceRecords", default)]
    pub attendance_records: Vec<AttendanceRecord>,
    #[serde(rename = "AbsenceJustifications", default)]
    pub absence_justifications: Vec<AbsenceJustification>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct University {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub acronym: Option<String>,
    #[serde(rename = "Departments", default)]
    pub departments: Vec<Department>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Department {
    pub id: i64,
    pub name: String,
    #[serde(rename = "Courses", default)]
    pub courses: Vec<Course>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Course {
    pub id: i64,
    pub name: String,
    #[serde(rename = "Subjects", default)]
    pub subjects: Vec<Subject>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub credit_hours: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Professor {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub registration: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub registration: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AcademicTerm {
    pub id: i64,
    pub code: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Section {
    pub id: i64,
    pub subject_id: i64,
    pub professor_id: i64,
    pub academic_term_id: i64,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub section_id: i64,
    pub enrollment_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Justified,
    JustificationPending,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Justified => "justified",
            AttendanceStatus::JustificationPending => "justification_pending",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttendanceRecord {
    pub id: i64,
    pub enrollment_id: i64,
    pub class_date: NaiveDate,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AbsenceJustification {
    pub id: i64,
    pub attendance_record_id: i64,
    pub reason: String,
    #[serde(default)]
    pub attachment: Option<String>,
    #[serde(default)]
    pub approval_status: ApprovalStatus,
}

pub struct LoadedDocument {
    pub bytes: Vec<u8>,
    pub document: SeedDocument,
}

pub fn read_document(path: &Path) -> Result<LoadedDocument, SeedError> {
    let bytes = std::fs::read(path).map_err(|source| SeedError::DocumentRead {
        path: path.to_path_buf(),
        source,
    })?;
    let document = parse_document(&bytes)?;
    Ok(LoadedDocument { bytes, document })
}

pub fn parse_document(bytes: &[u8]) -> Result<SeedDocument, SeedError> {
    Ok(serde_json::from_slice(bytes)?)
}

fn require_text(entity: &'static str, id: i64, field: &str, value: &str) -> Result<(), SeedError> {
    if value.trim().is_empty() {
        return Err(SeedError::invalid(entity, id, format!("{} must not be empty", field)));
    }
    Ok(())
}

impl SeedDocument {
    // References are left to the store's foreign keys: parents may come
    // from a prior run.
    pub fn validate(&self) -> Result<(), SeedError> {
        for u in &self.universities {
            require_text("university", u.id, "name", &u.name)?;
            for d in &u.departments {
                require_text("department", d.id, "name", &d.name)?;
                for c in &d.courses {
                    require_text("course", c.id, "name", &c.name)?;
                    for s in &c.subjects {
                        require_text("subject", s.id, "name", &s.name)?;
                        require_text("subject", s.id, "code", &s.code)?;
                    }
                }
            }
        }
        for p in &self.professors {
            require_text("professor", p.id, "name", &p.name)?;
        }
        for s in &self.students {
            require_text("student", s.id, "name", &s.name)?;
            require_text("student", s.id, "registration", &s.registration)?;
        }
        for t in &self.academic_terms {
            require_text("academic term", t.id, "code", &t.code)?;
            if t.end_date < t.start_date {
                return Err(SeedError::invalid(
                    "academic term",
                    t.id,
                    format!("end_date {} precedes start_date {}", t.end_date, t.start_date),
                ));
            }
        }
        for j in &self.absence_justifications {
            require_text("absence justification", j.id, "reason", &j.reason)?;
        }
        Ok(())
    }

    pub fn record_count(&self) -> usize {
        let hierarchy: usize = self
            .universities
            .iter()
            .map(|u| {
                1 + u
                    .departments
                    .iter()
                    .map(|d| 1 + d.courses.iter().map(|c| 1 + c.subjects.len()).sum::<usize>())
                    .sum::<usize>()
            })
            .sum();
        hierarchy
            + self.professors.len()
            + self.students.len()
            + self.academic_terms.len()
            + self.sections.len()
            + self.enrollments.len()
            + self.attendance_records.len()
            + self.absence_justifications.len()
    }
}
