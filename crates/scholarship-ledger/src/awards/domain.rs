use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of graded semesters tracked per student.
pub const SEMESTER_COUNT: usize = 8;

/// Upper bound of the grading scale.
pub const MAX_GPA: f64 = 4.0;

/// Identifier wrapper for departments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepartmentId(pub u32);

/// Identifier wrapper for students.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub u64);

/// Identifier wrapper for department administrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdminId(pub u32);

/// Identifier wrapper for stipend applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub u64);

/// Identifier wrapper for granted awards (scholarships and stipends share one sequence).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AwardId(pub u64);

impl fmt::Display for DepartmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dept-{}", self.0)
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "app-{:06}", self.0)
    }
}

impl fmt::Display for AwardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "award-{:06}", self.0)
    }
}

/// Validation failures for academic data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    #[error("semester {0} is outside 1-8")]
    SemesterOutOfRange(u8),
    #[error("GPA {value} for semester {semester} must be between 0.00 and 4.00")]
    InvalidGpa { semester: u8, value: f64 },
    #[error("semester {0} is in progress and cannot carry a GPA yet")]
    CurrentSemesterGraded(u8),
    #[error("'{0}' is not a semester label")]
    InvalidSemesterLabel(String),
}

/// One of the eight semesters, serialized with its display label (`"Semester N"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Semester(u8);

impl Semester {
    pub fn new(number: u8) -> Result<Self, DomainError> {
        if (1..=SEMESTER_COUNT as u8).contains(&number) {
            Ok(Self(number))
        } else {
            Err(DomainError::SemesterOutOfRange(number))
        }
    }

    pub const fn number(self) -> u8 {
        self.0
    }

    pub fn label(self) -> String {
        format!("Semester {}", self.0)
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Semester {}", self.0)
    }
}

impl TryFrom<String> for Semester {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let number = value
            .trim()
            .strip_prefix("Semester ")
            .and_then(|raw| raw.trim().parse::<u8>().ok())
            .ok_or_else(|| DomainError::InvalidSemesterLabel(value.clone()))?;
        Semester::new(number)
    }
}

impl From<Semester> for String {
    fn from(value: Semester) -> Self {
        value.label()
    }
}

/// Reject GPA values outside the 0.00-4.00 scale (including NaN and infinities).
pub fn validate_gpa(semester: u8, value: f64) -> Result<f64, DomainError> {
    if value.is_finite() && (0.0..=MAX_GPA).contains(&value) {
        Ok(value)
    } else {
        Err(DomainError::InvalidGpa { semester, value })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub faculty: String,
    /// Remaining disbursement balance in whole currency units.
    pub budget: u64,
}

/// Student identity snapshot. `dept_id` never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub student_id: StudentId,
    pub reg_no: u64,
    pub dept_id: DepartmentId,
    pub name: String,
    pub session: String,
    pub email: String,
}

/// Per-student grade sheet: up to eight semester GPAs plus the semester in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAcademicRecord")]
pub struct AcademicRecord {
    pub student_id: StudentId,
    current_semester: u8,
    semester_gpas: [Option<f64>; SEMESTER_COUNT],
}

#[derive(Deserialize)]
struct RawAcademicRecord {
    student_id: StudentId,
    current_semester: u8,
    #[serde(default)]
    semester_gpas: [Option<f64>; SEMESTER_COUNT],
}

impl TryFrom<RawAcademicRecord> for AcademicRecord {
    type Error = DomainError;

    fn try_from(raw: RawAcademicRecord) -> Result<Self, Self::Error> {
        AcademicRecord::new(raw.student_id, raw.current_semester, raw.semester_gpas)
    }
}

impl AcademicRecord {
    pub fn new(
        student_id: StudentId,
        current_semester: u8,
        semester_gpas: [Option<f64>; SEMESTER_COUNT],
    ) -> Result<Self, DomainError> {
        Semester::new(current_semester)?;
        for (index, gpa) in semester_gpas.iter().enumerate() {
            if let Some(value) = gpa {
                validate_gpa(index as u8 + 1, *value)?;
            }
        }
        if semester_gpas[current_semester as usize - 1].is_some() {
            return Err(DomainError::CurrentSemesterGraded(current_semester));
        }

        Ok(Self {
            student_id,
            current_semester,
            semester_gpas,
        })
    }

    /// Record for a student who has just enrolled (semester 1, nothing graded).
    pub fn freshman(student_id: StudentId) -> Self {
        Self {
            student_id,
            current_semester: 1,
            semester_gpas: [None; SEMESTER_COUNT],
        }
    }

    pub fn current_semester(&self) -> u8 {
        self.current_semester
    }

    pub fn semester_gpas(&self) -> &[Option<f64>; SEMESTER_COUNT] {
        &self.semester_gpas
    }

    pub fn gpa_for(&self, semester: Semester) -> Option<f64> {
        self.semester_gpas[semester.number() as usize - 1]
    }

    /// `current_semester - 1`, or 0 while the student is still in semester 1.
    pub fn last_completed_semester(&self) -> u8 {
        self.current_semester.saturating_sub(1)
    }

    pub fn last_completed(&self) -> Option<Semester> {
        Semester::new(self.last_completed_semester()).ok()
    }

    pub fn last_semester_gpa(&self) -> Option<f64> {
        self.last_completed().and_then(|semester| self.gpa_for(semester))
    }

    /// Mean of all graded semesters rounded to two decimals, 0.0 when nothing is graded.
    pub fn cgpa(&self) -> f64 {
        let graded: Vec<f64> = self.semester_gpas.iter().flatten().copied().collect();
        if graded.is_empty() {
            return 0.0;
        }
        let mean = graded.iter().sum::<f64>() / graded.len() as f64;
        (mean * 100.0).round() / 100.0
    }

    /// Apply an administrator edit. Nothing changes if any value is invalid.
    pub fn apply_update(&mut self, update: &AcademicRecordUpdate) -> Result<(), DomainError> {
        let current = update.current_semester.unwrap_or(self.current_semester);
        Semester::new(current)?;

        let mut gpas = self.semester_gpas;
        for (semester, value) in &update.semester_gpas {
            let slot = Semester::new(*semester)?;
            let value = validate_gpa(slot.number(), *value)?;
            if slot.number() == current {
                return Err(DomainError::CurrentSemesterGraded(current));
            }
            gpas[slot.number() as usize - 1] = Some(value);
        }
        gpas[current as usize - 1] = None;

        self.current_semester = current;
        self.semester_gpas = gpas;
        Ok(())
    }
}

/// Administrator edit of an academic record; GPAs are keyed by semester number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcademicRecordUpdate {
    #[serde(default)]
    pub current_semester: Option<u8>,
    #[serde(default)]
    pub semester_gpas: Vec<(u8, f64)>,
}

/// Award family; a student holds at most one award of either kind per semester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwardKind {
    Scholarship,
    Stipend,
}

impl AwardKind {
    pub const fn label(self) -> &'static str {
        match self {
            AwardKind::Scholarship => "scholarship",
            AwardKind::Stipend => "stipend",
        }
    }
}

/// Award tiers with their fixed disbursement amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AwardTier {
    #[serde(rename = "BUP Stipend")]
    BupStipend,
    #[serde(rename = "Vice Chancellor Stipend")]
    ViceChancellorStipend,
    #[serde(rename = "BUP Scholarship")]
    BupScholarship,
    #[serde(rename = "Chancellor Scholarship")]
    ChancellorScholarship,
}

impl AwardTier {
    pub const ALL: [AwardTier; 4] = [
        AwardTier::BupStipend,
        AwardTier::ViceChancellorStipend,
        AwardTier::BupScholarship,
        AwardTier::ChancellorScholarship,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            AwardTier::BupStipend => "BUP Stipend",
            AwardTier::ViceChancellorStipend => "Vice Chancellor Stipend",
            AwardTier::BupScholarship => "BUP Scholarship",
            AwardTier::ChancellorScholarship => "Chancellor Scholarship",
        }
    }

    pub const fn amount(self) -> u64 {
        match self {
            AwardTier::BupStipend => 6_000,
            AwardTier::ViceChancellorStipend => 12_000,
            AwardTier::BupScholarship => 9_000,
            AwardTier::ChancellorScholarship => 15_000,
        }
    }

    pub const fn kind(self) -> AwardKind {
        match self {
            AwardTier::BupStipend | AwardTier::ViceChancellorStipend => AwardKind::Stipend,
            AwardTier::BupScholarship | AwardTier::ChancellorScholarship => AwardKind::Scholarship,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for AwardTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Append-only ledger row. `student_name` is the name at award time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardRecord {
    pub id: AwardId,
    pub student_id: StudentId,
    pub dept_id: DepartmentId,
    pub student_name: String,
    #[serde(rename = "type")]
    pub tier: AwardTier,
    pub amount: u64,
    pub semester: Semester,
    pub awarded_at: DateTime<Utc>,
}

impl AwardRecord {
    pub fn kind(&self) -> AwardKind {
        self.tier.kind()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }
}

/// Student-submitted stipend request for their last completed semester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StipendApplication {
    pub id: ApplicationId,
    pub student_id: StudentId,
    pub dept_id: DepartmentId,
    #[serde(rename = "type")]
    pub tier: AwardTier,
    pub semester: Semester,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Financial disclosure supplied with a stipend application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeDisclosure {
    pub amount: f64,
    pub source: String,
    pub family_members: u32,
}

impl IncomeDisclosure {
    pub fn validate(&self) -> Result<(), String> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(format!("income amount {} is not a valid amount", self.amount));
        }
        if self.source.trim().is_empty() {
            return Err("income source must not be empty".to_string());
        }
        if self.family_members == 0 {
            return Err("family member count must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Latest income disclosure per student; each submission overwrites the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeRecord {
    pub student_id: StudentId,
    pub amount: f64,
    pub source: String,
    pub family_members: u32,
    pub recorded_at: DateTime<Utc>,
}

impl IncomeRecord {
    pub fn from_disclosure(
        student_id: StudentId,
        disclosure: &IncomeDisclosure,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            student_id,
            amount: disclosure.amount,
            source: disclosure.source.trim().to_string(),
            family_members: disclosure.family_members,
            recorded_at,
        }
    }
}
