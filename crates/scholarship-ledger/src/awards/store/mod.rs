mod memory;

pub use memory::{InMemoryRecordStore, SeedData, SeedError, SeedStudent};

use chrono::{DateTime, Utc};

use super::domain::{
    AcademicRecord, AcademicRecordUpdate, ApplicationId, AwardRecord, AwardTier, Department,
    DepartmentId, IncomeRecord, Semester, Student, StipendApplication, StudentId,
};

/// Entity names used in `StoreError::NotFound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Department,
    Student,
    AcademicRecord,
    Application,
}

impl Entity {
    pub const fn label(self) -> &'static str {
        match self {
            Entity::Department => "department",
            Entity::Student => "student",
            Entity::AcademicRecord => "academic record",
            Entity::Application => "application",
        }
    }
}

/// Error enumeration for record store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("an award already exists for this student and semester")]
    DuplicateAward,
    #[error("department budget {available} cannot cover the award")]
    InsufficientBudget { available: u64 },
    #[error("student already has a pending application")]
    PendingApplicationExists,
    #[error("application is no longer pending")]
    ApplicationNotPending,
    #[error("{} not found", .0.label())]
    NotFound(Entity),
    #[error("student is already enrolled in department {0}")]
    EnrolledElsewhere(DepartmentId),
    #[error("academic record update rejected: {0}")]
    InvalidRecord(String),
    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

/// Everything needed to write one award atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct GrantCommit {
    pub student_id: StudentId,
    pub dept_id: DepartmentId,
    pub student_name: String,
    pub tier: AwardTier,
    pub amount: u64,
    pub semester: Semester,
    /// Pending application settled by this grant, moved to Approved in the same commit.
    pub application: Option<ApplicationId>,
    pub awarded_at: DateTime<Utc>,
}

/// Committed award plus the department balance left after the debit.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct GrantReceipt {
    pub award: AwardRecord,
    pub remaining_budget: u64,
}

/// Application row before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
    pub student_id: StudentId,
    pub dept_id: DepartmentId,
    pub tier: AwardTier,
    pub semester: Semester,
    pub created_at: DateTime<Utc>,
}

/// Transactional record store consumed by the ledger and application services.
///
/// The `commit_*` methods are the only writers of award, budget, application
/// and grade-sheet state; each must be atomic and serialized per department.
pub trait RecordStore: Send + Sync {
    fn department(&self, id: DepartmentId) -> Result<Option<Department>, StoreError>;
    fn student(&self, id: StudentId) -> Result<Option<Student>, StoreError>;
    /// Students of a department in ascending id order.
    fn roster(&self, dept_id: DepartmentId) -> Result<Vec<Student>, StoreError>;
    fn academic_record(&self, id: StudentId) -> Result<Option<AcademicRecord>, StoreError>;
    fn awards_for_student(&self, id: StudentId) -> Result<Vec<AwardRecord>, StoreError>;
    fn awards_for_department(&self, dept_id: DepartmentId) -> Result<Vec<AwardRecord>, StoreError>;
    fn application(&self, id: ApplicationId) -> Result<Option<StipendApplication>, StoreError>;
    fn applications_for_student(
        &self,
        id: StudentId,
    ) -> Result<Vec<StipendApplication>, StoreError>;
    fn applications_for_department(
        &self,
        dept_id: DepartmentId,
    ) -> Result<Vec<StipendApplication>, StoreError>;
    fn income_record(&self, id: StudentId) -> Result<Option<IncomeRecord>, StoreError>;

    /// Insert the award, debit the budget and settle the linked application, or change nothing.
    fn commit_grant(&self, grant: GrantCommit) -> Result<GrantReceipt, StoreError>;
    /// Upsert the income record and insert a Pending application unless one is already pending.
    fn commit_submission(
        &self,
        income: IncomeRecord,
        application: NewApplication,
    ) -> Result<StipendApplication, StoreError>;
    /// Apply an edit to the student's grade sheet under the department lock and
    /// return the stored result. A student without a sheet starts from semester 1.
    fn commit_record_update(
        &self,
        id: StudentId,
        update: &AcademicRecordUpdate,
    ) -> Result<AcademicRecord, StoreError>;
    /// Move a Pending application to Rejected.
    fn commit_rejection(
        &self,
        id: ApplicationId,
        at: DateTime<Utc>,
    ) -> Result<StipendApplication, StoreError>;
}
