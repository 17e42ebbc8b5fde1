use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::domain::{ApplicationId, AwardTier, DepartmentId, Semester, StudentId};
use super::error::AwardError;
use super::notify::{AwardNotice, AwardNotifier, NotificationGate};
use super::store::{Entity, GrantCommit, GrantReceipt, RecordStore, StoreError};

/// One award to write against a department budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantRequest {
    pub student_id: StudentId,
    pub dept_id: DepartmentId,
    pub tier: AwardTier,
    pub amount: u64,
    pub semester: Semester,
    /// Pending application this grant settles, if any.
    pub application: Option<ApplicationId>,
}

/// Ledger failures, checked in this order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("student already holds an award for this semester")]
    AlreadyAwarded,
    #[error("department budget {available} cannot cover {required}")]
    InsufficientBudget { required: u64, available: u64 },
    #[error("department not found")]
    DepartmentNotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<LedgerError> for AwardError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::AlreadyAwarded => AwardError::AlreadyAwarded,
            LedgerError::InsufficientBudget {
                required,
                available,
            } => AwardError::InsufficientBudget {
                required,
                available,
            },
            LedgerError::DepartmentNotFound => AwardError::NotFound(Entity::Department),
            LedgerError::Store(StoreError::ApplicationNotPending) => {
                AwardError::InvalidInput("application is no longer pending".to_string())
            }
            LedgerError::Store(other) => other.into(),
        }
    }
}

/// Enforces one award per (student, semester) and debits department budgets.
pub struct AwardLedger<S, N> {
    store: Arc<S>,
    notifications: NotificationGate<N>,
}

impl<S, N> AwardLedger<S, N>
where
    S: RecordStore + 'static,
    N: AwardNotifier + 'static,
{
    pub fn new(store: Arc<S>, notifications: NotificationGate<N>) -> Self {
        Self {
            store,
            notifications,
        }
    }

    /// Write one award and debit its amount from the department budget.
    ///
    /// The pre-checks give callers precise errors; the store commit repeats them
    /// under the department lock, so racing grants cannot both succeed.
    pub fn grant(&self, request: GrantRequest) -> Result<GrantReceipt, LedgerError> {
        let department = self
            .store
            .department(request.dept_id)?
            .ok_or(LedgerError::DepartmentNotFound)?;
        let student = self
            .store
            .student(request.student_id)?
            .filter(|student| student.dept_id == request.dept_id)
            .ok_or(StoreError::NotFound(Entity::Student))?;

        if self.holds_award(request.student_id, request.semester)? {
            return Err(LedgerError::AlreadyAwarded);
        }
        if department.budget < request.amount {
            return Err(LedgerError::InsufficientBudget {
                required: request.amount,
                available: department.budget,
            });
        }

        let commit = GrantCommit {
            student_id: request.student_id,
            dept_id: request.dept_id,
            student_name: student.name.clone(),
            tier: request.tier,
            amount: request.amount,
            semester: request.semester,
            application: request.application,
            awarded_at: Utc::now(),
        };

        let receipt = self.store.commit_grant(commit).map_err(|error| match error {
            StoreError::DuplicateAward => LedgerError::AlreadyAwarded,
            StoreError::InsufficientBudget { available } => LedgerError::InsufficientBudget {
                required: request.amount,
                available,
            },
            other => LedgerError::Store(other),
        })?;

        info!(
            award = %receipt.award.id,
            student = %request.student_id,
            department = %request.dept_id,
            tier = %request.tier,
            amount = request.amount,
            semester = %request.semester,
            remaining_budget = receipt.remaining_budget,
            "award granted"
        );

        self.notifications.award_approved(AwardNotice {
            email: student.email,
            name: student.name,
            tier: request.tier,
            amount: request.amount,
            semester: request.semester,
        });

        Ok(receipt)
    }

    /// Whether a scholarship or stipend already exists for the semester.
    pub fn holds_award(
        &self,
        student_id: StudentId,
        semester: Semester,
    ) -> Result<bool, StoreError> {
        Ok(self
            .store
            .awards_for_student(student_id)?
            .iter()
            .any(|award| award.semester == semester))
    }

    pub(crate) fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub(crate) fn notifications(&self) -> &NotificationGate<N> {
        &self.notifications
    }
}
