//! Batch scholarship approval over a department roster.
//!
//! Grants run one after another against the shared department budget, so the
//! cut-off where money runs out follows roster order. A student that cannot be
//! awarded is reported and the batch moves on.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::domain::{AwardKind, AwardRecord, DepartmentId, Student, StudentId};
use super::eligibility::{self, IneligibilityReason};
use super::error::AwardError;
use super::ledger::{AwardLedger, GrantRequest, LedgerError};
use super::notify::AwardNotifier;
use super::store::{Entity, GrantReceipt, RecordStore, StoreError};

/// Why one student was skipped during a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum BulkFailureReason {
    StudentNotFound,
    WrongDepartment,
    NoAcademicRecord,
    NoCompletedSemester,
    NotEligible,
    AlreadyAwarded,
    InsufficientBudget { required: u64, available: u64 },
}

impl fmt::Display for BulkFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulkFailureReason::StudentNotFound => f.write_str("not found"),
            BulkFailureReason::WrongDepartment => f.write_str("belongs to another department"),
            BulkFailureReason::NoAcademicRecord => f.write_str("no academic record"),
            BulkFailureReason::NoCompletedSemester => f.write_str("no completed semester"),
            BulkFailureReason::NotEligible => f.write_str("not eligible"),
            BulkFailureReason::AlreadyAwarded => f.write_str("already awarded"),
            BulkFailureReason::InsufficientBudget {
                required,
                available,
            } => write!(f, "insufficient budget ({available} left, {required} needed)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkFailure {
    pub student_id: StudentId,
    #[serde(flatten)]
    pub reason: BulkFailureReason,
}

/// Aggregate outcome of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkResult {
    pub dept_id: DepartmentId,
    pub approved_count: usize,
    pub total_amount: u64,
    pub remaining_budget: u64,
    pub awards: Vec<AwardRecord>,
    pub failures: Vec<BulkFailure>,
}

impl BulkResult {
    fn empty(dept_id: DepartmentId, budget: u64) -> Self {
        Self {
            dept_id,
            approved_count: 0,
            total_amount: 0,
            remaining_budget: budget,
            awards: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn summary(&self) -> String {
        let mut message = format!("{} scholarship(s) approved", self.approved_count);
        if !self.failures.is_empty() {
            message.push_str(&format!(", {} failed", self.failures.len()));
        }
        message
    }
}

enum Outcome {
    Skipped(BulkFailureReason),
    Fatal(StoreError),
}

impl From<StoreError> for Outcome {
    fn from(value: StoreError) -> Self {
        Outcome::Fatal(value)
    }
}

/// Runs serialized scholarship grants over a roster.
pub struct BulkApprovalCoordinator<S, N> {
    ledger: Arc<AwardLedger<S, N>>,
}

impl<S, N> BulkApprovalCoordinator<S, N>
where
    S: RecordStore + 'static,
    N: AwardNotifier + 'static,
{
    pub fn new(ledger: Arc<AwardLedger<S, N>>) -> Self {
        Self { ledger }
    }

    /// Award every eligible student of the department.
    pub fn approve_all(&self, dept_id: DepartmentId) -> Result<BulkResult, AwardError> {
        let mut result = self.start(dept_id)?;
        let roster = self.ledger.store().roster(dept_id)?;
        for student in roster {
            self.process(&mut result, student)?;
        }
        self.finish(result)
    }

    /// Award the selected students, in the order given.
    pub fn approve_selected(
        &self,
        dept_id: DepartmentId,
        student_ids: &[StudentId],
    ) -> Result<BulkResult, AwardError> {
        let mut result = self.start(dept_id)?;
        for student_id in student_ids {
            let student = match self.ledger.store().student(*student_id)? {
                Some(student) if student.dept_id == dept_id => student,
                Some(_) => {
                    record_failure(&mut result, *student_id, BulkFailureReason::WrongDepartment);
                    continue;
                }
                None => {
                    record_failure(&mut result, *student_id, BulkFailureReason::StudentNotFound);
                    continue;
                }
            };
            self.process(&mut result, student)?;
        }
        self.finish(result)
    }

    fn start(&self, dept_id: DepartmentId) -> Result<BulkResult, AwardError> {
        let department = self
            .ledger
            .store()
            .department(dept_id)?
            .ok_or(AwardError::NotFound(Entity::Department))?;
        Ok(BulkResult::empty(dept_id, department.budget))
    }

    /// Report the balance the department holds once the batch is done, which also
    /// reflects grants committed outside this batch.
    fn finish(&self, mut result: BulkResult) -> Result<BulkResult, AwardError> {
        if let Some(department) = self.ledger.store().department(result.dept_id)? {
            result.remaining_budget = department.budget;
        }
        info!(
            department = %result.dept_id,
            approved = result.approved_count,
            failed = result.failures.len(),
            total_amount = result.total_amount,
            remaining_budget = result.remaining_budget,
            "bulk scholarship approval finished"
        );
        Ok(result)
    }

    fn process(&self, result: &mut BulkResult, student: Student) -> Result<(), AwardError> {
        let student_id = student.student_id;
        match self.grant_one(result.dept_id, student) {
            Ok(receipt) => {
                result.approved_count += 1;
                result.total_amount += receipt.award.amount;
                result.remaining_budget = receipt.remaining_budget;
                result.awards.push(receipt.award);
                Ok(())
            }
            Err(Outcome::Skipped(reason)) => {
                record_failure(result, student_id, reason);
                Ok(())
            }
            Err(Outcome::Fatal(error)) => Err(AwardError::Internal(error)),
        }
    }

    fn grant_one(&self, dept_id: DepartmentId, student: Student) -> Result<GrantReceipt, Outcome> {
        let record = self
            .ledger
            .store()
            .academic_record(student.student_id)?
            .ok_or(Outcome::Skipped(BulkFailureReason::NoAcademicRecord))?;

        let decision = eligibility::evaluate_record(AwardKind::Scholarship, &record);
        let (tier, semester) = match (decision.tier, record.last_completed()) {
            (Some(tier), Some(semester)) => (tier, semester),
            _ => {
                let reason = match decision.reason {
                    Some(IneligibilityReason::FirstSemester) => {
                        BulkFailureReason::NoCompletedSemester
                    }
                    _ => BulkFailureReason::NotEligible,
                };
                return Err(Outcome::Skipped(reason));
            }
        };

        self.ledger
            .grant(GrantRequest {
                student_id: student.student_id,
                dept_id,
                tier,
                amount: decision.amount,
                semester,
                application: None,
            })
            .map_err(|error| match error {
                LedgerError::AlreadyAwarded => Outcome::Skipped(BulkFailureReason::AlreadyAwarded),
                LedgerError::InsufficientBudget {
                    required,
                    available,
                } => Outcome::Skipped(BulkFailureReason::InsufficientBudget {
                    required,
                    available,
                }),
                LedgerError::DepartmentNotFound => {
                    Outcome::Fatal(StoreError::NotFound(Entity::Department))
                }
                LedgerError::Store(StoreError::NotFound(Entity::Student)) => {
                    Outcome::Skipped(BulkFailureReason::StudentNotFound)
                }
                LedgerError::Store(other) => Outcome::Fatal(other),
            })
    }
}

fn record_failure(result: &mut BulkResult, student_id: StudentId, reason: BulkFailureReason) {
    debug!(student = %student_id, %reason, "bulk approval skipped student");
    result.failures.push(BulkFailure { student_id, reason });
}
