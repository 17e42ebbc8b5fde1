//! Stipend application lifecycle: Pending, then Approved or Rejected, never back.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{
    AcademicRecord, ApplicationId, ApplicationStatus, AwardKind, AwardTier, DepartmentId,
    IncomeDisclosure, IncomeRecord, StipendApplication, Student, StudentId,
};
use super::eligibility::{self, BUP_STIPEND_MIN_GPA};
use super::error::AwardError;
use super::ledger::{AwardLedger, GrantRequest, LedgerError};
use super::notify::{AwardNotifier, RejectionNotice};
use super::principal::Principal;
use super::store::{Entity, GrantReceipt, NewApplication, RecordStore, StoreError};

/// Student request for a stipend covering their last completed semester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StipendRequest {
    #[serde(rename = "type")]
    pub tier: AwardTier,
    pub income: IncomeDisclosure,
}

/// Drives stipend applications through their states and settles approvals on the ledger.
pub struct StipendApplications<S, N> {
    ledger: Arc<AwardLedger<S, N>>,
}

impl<S, N> StipendApplications<S, N>
where
    S: RecordStore + 'static,
    N: AwardNotifier + 'static,
{
    pub fn new(ledger: Arc<AwardLedger<S, N>>) -> Self {
        Self { ledger }
    }

    fn store(&self) -> &S {
        self.ledger.store()
    }

    /// Submit a stipend application for the calling student.
    pub fn submit(
        &self,
        principal: &Principal,
        request: StipendRequest,
    ) -> Result<StipendApplication, AwardError> {
        let (student_id, dept_id) = principal.require_student()?;
        if request.tier.kind() != AwardKind::Stipend {
            return Err(AwardError::InvalidInput(format!(
                "{} is not a stipend tier",
                request.tier
            )));
        }
        request.income.validate().map_err(AwardError::InvalidInput)?;

        let student = self.owned_student(student_id, dept_id)?;
        let record = self.store().academic_record(student_id)?;
        let semester = record
            .as_ref()
            .and_then(AcademicRecord::last_completed)
            .ok_or(AwardError::NoCompletedSemester)?;
        let gpa = record
            .as_ref()
            .and_then(AcademicRecord::last_semester_gpa)
            .filter(|gpa| *gpa >= BUP_STIPEND_MIN_GPA)
            .ok_or_else(|| {
                AwardError::NotEligible(format!(
                    "{semester} GPA must be at least {BUP_STIPEND_MIN_GPA:.2}"
                ))
            })?;

        if self.ledger.holds_award(student_id, semester)? {
            return Err(AwardError::AlreadyAwarded);
        }

        let history = self.store().applications_for_student(student_id)?;
        if history
            .iter()
            .any(|application| application.status == ApplicationStatus::Pending)
        {
            return Err(AwardError::DuplicatePending);
        }
        if history.iter().any(|application| {
            application.semester == semester && application.status == ApplicationStatus::Rejected
        }) {
            return Err(AwardError::PreviouslyRejected);
        }
        if !eligibility::meets_tier(request.tier, gpa) {
            return Err(AwardError::TierNotEligible {
                gpa,
                minimum: eligibility::minimum_gpa(request.tier),
            });
        }

        let now = Utc::now();
        let income = IncomeRecord::from_disclosure(student_id, &request.income, now);
        let application = self.store().commit_submission(
            income,
            NewApplication {
                student_id,
                dept_id: student.dept_id,
                tier: request.tier,
                semester,
                created_at: now,
            },
        )?;

        info!(
            application = %application.id,
            student = %student_id,
            tier = %application.tier,
            semester = %application.semester,
            "stipend application submitted"
        );
        Ok(application)
    }

    /// Approve a pending application: write the stipend, debit the budget and close the
    /// application in one commit. The amount follows the requested tier, not the current GPA.
    pub fn approve(
        &self,
        principal: &Principal,
        application_id: ApplicationId,
    ) -> Result<GrantReceipt, AwardError> {
        let dept_id = principal.require_admin()?;
        let (application, _) = self.reviewable(application_id, dept_id)?;

        let receipt = self
            .ledger
            .grant(GrantRequest {
                student_id: application.student_id,
                dept_id,
                tier: application.tier,
                amount: application.tier.amount(),
                semester: application.semester,
                application: Some(application.id),
            })
            .map_err(|error| match error {
                LedgerError::Store(StoreError::ApplicationNotPending) => {
                    self.closed_error(application_id)
                }
                other => other.into(),
            })?;

        info!(
            application = %application_id,
            award = %receipt.award.id,
            "stipend application approved"
        );
        Ok(receipt)
    }

    /// Reject a pending application. No budget effect.
    pub fn reject(
        &self,
        principal: &Principal,
        application_id: ApplicationId,
    ) -> Result<StipendApplication, AwardError> {
        let dept_id = principal.require_admin()?;
        let (_, student) = self.reviewable(application_id, dept_id)?;

        let rejected = self
            .store()
            .commit_rejection(application_id, Utc::now())
            .map_err(|error| match error {
                StoreError::ApplicationNotPending => self.closed_error(application_id),
                other => other.into(),
            })?;

        info!(
            application = %application_id,
            student = %rejected.student_id,
            "stipend application rejected"
        );
        self.ledger.notifications().application_rejected(RejectionNotice {
            email: student.email,
            name: student.name,
            tier: rejected.tier,
            semester: rejected.semester,
        });
        Ok(rejected)
    }

    /// Load an application for an admin decision, enforcing department ownership and
    /// that the application is still open.
    fn reviewable(
        &self,
        application_id: ApplicationId,
        dept_id: DepartmentId,
    ) -> Result<(StipendApplication, Student), AwardError> {
        let application = self
            .store()
            .application(application_id)?
            .ok_or(AwardError::NotFound(Entity::Application))?;
        let student = self
            .store()
            .student(application.student_id)?
            .ok_or(AwardError::NotFound(Entity::Student))?;
        if student.dept_id != dept_id {
            return Err(AwardError::WrongDepartment);
        }
        if application.status.is_terminal() {
            return Err(AwardError::ApplicationClosed(application.status));
        }
        Ok((application, student))
    }

    fn closed_error(&self, application_id: ApplicationId) -> AwardError {
        match self.store().application(application_id) {
            Ok(Some(application)) => AwardError::ApplicationClosed(application.status),
            Ok(None) => AwardError::NotFound(Entity::Application),
            Err(error) => error.into(),
        }
    }

    fn owned_student(
        &self,
        student_id: StudentId,
        dept_id: DepartmentId,
    ) -> Result<Student, AwardError> {
        let student = self
            .store()
            .student(student_id)?
            .ok_or(AwardError::NotFound(Entity::Student))?;
        if student.dept_id != dept_id {
            return Err(AwardError::WrongDepartment);
        }
        Ok(student)
    }

    /// Applications of the caller: the student's own, or the admin's whole department.
    pub fn history(
        &self,
        principal: &Principal,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<StipendApplication>, AwardError> {
        let mut applications = match principal {
            Principal::Student { student_id, .. } => {
                self.store().applications_for_student(*student_id)?
            }
            Principal::Admin { dept_id, .. } => {
                self.store().applications_for_department(*dept_id)?
            }
        };
        if let Some(status) = status {
            applications.retain(|application| application.status == status);
        }
        applications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(applications)
    }

    /// Single application, visible to its owner and to admins of the owner's department.
    pub fn get(
        &self,
        principal: &Principal,
        application_id: ApplicationId,
    ) -> Result<StipendApplication, AwardError> {
        let application = self
            .store()
            .application(application_id)?
            .ok_or(AwardError::NotFound(Entity::Application))?;
        match principal {
            Principal::Student { student_id, .. } if *student_id != application.student_id => {
                Err(AwardError::Forbidden("application belongs to another student"))
            }
            Principal::Admin { dept_id, .. } if *dept_id != application.dept_id => {
                Err(AwardError::WrongDepartment)
            }
            _ => Ok(application),
        }
    }
}
