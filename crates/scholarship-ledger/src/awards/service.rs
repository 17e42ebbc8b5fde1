use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::applications::{StipendApplications, StipendRequest};
use super::bulk::{BulkApprovalCoordinator, BulkResult};
use super::domain::{
    AcademicRecord, AcademicRecordUpdate, ApplicationId, ApplicationStatus, AwardKind,
    AwardRecord, AwardTier, DepartmentId, IncomeRecord, Semester, StipendApplication, Student,
    StudentId, SEMESTER_COUNT,
};
use super::eligibility::{self, IneligibilityReason};
use super::error::AwardError;
use super::ledger::{AwardLedger, GrantRequest};
use super::notify::{AwardNotifier, NotificationGate};
use super::principal::Principal;
use super::store::{Entity, GrantReceipt, RecordStore};
use crate::config::NotificationConfig;

/// Why a track is closed to a student for their last completed semester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EligibilityBlocker {
    #[serde(rename = "first_semester")]
    FirstSemester,
    #[serde(rename = "scholarship")]
    HoldsScholarship,
    #[serde(rename = "stipend")]
    HoldsStipend,
    #[serde(rename = "low_gpa_scholarship")]
    LowGpaScholarship,
    #[serde(rename = "low_gpa")]
    LowGpa,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackEligibility {
    pub eligible: bool,
    pub tier: Option<AwardTier>,
    pub amount: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<EligibilityBlocker>,
}

impl TrackEligibility {
    fn open(tier: AwardTier) -> Self {
        Self {
            eligible: true,
            tier: Some(tier),
            amount: tier.amount(),
            reason: None,
        }
    }

    fn closed(reason: EligibilityBlocker) -> Self {
        Self {
            eligible: false,
            tier: None,
            amount: 0,
            reason: Some(reason),
        }
    }
}

/// What the calling student can receive for their last completed semester.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentEligibility {
    pub student_id: StudentId,
    pub current_semester: u8,
    pub last_completed_semester: u8,
    pub last_semester_gpa: Option<f64>,
    pub cgpa: f64,
    pub scholarship: TrackEligibility,
    pub stipend: TrackEligibility,
    pub eligible_for_chancellor: bool,
    pub eligible_for_vice_chancellor: bool,
    pub pending_application: Option<StipendApplication>,
    pub can_apply: bool,
}

/// Grade sheet as shown to callers, with the derived metrics filled in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcademicRecordView {
    pub student_id: StudentId,
    pub current_semester: u8,
    pub semester_gpas: [Option<f64>; SEMESTER_COUNT],
    pub cgpa: f64,
    pub last_completed_semester: u8,
    pub last_semester_gpa: Option<f64>,
}

impl From<&AcademicRecord> for AcademicRecordView {
    fn from(record: &AcademicRecord) -> Self {
        Self {
            student_id: record.student_id,
            current_semester: record.current_semester(),
            semester_gpas: *record.semester_gpas(),
            cgpa: record.cgpa(),
            last_completed_semester: record.last_completed_semester(),
            last_semester_gpa: record.last_semester_gpa(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScholarshipCandidate {
    pub student_id: StudentId,
    pub reg_no: u64,
    pub name: String,
    pub semester: Semester,
    pub last_semester_gpa: f64,
    pub cgpa: f64,
    pub tier: AwardTier,
    pub amount: u64,
}

/// Preview of what an approve-all run would try to grant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateList {
    pub dept_id: DepartmentId,
    pub available_budget: u64,
    pub total_amount: u64,
    pub candidates: Vec<ScholarshipCandidate>,
}

/// Application row for review screens.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationView {
    #[serde(flatten)]
    pub application: StipendApplication,
    pub student_name: Option<String>,
    pub amount: u64,
    pub income: Option<IncomeRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindTotals {
    pub count: usize,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartmentSummary {
    pub dept_id: DepartmentId,
    pub name: String,
    pub faculty: String,
    pub budget: u64,
    pub students: usize,
    pub scholarships: KindTotals,
    pub stipends: KindTotals,
    pub pending_applications: usize,
}

/// Entry point for every award operation, checked against the calling principal.
pub struct AwardDesk<S, N> {
    ledger: Arc<AwardLedger<S, N>>,
    applications: StipendApplications<S, N>,
    bulk: BulkApprovalCoordinator<S, N>,
}

impl<S, N> AwardDesk<S, N>
where
    S: RecordStore + 'static,
    N: AwardNotifier + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, notifications: &NotificationConfig) -> Self {
        let gate = NotificationGate::new(notifier, notifications.enabled);
        let ledger = Arc::new(AwardLedger::new(store, gate));
        Self {
            applications: StipendApplications::new(Arc::clone(&ledger)),
            bulk: BulkApprovalCoordinator::new(Arc::clone(&ledger)),
            ledger,
        }
    }

    fn store(&self) -> &S {
        self.ledger.store()
    }

    pub fn notifications_enabled(&self) -> bool {
        self.ledger.notifications().is_enabled()
    }

    pub fn student_eligibility(
        &self,
        principal: &Principal,
    ) -> Result<StudentEligibility, AwardError> {
        let (student_id, dept_id) = principal.require_student()?;
        self.department_student(student_id, dept_id)?;
        let record = self
            .store()
            .academic_record(student_id)?
            .unwrap_or_else(|| AcademicRecord::freshman(student_id));

        let held = match record.last_completed() {
            Some(semester) => self
                .store()
                .awards_for_student(student_id)?
                .into_iter()
                .find(|award| award.semester == semester)
                .map(|award| award.kind()),
            None => None,
        };
        let scholarship = track(AwardKind::Scholarship, &record, held);
        let stipend = track(AwardKind::Stipend, &record, held);

        let pending_application = self
            .store()
            .applications_for_student(student_id)?
            .into_iter()
            .find(|application| application.status == ApplicationStatus::Pending);
        let gpa = record.last_semester_gpa();

        Ok(StudentEligibility {
            student_id,
            current_semester: record.current_semester(),
            last_completed_semester: record.last_completed_semester(),
            last_semester_gpa: gpa,
            cgpa: record.cgpa(),
            eligible_for_chancellor: scholarship.tier == Some(AwardTier::ChancellorScholarship),
            eligible_for_vice_chancellor: stipend.tier == Some(AwardTier::ViceChancellorStipend),
            can_apply: stipend.eligible && pending_application.is_none(),
            scholarship,
            stipend,
            pending_application,
        })
    }

    pub fn submit_stipend(
        &self,
        principal: &Principal,
        request: StipendRequest,
    ) -> Result<StipendApplication, AwardError> {
        self.applications.submit(principal, request)
    }

    pub fn approve_stipend(
        &self,
        principal: &Principal,
        application_id: ApplicationId,
    ) -> Result<GrantReceipt, AwardError> {
        self.applications.approve(principal, application_id)
    }

    pub fn reject_stipend(
        &self,
        principal: &Principal,
        application_id: ApplicationId,
    ) -> Result<StipendApplication, AwardError> {
        self.applications.reject(principal, application_id)
    }

    pub fn application(
        &self,
        principal: &Principal,
        application_id: ApplicationId,
    ) -> Result<ApplicationView, AwardError> {
        let application = self.applications.get(principal, application_id)?;
        self.application_view(application)
    }

    /// Application history, newest first, optionally narrowed to one status.
    pub fn application_history(
        &self,
        principal: &Principal,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<ApplicationView>, AwardError> {
        self.applications
            .history(principal, status)?
            .into_iter()
            .map(|application| self.application_view(application))
            .collect()
    }

    fn application_view(
        &self,
        application: StipendApplication,
    ) -> Result<ApplicationView, AwardError> {
        let student_name = self
            .store()
            .student(application.student_id)?
            .map(|student| student.name);
        let income = self.store().income_record(application.student_id)?;
        Ok(ApplicationView {
            amount: application.tier.amount(),
            student_name,
            income,
            application,
        })
    }

    /// Grant the scholarship a student earned for their last completed semester.
    pub fn approve_scholarship(
        &self,
        principal: &Principal,
        student_id: StudentId,
    ) -> Result<GrantReceipt, AwardError> {
        let dept_id = principal.require_admin()?;
        self.department_student(student_id, dept_id)?;
        let record = self
            .store()
            .academic_record(student_id)?
            .ok_or(AwardError::NoCompletedSemester)?;

        let decision = eligibility::evaluate_record(AwardKind::Scholarship, &record);
        let semester = record.last_completed().ok_or(AwardError::NoCompletedSemester)?;
        let tier = match (decision.tier, decision.reason) {
            (Some(tier), _) => tier,
            (None, Some(IneligibilityReason::FirstSemester)) => {
                return Err(AwardError::NoCompletedSemester)
            }
            (None, Some(IneligibilityReason::MissingGpa)) => {
                return Err(AwardError::NotEligible(format!("no GPA recorded for {semester}")))
            }
            (None, _) => {
                return Err(AwardError::NotEligible(format!(
                    "{semester} GPA is below the {:.2} scholarship minimum",
                    eligibility::BUP_SCHOLARSHIP_MIN_GPA
                )))
            }
        };

        Ok(self.ledger.grant(GrantRequest {
            student_id,
            dept_id,
            tier,
            amount: decision.amount,
            semester,
            application: None,
        })?)
    }

    pub fn approve_all_scholarships(
        &self,
        principal: &Principal,
    ) -> Result<BulkResult, AwardError> {
        let dept_id = principal.require_admin()?;
        self.bulk.approve_all(dept_id)
    }

    pub fn approve_selected_scholarships(
        &self,
        principal: &Principal,
        student_ids: &[StudentId],
    ) -> Result<BulkResult, AwardError> {
        let dept_id = principal.require_admin()?;
        if student_ids.is_empty() {
            return Err(AwardError::InvalidInput("no students selected".to_string()));
        }
        self.bulk.approve_selected(dept_id, student_ids)
    }

    /// Scholarship-eligible students not yet awarded, best GPA first.
    pub fn scholarship_candidates(
        &self,
        principal: &Principal,
    ) -> Result<CandidateList, AwardError> {
        let dept_id = principal.require_admin()?;
        let department = self
            .store()
            .department(dept_id)?
            .ok_or(AwardError::NotFound(Entity::Department))?;

        let mut candidates = Vec::new();
        for student in self.store().roster(dept_id)? {
            let Some(record) = self.store().academic_record(student.student_id)? else {
                continue;
            };
            let decision = eligibility::evaluate_record(AwardKind::Scholarship, &record);
            let (Some(tier), Some(semester), Some(gpa)) = (
                decision.tier,
                record.last_completed(),
                record.last_semester_gpa(),
            ) else {
                continue;
            };
            if self.ledger.holds_award(student.student_id, semester)? {
                continue;
            }
            candidates.push(ScholarshipCandidate {
                student_id: student.student_id,
                reg_no: student.reg_no,
                name: student.name,
                semester,
                last_semester_gpa: gpa,
                cgpa: record.cgpa(),
                tier,
                amount: decision.amount,
            });
        }

        candidates.sort_by(|a, b| {
            b.last_semester_gpa
                .total_cmp(&a.last_semester_gpa)
                .then(a.student_id.cmp(&b.student_id))
        });
        Ok(CandidateList {
            dept_id,
            available_budget: department.budget,
            total_amount: candidates.iter().map(|candidate| candidate.amount).sum(),
            candidates,
        })
    }

    /// Grade sheet of a student, readable by the student and by their department's admins.
    pub fn academic_record(
        &self,
        principal: &Principal,
        student_id: StudentId,
    ) -> Result<AcademicRecordView, AwardError> {
        match principal {
            Principal::Student {
                student_id: caller, ..
            } if *caller != student_id => {
                return Err(AwardError::Forbidden("record belongs to another student"))
            }
            _ => {}
        }
        self.department_student(student_id, principal.dept_id())?;
        let record = self
            .store()
            .academic_record(student_id)?
            .ok_or(AwardError::NotFound(Entity::AcademicRecord))?;
        Ok(AcademicRecordView::from(&record))
    }

    pub fn update_academic_record(
        &self,
        principal: &Principal,
        student_id: StudentId,
        update: AcademicRecordUpdate,
    ) -> Result<AcademicRecordView, AwardError> {
        let dept_id = principal.require_admin()?;
        self.department_student(student_id, dept_id)?;
        let record = self.store().commit_record_update(student_id, &update)?;

        info!(
            student = %student_id,
            current_semester = record.current_semester(),
            cgpa = record.cgpa(),
            "academic record updated"
        );
        Ok(AcademicRecordView::from(&record))
    }

    /// Awards held by the calling student, newest first.
    pub fn student_awards(&self, principal: &Principal) -> Result<Vec<AwardRecord>, AwardError> {
        let (student_id, _) = principal.require_student()?;
        let mut awards = self.store().awards_for_student(student_id)?;
        newest_first(&mut awards);
        Ok(awards)
    }

    pub fn department_awards(
        &self,
        principal: &Principal,
        kind: Option<AwardKind>,
    ) -> Result<Vec<AwardRecord>, AwardError> {
        let dept_id = principal.require_admin()?;
        let mut awards = self.store().awards_for_department(dept_id)?;
        if let Some(kind) = kind {
            awards.retain(|award| award.kind() == kind);
        }
        newest_first(&mut awards);
        Ok(awards)
    }

    pub fn department_summary(
        &self,
        principal: &Principal,
    ) -> Result<DepartmentSummary, AwardError> {
        let dept_id = principal.require_admin()?;
        let department = self
            .store()
            .department(dept_id)?
            .ok_or(AwardError::NotFound(Entity::Department))?;

        let mut scholarships = KindTotals::default();
        let mut stipends = KindTotals::default();
        for award in self.store().awards_for_department(dept_id)? {
            let totals = match award.kind() {
                AwardKind::Scholarship => &mut scholarships,
                AwardKind::Stipend => &mut stipends,
            };
            totals.count += 1;
            totals.amount += award.amount;
        }
        let pending_applications = self
            .store()
            .applications_for_department(dept_id)?
            .iter()
            .filter(|application| application.status == ApplicationStatus::Pending)
            .count();

        Ok(DepartmentSummary {
            dept_id,
            name: department.name,
            faculty: department.faculty,
            budget: department.budget,
            students: self.store().roster(dept_id)?.len(),
            scholarships,
            stipends,
            pending_applications,
        })
    }

    fn department_student(
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
}

fn track(kind: AwardKind, record: &AcademicRecord, held: Option<AwardKind>) -> TrackEligibility {
    if record.last_completed_semester() == 0 {
        return TrackEligibility::closed(EligibilityBlocker::FirstSemester);
    }
    match held {
        Some(AwardKind::Scholarship) => {
            return TrackEligibility::closed(EligibilityBlocker::HoldsScholarship)
        }
        Some(AwardKind::Stipend) => {
            return TrackEligibility::closed(EligibilityBlocker::HoldsStipend)
        }
        None => {}
    }
    match (eligibility::evaluate_record(kind, record).tier, kind) {
        (Some(tier), _) => TrackEligibility::open(tier),
        (None, AwardKind::Scholarship) => {
            TrackEligibility::closed(EligibilityBlocker::LowGpaScholarship)
        }
        (None, AwardKind::Stipend) => TrackEligibility::closed(EligibilityBlocker::LowGpa),
    }
}

fn newest_first(awards: &mut [AwardRecord]) {
    awards.sort_by(|a, b| b.awarded_at.cmp(&a.awarded_at).then(b.id.cmp(&a.id)));
}
