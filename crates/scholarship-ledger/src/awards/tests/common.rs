use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::awards::domain::{
    AcademicRecord, AcademicRecordUpdate, AdminId, ApplicationId, AwardRecord, AwardTier,
    Department, DepartmentId, IncomeDisclosure, IncomeRecord, StipendApplication, Student,
    StudentId, SEMESTER_COUNT,
};
use crate::awards::notify::{
    AwardNotice, AwardNotifier, NotificationGate, NotifyError, RejectionNotice,
};
use crate::awards::store::{
    GrantCommit, GrantReceipt, InMemoryRecordStore, NewApplication, RecordStore, StoreError,
};
use crate::awards::{AwardDesk, AwardLedger, Principal, StipendRequest};
use crate::config::NotificationConfig;

pub(super) const CSE: DepartmentId = DepartmentId(1);
pub(super) const EEE: DepartmentId = DepartmentId(2);

pub(super) const CHANCELLOR_STUDENT: StudentId = StudentId(101);
pub(super) const BUP_SCHOLAR: StudentId = StudentId(102);
pub(super) const VC_STIPEND_STUDENT: StudentId = StudentId(103);
pub(super) const BUP_STIPEND_STUDENT: StudentId = StudentId(104);
pub(super) const FRESHMAN: StudentId = StudentId(105);
pub(super) const UNGRADED: StudentId = StudentId(106);
pub(super) const LOW_GPA: StudentId = StudentId(107);
pub(super) const EEE_SCHOLAR: StudentId = StudentId(201);

pub(super) fn department(id: DepartmentId, budget: u64) -> Department {
    Department {
        id,
        name: format!("Department {}", id.0),
        faculty: "Science & Technology".to_string(),
        budget,
    }
}

pub(super) fn student(id: StudentId, dept_id: DepartmentId) -> Student {
    Student {
        student_id: id,
        reg_no: 2_000 + id.0,
        dept_id,
        name: format!("Student {}", id.0),
        session: "2022-23".to_string(),
        email: format!("student{}@bup.example", id.0),
    }
}

/// Grade sheet with `gpas` filling semesters 1.. and `current` in progress.
pub(super) fn record(id: StudentId, current: u8, gpas: &[Option<f64>]) -> AcademicRecord {
    let mut sheet = [None; SEMESTER_COUNT];
    sheet[..gpas.len()].copy_from_slice(gpas);
    AcademicRecord::new(id, current, sheet).expect("valid grade sheet")
}

pub(super) fn enroll(
    store: &InMemoryRecordStore,
    id: StudentId,
    dept_id: DepartmentId,
    current: u8,
    gpas: &[Option<f64>],
) {
    store
        .add_student(student(id, dept_id), Some(record(id, current, gpas)))
        .expect("student enrolled");
}

/// CSE (budget 50,000) with one student per eligibility band, plus EEE (30,000).
pub(super) fn seeded_store() -> InMemoryRecordStore {
    let store = InMemoryRecordStore::new();
    store.add_department(department(CSE, 50_000)).expect("cse");
    store.add_department(department(EEE, 30_000)).expect("eee");

    enroll(&store, CHANCELLOR_STUDENT, CSE, 3, &[Some(3.70), Some(3.95)]);
    enroll(&store, BUP_SCHOLAR, CSE, 2, &[Some(3.85)]);
    enroll(
        &store,
        VC_STIPEND_STUDENT,
        CSE,
        4,
        &[Some(3.60), Some(3.70), Some(3.78)],
    );
    enroll(&store, BUP_STIPEND_STUDENT, CSE, 2, &[Some(3.55)]);
    enroll(&store, FRESHMAN, CSE, 1, &[]);
    enroll(&store, UNGRADED, CSE, 3, &[Some(3.95), None]);
    enroll(&store, LOW_GPA, CSE, 2, &[Some(3.20)]);
    enroll(&store, EEE_SCHOLAR, EEE, 2, &[Some(3.92)]);
    store
}

pub(super) fn admin(dept_id: DepartmentId) -> Principal {
    Principal::Admin {
        admin_id: AdminId(dept_id.0 * 10),
        dept_id,
    }
}

pub(super) fn as_student(student_id: StudentId) -> Principal {
    let dept_id = if student_id == EEE_SCHOLAR { EEE } else { CSE };
    Principal::Student {
        student_id,
        dept_id,
    }
}

pub(super) fn income() -> IncomeDisclosure {
    IncomeDisclosure {
        amount: 18_000.0,
        source: "Small business".to_string(),
        family_members: 5,
    }
}

pub(super) fn stipend_request(tier: AwardTier) -> StipendRequest {
    StipendRequest {
        tier,
        income: income(),
    }
}

pub(super) type TestDesk = AwardDesk<InMemoryRecordStore, RecordingNotifier>;

pub(super) fn build_desk(
    store: InMemoryRecordStore,
) -> (TestDesk, Arc<InMemoryRecordStore>, Arc<RecordingNotifier>) {
    build_desk_with(store, &NotificationConfig::default())
}

pub(super) fn build_desk_with(
    store: InMemoryRecordStore,
    notifications: &NotificationConfig,
) -> (TestDesk, Arc<InMemoryRecordStore>, Arc<RecordingNotifier>) {
    let store = Arc::new(store);
    let notifier = Arc::new(RecordingNotifier::default());
    let desk = AwardDesk::new(store.clone(), notifier.clone(), notifications);
    (desk, store, notifier)
}

pub(super) fn build_ledger<N: AwardNotifier + 'static>(
    store: InMemoryRecordStore,
    notifier: Arc<N>,
    enabled: bool,
) -> (AwardLedger<InMemoryRecordStore, N>, Arc<InMemoryRecordStore>) {
    let store = Arc::new(store);
    let gate = NotificationGate::new(notifier, enabled);
    (AwardLedger::new(store.clone(), gate), store)
}

pub(super) fn budget(store: &InMemoryRecordStore, dept_id: DepartmentId) -> u64 {
    store
        .department(dept_id)
        .expect("store readable")
        .expect("department exists")
        .budget
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    awards: Mutex<Vec<AwardNotice>>,
    rejections: Mutex<Vec<RejectionNotice>>,
}

impl RecordingNotifier {
    pub(super) fn awards(&self) -> Vec<AwardNotice> {
        self.awards.lock().expect("notifier mutex poisoned").clone()
    }

    pub(super) fn rejections(&self) -> Vec<RejectionNotice> {
        self.rejections
            .lock()
            .expect("notifier mutex poisoned")
            .clone()
    }
}

impl AwardNotifier for RecordingNotifier {
    fn notify_award_approved(&self, notice: &AwardNotice) -> Result<(), NotifyError> {
        self.awards
            .lock()
            .expect("notifier mutex poisoned")
            .push(notice.clone());
        Ok(())
    }

    fn notify_application_rejected(&self, notice: &RejectionNotice) -> Result<(), NotifyError> {
        self.rejections
            .lock()
            .expect("notifier mutex poisoned")
            .push(notice.clone());
        Ok(())
    }
}

pub(super) struct FailingNotifier;

impl AwardNotifier for FailingNotifier {
    fn notify_award_approved(&self, _notice: &AwardNotice) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp relay refused connection".to_string()))
    }

    fn notify_application_rejected(&self, _notice: &RejectionNotice) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp relay refused connection".to_string()))
    }
}

/// Store whose backend is down for every call.
pub(super) struct UnavailableStore;

fn offline<T>() -> Result<T, StoreError> {
    Err(StoreError::Unavailable("database offline".to_string()))
}

impl RecordStore for UnavailableStore {
    fn department(&self, _id: DepartmentId) -> Result<Option<Department>, StoreError> {
        offline()
    }

    fn student(&self, _id: StudentId) -> Result<Option<Student>, StoreError> {
        offline()
    }

    fn roster(&self, _dept_id: DepartmentId) -> Result<Vec<Student>, StoreError> {
        offline()
    }

    fn academic_record(&self, _id: StudentId) -> Result<Option<AcademicRecord>, StoreError> {
        offline()
    }

    fn commit_record_update(
        &self,
        _id: StudentId,
        _update: &AcademicRecordUpdate,
    ) -> Result<AcademicRecord, StoreError> {
        offline()
    }

    fn awards_for_student(&self, _id: StudentId) -> Result<Vec<AwardRecord>, StoreError> {
        offline()
    }

    fn awards_for_department(
        &self,
        _dept_id: DepartmentId,
    ) -> Result<Vec<AwardRecord>, StoreError> {
        offline()
    }

    fn application(&self, _id: ApplicationId) -> Result<Option<StipendApplication>, StoreError> {
        offline()
    }

    fn applications_for_student(
        &self,
        _id: StudentId,
    ) -> Result<Vec<StipendApplication>, StoreError> {
        offline()
    }

    fn applications_for_department(
        &self,
        _dept_id: DepartmentId,
    ) -> Result<Vec<StipendApplication>, StoreError> {
        offline()
    }

    fn income_record(&self, _id: StudentId) -> Result<Option<IncomeRecord>, StoreError> {
        offline()
    }

    fn commit_grant(&self, _grant: GrantCommit) -> Result<GrantReceipt, StoreError> {
        offline()
    }

    fn commit_submission(
        &self,
        _income: IncomeRecord,
        _application: NewApplication,
    ) -> Result<StipendApplication, StoreError> {
        offline()
    }

    fn commit_rejection(
        &self,
        _id: ApplicationId,
        _at: DateTime<Utc>,
    ) -> Result<StipendApplication, StoreError> {
        offline()
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
