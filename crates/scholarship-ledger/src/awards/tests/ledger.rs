use std::sync::Arc;

use super::common::*;

use crate::awards::domain::{AwardTier, DepartmentId, Semester, StudentId};
use crate::awards::ledger::{GrantRequest, LedgerError};
use crate::awards::store::{Entity, InMemoryRecordStore, RecordStore, StoreError};
use crate::awards::AwardLedger;

fn recording_ledger() -> (
    AwardLedger<InMemoryRecordStore, RecordingNotifier>,
    Arc<InMemoryRecordStore>,
) {
    build_ledger(seeded_store(), Arc::new(RecordingNotifier::default()), true)
}

fn request(
    student_id: StudentId,
    dept_id: DepartmentId,
    tier: AwardTier,
    semester: u8,
) -> GrantRequest {
    GrantRequest {
        student_id,
        dept_id,
        tier,
        amount: tier.amount(),
        semester: Semester::new(semester).expect("valid semester"),
        application: None,
    }
}

#[test]
fn grant_writes_award_and_debits_budget() {
    let (ledger, store) = recording_ledger();

    let receipt = ledger
        .grant(request(
            CHANCELLOR_STUDENT,
            CSE,
            AwardTier::ChancellorScholarship,
            2,
        ))
        .expect("grant succeeds");

    assert_eq!(receipt.remaining_budget, 35_000);
    assert_eq!(receipt.award.amount, 15_000);
    assert_eq!(receipt.award.student_name, "Student 101");
    assert_eq!(receipt.award.semester.label(), "Semester 2");
    assert_eq!(budget(&store, CSE), 35_000);
    assert_eq!(store.awards_for_student(CHANCELLOR_STUDENT).unwrap().len(), 1);
}

#[test]
fn second_award_for_same_semester_is_refused_across_kinds() {
    let (ledger, store) = recording_ledger();
    ledger
        .grant(request(VC_STIPEND_STUDENT, CSE, AwardTier::BupStipend, 3))
        .expect("stipend granted");

    let err = ledger
        .grant(request(
            VC_STIPEND_STUDENT,
            CSE,
            AwardTier::BupScholarship,
            3,
        ))
        .expect_err("semester already awarded");

    assert_eq!(err, LedgerError::AlreadyAwarded);
    assert_eq!(budget(&store, CSE), 44_000);
    assert_eq!(store.awards_for_department(CSE).unwrap().len(), 1);
}

#[test]
fn grant_never_overdraws_the_budget() {
    let store = seeded_store();
    store.add_department(department(DepartmentId(9), 10_000)).unwrap();
    enroll(&store, StudentId(900), DepartmentId(9), 2, &[Some(3.95)]);
    let (ledger, store) = build_ledger(store, Arc::new(RecordingNotifier::default()), true);

    let err = ledger
        .grant(request(
            StudentId(900),
            DepartmentId(9),
            AwardTier::ChancellorScholarship,
            1,
        ))
        .expect_err("budget too small");

    assert_eq!(
        err,
        LedgerError::InsufficientBudget {
            required: 15_000,
            available: 10_000
        }
    );
    assert_eq!(budget(&store, DepartmentId(9)), 10_000);
    assert!(store.awards_for_department(DepartmentId(9)).unwrap().is_empty());
}

#[test]
fn unknown_department_and_foreign_student_fail() {
    let (ledger, _) = recording_ledger();

    let err = ledger
        .grant(request(BUP_SCHOLAR, DepartmentId(77), AwardTier::BupScholarship, 1))
        .expect_err("department missing");
    assert_eq!(err, LedgerError::DepartmentNotFound);

    let err = ledger
        .grant(request(EEE_SCHOLAR, CSE, AwardTier::ChancellorScholarship, 1))
        .expect_err("student belongs to EEE");
    assert_eq!(err, LedgerError::Store(StoreError::NotFound(Entity::Student)));
}

#[test]
fn notifier_receives_award_notice() {
    let notifier = Arc::new(RecordingNotifier::default());
    let (ledger, _) = build_ledger(seeded_store(), notifier.clone(), true);

    ledger
        .grant(request(BUP_SCHOLAR, CSE, AwardTier::BupScholarship, 1))
        .expect("grant succeeds");

    let notices = notifier.awards();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].email, "student102@bup.example");
    assert_eq!(notices[0].tier, AwardTier::BupScholarship);
    assert_eq!(notices[0].amount, 9_000);
}

#[test]
fn notifier_failure_does_not_undo_the_grant() {
    let (ledger, store) = build_ledger(seeded_store(), Arc::new(FailingNotifier), true);

    let receipt = ledger
        .grant(request(BUP_SCHOLAR, CSE, AwardTier::BupScholarship, 1))
        .expect("grant succeeds even though delivery fails");

    assert_eq!(receipt.remaining_budget, 41_000);
    assert_eq!(budget(&store, CSE), 41_000);
}

#[test]
fn disabled_notifications_leave_results_unchanged() {
    let notifier = Arc::new(RecordingNotifier::default());
    let (ledger, _) = build_ledger(seeded_store(), notifier.clone(), false);

    let receipt = ledger
        .grant(request(BUP_SCHOLAR, CSE, AwardTier::BupScholarship, 1))
        .expect("grant succeeds");

    assert_eq!(receipt.remaining_budget, 41_000);
    assert!(notifier.awards().is_empty());
    assert!(!ledger.notifications().is_enabled());
}

#[test]
fn holds_award_reports_existing_rows() {
    let (ledger, _) = recording_ledger();
    let semester = Semester::new(1).unwrap();
    assert!(!ledger.holds_award(BUP_SCHOLAR, semester).unwrap());
    ledger
        .grant(request(BUP_SCHOLAR, CSE, AwardTier::BupScholarship, 1))
        .unwrap();
    assert!(ledger.holds_award(BUP_SCHOLAR, semester).unwrap());
}
