//! Scholarship and stipend awards for university departments.
//!
//! Eligibility is derived from the GPA of a student's last completed semester.
//! Every grant goes through [`ledger::AwardLedger`], which keeps one award per
//! student and semester and never lets a department budget go negative.
//! [`service::AwardDesk`] is the role-checked entry point used by the HTTP router.

pub mod applications;
pub mod bulk;
pub mod domain;
pub mod eligibility;
pub mod error;
pub mod ledger;
pub mod notify;
pub mod principal;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use applications::{StipendApplications, StipendRequest};
pub use bulk::{BulkApprovalCoordinator, BulkFailure, BulkFailureReason, BulkResult};
pub use domain::{
    AcademicRecord, AcademicRecordUpdate, AdminId, ApplicationId, ApplicationStatus, AwardId,
    AwardKind, AwardRecord, AwardTier, Department, DepartmentId, DomainError, IncomeDisclosure,
    IncomeRecord, Semester, StipendApplication, Student, StudentId,
};
pub use eligibility::{AwardDecision, IneligibilityReason};
pub use error::AwardError;
pub use ledger::{AwardLedger, GrantRequest, LedgerError};
pub use notify::{
    AwardNotice, AwardNotifier, NotificationGate, NotifyError, RejectionNotice, TracingNotifier,
};
pub use principal::Principal;
pub use router::award_router;
pub use service::{
    AcademicRecordView, ApplicationView, AwardDesk, CandidateList, DepartmentSummary,
    EligibilityBlocker, KindTotals, ScholarshipCandidate, StudentEligibility, TrackEligibility,
};
pub use store::{
    Entity, GrantReceipt, InMemoryRecordStore, RecordStore, SeedData, SeedError, StoreError,
};
