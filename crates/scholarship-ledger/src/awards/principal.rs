use serde::{Deserialize, Serialize};

use super::domain::{AdminId, DepartmentId, StudentId};
use super::error::AwardError;

/// Caller identity resolved upstream (login/session handling lives outside this crate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Principal {
    Student {
        student_id: StudentId,
        dept_id: DepartmentId,
    },
    Admin {
        admin_id: AdminId,
        dept_id: DepartmentId,
    },
}

impl Principal {
    pub const fn dept_id(&self) -> DepartmentId {
        match self {
            Principal::Student { dept_id, .. } | Principal::Admin { dept_id, .. } => *dept_id,
        }
    }

    pub const fn role(&self) -> &'static str {
        match self {
            Principal::Student { .. } => "student",
            Principal::Admin { .. } => "admin",
        }
    }

    /// Department administered by the caller, or `Forbidden` for students.
    pub fn require_admin(&self) -> Result<DepartmentId, AwardError> {
        match self {
            Principal::Admin { dept_id, .. } => Ok(*dept_id),
            Principal::Student { .. } => Err(AwardError::Forbidden("admin role required")),
        }
    }

    pub fn require_student(&self) -> Result<(StudentId, DepartmentId), AwardError> {
        match self {
            Principal::Student {
                student_id,
                dept_id,
            } => Ok((*student_id, *dept_id)),
            Principal::Admin { .. } => Err(AwardError::Forbidden("student role required")),
        }
    }
}
