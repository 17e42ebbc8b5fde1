//! GPA band evaluation for scholarships and stipends.
//!
//! Everything here is pure: callers pass the last completed semester and its GPA
//! and receive the tier (if any) with its fixed amount.

use serde::{Deserialize, Serialize};

use super::domain::{AcademicRecord, AwardKind, AwardTier};

pub const CHANCELLOR_SCHOLARSHIP_MIN_GPA: f64 = 3.90;
pub const BUP_SCHOLARSHIP_MIN_GPA: f64 = 3.80;
pub const VICE_CHANCELLOR_STIPEND_MIN_GPA: f64 = 3.75;
pub const BUP_STIPEND_MIN_GPA: f64 = 3.50;

/// Why a student does not qualify for any tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IneligibilityReason {
    /// Still in semester 1, nothing has been graded.
    FirstSemester,
    /// The last completed semester has no GPA on file.
    MissingGpa,
    /// The GPA is below the lowest band of the requested track.
    BelowThreshold,
}

impl IneligibilityReason {
    pub const fn code(self) -> &'static str {
        match self {
            IneligibilityReason::FirstSemester => "first_semester",
            IneligibilityReason::MissingGpa => "missing_gpa",
            IneligibilityReason::BelowThreshold => "low_gpa",
        }
    }
}

/// Result of evaluating a GPA against the award bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AwardDecision {
    pub tier: Option<AwardTier>,
    pub amount: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<IneligibilityReason>,
}

impl AwardDecision {
    fn granted(tier: AwardTier) -> Self {
        Self {
            tier: Some(tier),
            amount: tier.amount(),
            reason: None,
        }
    }

    fn denied(reason: IneligibilityReason) -> Self {
        Self {
            tier: None,
            amount: 0,
            reason: Some(reason),
        }
    }

    pub fn is_eligible(&self) -> bool {
        self.tier.is_some()
    }
}

/// Map the last completed semester's GPA onto the combined band table.
///
/// Scholarship bands are checked first, so a student at or above 3.80 lands on a
/// scholarship tier and never on a stipend tier.
pub fn evaluate(last_semester_gpa: Option<f64>, last_completed_semester: u8) -> AwardDecision {
    let gpa = match gate(last_semester_gpa, last_completed_semester) {
        Ok(gpa) => gpa,
        Err(reason) => return AwardDecision::denied(reason),
    };

    match scholarship_tier(gpa).or_else(|| stipend_tier(gpa)) {
        Some(tier) => AwardDecision::granted(tier),
        None => AwardDecision::denied(IneligibilityReason::BelowThreshold),
    }
}

/// Evaluate a single award track (scholarship bands or stipend bands) independently.
pub fn evaluate_track(
    track: AwardKind,
    last_semester_gpa: Option<f64>,
    last_completed_semester: u8,
) -> AwardDecision {
    let gpa = match gate(last_semester_gpa, last_completed_semester) {
        Ok(gpa) => gpa,
        Err(reason) => return AwardDecision::denied(reason),
    };

    let tier = match track {
        AwardKind::Scholarship => scholarship_tier(gpa),
        AwardKind::Stipend => stipend_tier(gpa),
    };

    match tier {
        Some(tier) => AwardDecision::granted(tier),
        None => AwardDecision::denied(IneligibilityReason::BelowThreshold),
    }
}

pub fn evaluate_record(track: AwardKind, record: &AcademicRecord) -> AwardDecision {
    evaluate_track(
        track,
        record.last_semester_gpa(),
        record.last_completed_semester(),
    )
}

/// Minimum GPA a tier requires when requested explicitly.
pub const fn minimum_gpa(tier: AwardTier) -> f64 {
    match tier {
        AwardTier::BupStipend => BUP_STIPEND_MIN_GPA,
        AwardTier::ViceChancellorStipend => VICE_CHANCELLOR_STIPEND_MIN_GPA,
        AwardTier::BupScholarship => BUP_SCHOLARSHIP_MIN_GPA,
        AwardTier::ChancellorScholarship => CHANCELLOR_SCHOLARSHIP_MIN_GPA,
    }
}

pub fn meets_tier(tier: AwardTier, gpa: f64) -> bool {
    gpa >= minimum_gpa(tier)
}

fn gate(
    last_semester_gpa: Option<f64>,
    last_completed_semester: u8,
) -> Result<f64, IneligibilityReason> {
    if last_completed_semester == 0 {
        return Err(IneligibilityReason::FirstSemester);
    }
    match last_semester_gpa {
        Some(gpa) if gpa.is_finite() => Ok(gpa),
        _ => Err(IneligibilityReason::MissingGpa),
    }
}

fn scholarship_tier(gpa: f64) -> Option<AwardTier> {
    if gpa >= CHANCELLOR_SCHOLARSHIP_MIN_GPA {
        Some(AwardTier::ChancellorScholarship)
    } else if gpa >= BUP_SCHOLARSHIP_MIN_GPA {
        Some(AwardTier::BupScholarship)
    } else {
        None
    }
}

fn stipend_tier(gpa: f64) -> Option<AwardTier> {
    if gpa >= VICE_CHANCELLOR_STIPEND_MIN_GPA {
        Some(AwardTier::ViceChancellorStipend)
    } else if gpa >= BUP_STIPEND_MIN_GPA {
        Some(AwardTier::BupStipend)
    } else {
        None
    }
}
