use crate::infra::load_store;
use clap::Args;
use scholarship_ledger::awards::domain::validate_gpa;
use scholarship_ledger::awards::eligibility::{evaluate, evaluate_track};
use scholarship_ledger::awards::{
    AdminId, AwardDecision, AwardDesk, AwardError, AwardKind, AwardTier, BulkResult, DepartmentId,
    DepartmentSummary, IncomeDisclosure, Principal, RecordStore, StipendRequest, TracingNotifier,
};
use scholarship_ledger::config::NotificationConfig;
use scholarship_ledger::error::AppError;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Seed file to load instead of the bundled sample faculty.
    #[arg(long)]
    pub(crate) seed: Option<PathBuf>,
    /// Department to administer during the demo.
    #[arg(long, default_value_t = 1)]
    pub(crate) dept: u32,
    /// Skip the stipend application walkthrough.
    #[arg(long)]
    pub(crate) skip_stipend: bool,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            seed: None,
            dept: 1,
            skip_stipend: false,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct EligibilityArgs {
    /// GPA of the last completed semester (0.00-4.00)
    #[arg(long)]
    pub(crate) gpa: f64,
    /// Number of the last completed semester; 0 while still in semester 1
    #[arg(long, default_value_t = 1)]
    pub(crate) completed_semester: u8,
    /// Print the decisions as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

/// Combined decision plus the stipend track on its own.
#[derive(Debug, serde::Serialize)]
pub(crate) struct EligibilityReport {
    pub(crate) gpa: f64,
    pub(crate) completed_semester: u8,
    pub(crate) award: AwardDecision,
    pub(crate) stipend: AwardDecision,
}

pub(crate) fn eligibility_report(args: &EligibilityArgs) -> Result<EligibilityReport, AppError> {
    let gpa = validate_gpa(args.completed_semester, args.gpa).map_err(AwardError::from)?;
    Ok(EligibilityReport {
        gpa,
        completed_semester: args.completed_semester,
        award: evaluate(Some(gpa), args.completed_semester),
        stipend: evaluate_track(AwardKind::Stipend, Some(gpa), args.completed_semester),
    })
}

pub(crate) fn run_eligibility(args: EligibilityArgs) -> Result<(), AppError> {
    let report = eligibility_report(&args)?;
    if args.json {
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
        println!("{rendered}");
        return Ok(());
    }

    println!(
        "GPA {:.2} for semester {}",
        report.gpa, report.completed_semester
    );
    println!("- award: {}", describe(&report.award));
    println!("- stipend track: {}", describe(&report.stipend));
    Ok(())
}

fn describe(decision: &AwardDecision) -> String {
    match (decision.tier, decision.reason) {
        (Some(tier), _) => format!("{tier} ({})", decision.amount),
        (None, Some(reason)) => format!("not eligible ({})", reason.code()),
        (None, None) => "not eligible".to_string(),
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        seed,
        dept,
        skip_stipend,
    } = args;

    let store = Arc::new(load_store(seed.as_deref())?);
    let config = NotificationConfig::default();
    let desk = AwardDesk::new(
        Arc::clone(&store),
        Arc::new(TracingNotifier::new(config.sender.clone())),
        &config,
    );
    let admin = Principal::Admin {
        admin_id: AdminId(1),
        dept_id: DepartmentId(dept),
    };

    println!("Scholarship ledger demo");
    render_summary(&desk.department_summary(&admin)?);

    let candidates = desk.scholarship_candidates(&admin)?;
    println!(
        "\nScholarship candidates ({} total, budget {})",
        candidates.total_amount, candidates.available_budget
    );
    for candidate in &candidates.candidates {
        println!(
            "  - {} ({}): {} GPA {:.2} -> {} {}",
            candidate.name,
            candidate.reg_no,
            candidate.semester,
            candidate.last_semester_gpa,
            candidate.tier,
            candidate.amount
        );
    }

    if !skip_stipend {
        run_stipend_walkthrough(&desk, store.as_ref(), admin)?;
    }

    let bulk = desk.approve_all_scholarships(&admin)?;
    render_bulk(&bulk);

    render_summary(&desk.department_summary(&admin)?);
    Ok(())
}

/// Submit and approve a stipend for the first roster student who qualifies.
fn run_stipend_walkthrough<S>(
    desk: &AwardDesk<S, TracingNotifier>,
    store: &S,
    admin: Principal,
) -> Result<(), AppError>
where
    S: RecordStore + 'static,
{
    let dept_id = admin.dept_id();
    for student in store.roster(dept_id).map_err(AwardError::from)? {
        let principal = Principal::Student {
            student_id: student.student_id,
            dept_id,
        };
        let eligibility = desk.student_eligibility(&principal)?;
        if !eligibility.can_apply || eligibility.scholarship.eligible {
            continue;
        }
        let Some(tier) = eligibility.stipend.tier else {
            continue;
        };

        let application = desk.submit_stipend(&principal, demo_request(tier))?;
        println!(
            "\n{} applied for the {} ({})",
            student.name, application.tier, application.semester
        );
        let receipt = desk.approve_stipend(&admin, application.id)?;
        println!(
            "- approved {} | remaining budget {}",
            receipt.award.amount, receipt.remaining_budget
        );
        return Ok(());
    }
    println!("\nNo student in the department qualifies for a stipend application.");
    Ok(())
}

fn demo_request(tier: AwardTier) -> StipendRequest {
    StipendRequest {
        tier,
        income: IncomeDisclosure {
            amount: 22_000.0,
            source: "Family business".to_string(),
            family_members: 5,
        },
    }
}

fn render_summary(summary: &DepartmentSummary) {
    println!(
        "\n{} ({}) | budget {}",
        summary.name, summary.faculty, summary.budget
    );
    println!(
        "- {} students | {} scholarships ({}) | {} stipends ({}) | {} pending applications",
        summary.students,
        summary.scholarships.count,
        summary.scholarships.amount,
        summary.stipends.count,
        summary.stipends.amount,
        summary.pending_applications
    );
}

fn render_bulk(result: &BulkResult) {
    println!("\nBulk approval: {}", result.summary());
    for award in &result.awards {
        println!(
            "  + {} {} {}",
            award.student_name, award.tier, award.amount
        );
    }
    for failure in &result.failures {
        println!("  - student {}: {}", failure.student_id, failure.reason);
    }
    println!(
        "- granted {} | remaining budget {}",
        result.total_amount, result.remaining_budget
    );
}
