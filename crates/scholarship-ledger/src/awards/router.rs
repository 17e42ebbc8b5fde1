use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::applications::StipendRequest;
use super::domain::{
    AcademicRecordUpdate, AdminId, ApplicationId, ApplicationStatus, AwardKind, DepartmentId,
    StudentId,
};
use super::error::AwardError;
use super::notify::AwardNotifier;
use super::principal::Principal;
use super::service::AwardDesk;
use super::store::RecordStore;

pub const ROLE_HEADER: &str = "x-principal-role";
pub const PRINCIPAL_ID_HEADER: &str = "x-principal-id";
pub const DEPARTMENT_HEADER: &str = "x-department-id";

/// Router builder exposing the award endpoints.
pub fn award_router<S, N>(desk: Arc<AwardDesk<S, N>>) -> Router
where
    S: RecordStore + 'static,
    N: AwardNotifier + 'static,
{
    Router::new()
        .route("/api/v1/me/eligibility", get(eligibility_handler::<S, N>))
        .route("/api/v1/me/awards", get(my_awards_handler::<S, N>))
        .route(
            "/api/v1/applications",
            post(submit_handler::<S, N>).get(history_handler::<S, N>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(application_handler::<S, N>),
        )
        .route(
            "/api/v1/applications/:application_id/approve",
            post(approve_stipend_handler::<S, N>),
        )
        .route(
            "/api/v1/applications/:application_id/reject",
            post(reject_stipend_handler::<S, N>),
        )
        .route(
            "/api/v1/scholarships/candidates",
            get(candidates_handler::<S, N>),
        )
        .route(
            "/api/v1/scholarships/approve-all",
            post(approve_all_handler::<S, N>),
        )
        .route(
            "/api/v1/scholarships/approve-selected",
            post(approve_selected_handler::<S, N>),
        )
        .route(
            "/api/v1/scholarships/students/:student_id/approve",
            post(approve_scholarship_handler::<S, N>),
        )
        .route(
            "/api/v1/students/:student_id/record",
            get(record_handler::<S, N>).put(update_record_handler::<S, N>),
        )
        .route("/api/v1/awards", get(department_awards_handler::<S, N>))
        .route("/api/v1/department/summary", get(summary_handler::<S, N>))
        .with_state(desk)
}

/// Rejection for requests without a usable principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalRejection(String);

impl IntoResponse for PrincipalRejection {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": "unauthenticated", "message": self.0 }));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

#[async_trait]
impl<St> FromRequestParts<St> for Principal
where
    St: Send + Sync,
{
    type Rejection = PrincipalRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        principal_from_headers(&parts.headers)
    }
}

fn principal_from_headers(headers: &HeaderMap) -> Result<Principal, PrincipalRejection> {
    let role = header(headers, ROLE_HEADER)?;
    let dept_id = header(headers, DEPARTMENT_HEADER)?
        .parse::<u32>()
        .map(DepartmentId)
        .map_err(|_| PrincipalRejection(format!("{DEPARTMENT_HEADER} must be a number")))?;
    let id = header(headers, PRINCIPAL_ID_HEADER)?;
    let bad_id = || PrincipalRejection(format!("{PRINCIPAL_ID_HEADER} must be a number"));

    match role.to_ascii_lowercase().as_str() {
        "student" => Ok(Principal::Student {
            student_id: StudentId(id.parse().map_err(|_| bad_id())?),
            dept_id,
        }),
        "admin" => Ok(Principal::Admin {
            admin_id: AdminId(id.parse().map_err(|_| bad_id())?),
            dept_id,
        }),
        other => Err(PrincipalRejection(format!("unknown role '{other}'"))),
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, PrincipalRejection> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| PrincipalRejection(format!("missing {name} header")))
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, AwardError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error.into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AwardsQuery {
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectionRequest {
    pub student_ids: Vec<StudentId>,
}

fn parse_status(raw: Option<&str>) -> Result<Option<ApplicationStatus>, AwardError> {
    raw.map(|value| {
        ApplicationStatus::parse(value)
            .ok_or_else(|| AwardError::InvalidInput(format!("unknown status '{value}'")))
    })
    .transpose()
}

fn parse_kind(raw: Option<&str>) -> Result<Option<AwardKind>, AwardError> {
    raw.map(|value| match value.trim().to_ascii_lowercase().as_str() {
        "scholarship" => Ok(AwardKind::Scholarship),
        "stipend" => Ok(AwardKind::Stipend),
        _ => Err(AwardError::InvalidInput(format!("unknown award kind '{value}'"))),
    })
    .transpose()
}

pub(crate) async fn eligibility_handler<S, N>(
    State(desk): State<Arc<AwardDesk<S, N>>>,
    principal: Principal,
) -> Response
where
    S: RecordStore + 'static,
    N: AwardNotifier + 'static,
{
    respond(StatusCode::OK, desk.student_eligibility(&principal))
}

pub(crate) async fn my_awards_handler<S, N>(
    State(desk): State<Arc<AwardDesk<S, N>>>,
    principal: Principal,
) -> Response
where
    S: RecordStore + 'static,
    N: AwardNotifier + 'static,
{
    respond(StatusCode::OK, desk.student_awards(&principal))
}

pub(crate) async fn submit_handler<S, N>(
    State(desk): State<Arc<AwardDesk<S, N>>>,
    principal: Principal,
    Json(request): Json<StipendRequest>,
) -> Response
where
    S: RecordStore + 'static,
    N: AwardNotifier + 'static,
{
    respond(StatusCode::CREATED, desk.submit_stipend(&principal, request))
}

pub(crate) async fn history_handler<S, N>(
    State(desk): State<Arc<AwardDesk<S, N>>>,
    principal: Principal,
    Query(query): Query<HistoryQuery>,
) -> Response
where
    S: RecordStore + 'static,
    N: AwardNotifier + 'static,
{
    let result = parse_status(query.status.as_deref())
        .and_then(|status| desk.application_history(&principal, status));
    respond(StatusCode::OK, result)
}

pub(crate) async fn application_handler<S, N>(
    State(desk): State<Arc<AwardDesk<S, N>>>,
    principal: Principal,
    Path(application_id): Path<u64>,
) -> Response
where
    S: RecordStore + 'static,
    N: AwardNotifier + 'static,
{
    respond(
        StatusCode::OK,
        desk.application(&principal, ApplicationId(application_id)),
    )
}

pub(crate) async fn approve_stipend_handler<S, N>(
    State(desk): State<Arc<AwardDesk<S, N>>>,
    principal: Principal,
    Path(application_id): Path<u64>,
) -> Response
where
    S: RecordStore + 'static,
    N: AwardNotifier + 'static,
{
    respond(
        StatusCode::OK,
        desk.approve_stipend(&principal, ApplicationId(application_id)),
    )
}

pub(crate) async fn reject_stipend_handler<S, N>(
    State(desk): State<Arc<AwardDesk<S, N>>>,
    principal: Principal,
    Path(application_id): Path<u64>,
) -> Response
where
    S: RecordStore + 'static,
    N: AwardNotifier + 'static,
{
    respond(
        StatusCode::OK,
        desk.reject_stipend(&principal, ApplicationId(application_id)),
    )
}

pub(crate) async fn candidates_handler<S, N>(
    State(desk): State<Arc<AwardDesk<S, N>>>,
    principal: Principal,
) -> Response
where
    S: RecordStore + 'static,
    N: AwardNotifier + 'static,
{
    respond(StatusCode::OK, desk.scholarship_candidates(&principal))
}

pub(crate) async fn approve_all_handler<S, N>(
    State(desk): State<Arc<AwardDesk<S, N>>>,
    principal: Principal,
) -> Response
where
    S: RecordStore + 'static,
    N: AwardNotifier + 'static,
{
    respond(StatusCode::OK, desk.approve_all_scholarships(&principal))
}

pub(crate) async fn approve_selected_handler<S, N>(
    State(desk): State<Arc<AwardDesk<S, N>>>,
    principal: Principal,
    Json(selection): Json<SelectionRequest>,
) -> Response
where
    S: RecordStore + 'static,
    N: AwardNotifier + 'static,
{
    respond(
        StatusCode::OK,
        desk.approve_selected_scholarships(&principal, &selection.student_ids),
    )
}

pub(crate) async fn approve_scholarship_handler<S, N>(
    State(desk): State<Arc<AwardDesk<S, N>>>,
    principal: Principal,
    Path(student_id): Path<u64>,
) -> Response
where
    S: RecordStore + 'static,
    N: AwardNotifier + 'static,
{
    respond(
        StatusCode::CREATED,
        desk.approve_scholarship(&principal, StudentId(student_id)),
    )
}

pub(crate) async fn record_handler<S, N>(
    State(desk): State<Arc<AwardDesk<S, N>>>,
    principal: Principal,
    Path(student_id): Path<u64>,
) -> Response
where
    S: RecordStore + 'static,
    N: AwardNotifier + 'static,
{
    respond(
        StatusCode::OK,
        desk.academic_record(&principal, StudentId(student_id)),
    )
}

pub(crate) async fn update_record_handler<S, N>(
    State(desk): State<Arc<AwardDesk<S, N>>>,
    principal: Principal,
    Path(student_id): Path<u64>,
    Json(update): Json<AcademicRecordUpdate>,
) -> Response
where
    S: RecordStore + 'static,
    N: AwardNotifier + 'static,
{
    respond(
        StatusCode::OK,
        desk.update_academic_record(&principal, StudentId(student_id), update),
    )
}

pub(crate) async fn department_awards_handler<S, N>(
    State(desk): State<Arc<AwardDesk<S, N>>>,
    principal: Principal,
    Query(query): Query<AwardsQuery>,
) -> Response
where
    S: RecordStore + 'static,
    N: AwardNotifier + 'static,
{
    let result = parse_kind(query.kind.as_deref())
        .and_then(|kind| desk.department_awards(&principal, kind));
    respond(StatusCode::OK, result)
}

pub(crate) async fn summary_handler<S, N>(
    State(desk): State<Arc<AwardDesk<S, N>>>,
    principal: Principal,
) -> Response
where
    S: RecordStore + 'static,
    N: AwardNotifier + 'static,
{
    respond(StatusCode::OK, desk.department_summary(&principal))
}
