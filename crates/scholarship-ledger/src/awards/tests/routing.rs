use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;

use crate::awards::principal::Principal;
use crate::awards::router::{
    approve_all_handler, award_router, DEPARTMENT_HEADER, PRINCIPAL_ID_HEADER, ROLE_HEADER,
};
use crate::awards::AwardDesk;
use crate::config::NotificationConfig;

fn router() -> Router {
    let (desk, _, _) = build_desk(seeded_store());
    award_router(Arc::new(desk))
}

fn request(
    method: Method,
    uri: &str,
    principal: Option<Principal>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(principal) = principal {
        let id = match principal {
            Principal::Student { student_id, .. } => student_id.0,
            Principal::Admin { admin_id, .. } => u64::from(admin_id.0),
        };
        builder = builder
            .header(ROLE_HEADER, principal.role())
            .header(PRINCIPAL_ID_HEADER, id.to_string())
            .header(DEPARTMENT_HEADER, principal.dept_id().0.to_string());
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn stipend_body(tier: &str) -> Value {
    json!({
        "type": tier,
        "income": { "amount": 18000.0, "source": "Small business", "family_members": 5 }
    })
}

#[tokio::test]
async fn requests_without_principal_are_unauthenticated() {
    let response = router()
        .oneshot(request(Method::GET, "/api/v1/me/eligibility", None, None))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "unauthenticated");

    let response = router()
        .oneshot(
            Request::get("/api/v1/me/eligibility")
                .header(ROLE_HEADER, "registrar")
                .header(PRINCIPAL_ID_HEADER, "1")
                .header(DEPARTMENT_HEADER, "1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn eligibility_route_returns_student_view() {
    let response = router()
        .oneshot(request(
            Method::GET,
            "/api/v1/me/eligibility",
            Some(as_student(CHANCELLOR_STUDENT)),
            None,
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["scholarship"]["tier"], "Chancellor Scholarship");
    assert_eq!(payload["scholarship"]["amount"], 15_000);
    assert_eq!(payload["can_apply"], true);
}

#[tokio::test]
async fn submitted_application_can_be_approved_over_http() {
    let router = router();

    let response = router
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/v1/applications",
            Some(as_student(BUP_STIPEND_STUDENT)),
            Some(stipend_body("BUP Stipend")),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let application = read_json_body(response).await;
    assert_eq!(application["status"], "Pending");
    assert_eq!(application["semester"], "Semester 1");
    let id = application["id"].as_u64().expect("numeric id");

    let response = router
        .oneshot(request(
            Method::POST,
            &format!("/api/v1/applications/{id}/approve"),
            Some(admin(CSE)),
            None,
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let receipt = read_json_body(response).await;
    assert_eq!(receipt["remaining_budget"], 44_000);
    assert_eq!(receipt["award"]["type"], "BUP Stipend");
}

#[tokio::test]
async fn business_rule_failures_map_to_conflict() {
    let response = router()
        .oneshot(request(
            Method::POST,
            "/api/v1/applications",
            Some(as_student(BUP_STIPEND_STUDENT)),
            Some(stipend_body("Vice Chancellor Stipend")),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "tier_not_eligible");
}

#[tokio::test]
async fn admin_routes_reject_students() {
    let response = router()
        .oneshot(request(
            Method::POST,
            "/api/v1/scholarships/approve-all",
            Some(as_student(BUP_SCHOLAR)),
            None,
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(read_json_body(response).await["error"], "forbidden");
}

#[tokio::test]
async fn approve_selected_reports_failures_per_student() {
    let response = router()
        .oneshot(request(
            Method::POST,
            "/api/v1/scholarships/approve-selected",
            Some(admin(CSE)),
            Some(json!({ "student_ids": [102, 999] })),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["approved_count"], 1);
    assert_eq!(payload["remaining_budget"], 41_000);
    assert_eq!(payload["failures"][0]["student_id"], 999);
    assert_eq!(payload["failures"][0]["reason"], "student_not_found");
}

#[tokio::test]
async fn scholarship_route_creates_award() {
    let response = router()
        .oneshot(request(
            Method::POST,
            "/api/v1/scholarships/students/101/approve",
            Some(admin(CSE)),
            None,
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["remaining_budget"], 35_000);
    assert_eq!(payload["award"]["semester"], "Semester 2");
}

#[tokio::test]
async fn malformed_filters_are_unprocessable() {
    let response = router()
        .oneshot(request(
            Method::GET,
            "/api/v1/applications?status=archived",
            Some(admin(CSE)),
            None,
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(read_json_body(response).await["error"], "invalid_input");

    let response = router()
        .oneshot(request(
            Method::GET,
            "/api/v1/awards?kind=grant",
            Some(admin(CSE)),
            None,
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unknown_application_is_not_found() {
    let response = router()
        .oneshot(request(
            Method::GET,
            "/api/v1/applications/404",
            Some(admin(CSE)),
            None,
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json_body(response).await["error"], "not_found");
}

#[tokio::test]
async fn invalid_record_update_is_unprocessable() {
    let response = router()
        .oneshot(request(
            Method::PUT,
            "/api/v1/students/107/record",
            Some(admin(CSE)),
            Some(json!({ "current_semester": 3, "semester_gpas": [[2, 4.5]] })),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn store_outage_is_an_internal_error() {
    let desk = Arc::new(AwardDesk::new(
        Arc::new(UnavailableStore),
        Arc::new(RecordingNotifier::default()),
        &NotificationConfig::default(),
    ));

    let response =
        approve_all_handler::<UnavailableStore, RecordingNotifier>(State(desk), admin(CSE)).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "internal");
    assert_eq!(payload["message"], "internal error");
}
