use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use super::handlers::{
    delete_complaint, get_complaint, get_history, get_user_complaint, health, list_complaints,
    list_user_complaints, report_issue, update_status, AdminState,
};
use super::services::{AuditLogService, ComplaintService, IntakeService};
use crate::core::database::StorageTier;

/// Citizen-facing routes: intake and "my complaints"
///
/// `max_upload_size` caps the multipart body of the intake endpoint.
pub fn public_routes(
    intake_service: Arc<IntakeService>,
    complaint_service: Arc<ComplaintService>,
    max_upload_size: usize,
) -> Router {
    let intake_routes = Router::new()
        .route(
            "/api/report-issue",
            post(report_issue).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .with_state(intake_service);

    let user_routes = Router::new()
        .route("/api/user/complaints", get(list_user_complaints))
        .route("/api/user/complaints/{id}", get(get_user_complaint))
        .with_state(complaint_service);

    intake_routes.merge(user_routes)
}

/// Admin dashboard routes, nested under `/api/admin`
pub fn admin_routes(
    complaint_service: Arc<ComplaintService>,
    audit_log_service: Arc<AuditLogService>,
) -> Router {
    let state = AdminState {
        complaints: complaint_service,
        audit_log: audit_log_service,
    };

    Router::new()
        .route("/complaints", get(list_complaints))
        .route(
            "/complaints/{id}",
            get(get_complaint).delete(delete_complaint),
        )
        .route("/complaints/{id}/status", put(update_status))
        .route("/complaints/{id}/history", get(get_history))
        .with_state(state)
}

pub fn health_routes(tier: StorageTier) -> Router {
    Router::new().route("/health", get(health)).with_state(tier)
}
