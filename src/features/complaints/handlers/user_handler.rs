use std::sync::Arc;

use axum::{extract::State, Json};

use crate::core::error::Result;
use crate::core::extractor::{AppPath, SubmittingUser};
use crate::features::complaints::models::Complaint;
use crate::features::complaints::services::ComplaintService;
use crate::shared::types::ErrorResponse;

/// List the caller's own complaints, newest first
#[utoipa::path(
    get,
    path = "/api/user/complaints",
    responses(
        (status = 200, description = "Complaints submitted by the caller", body = Vec<Complaint>),
        (status = 401, description = "No submitting user on the request", body = ErrorResponse)
    ),
    security(("gateway_user" = [])),
    tag = "complaints"
)]
pub async fn list_user_complaints(
    user: SubmittingUser,
    State(service): State<Arc<ComplaintService>>,
) -> Result<Json<Vec<Complaint>>> {
    let complaints = service.list_for_user(user.user_id).await?;
    Ok(Json(complaints))
}

/// One of the caller's own complaints. Other users' complaints look missing.
#[utoipa::path(
    get,
    path = "/api/user/complaints/{id}",
    params(
        ("id" = i64, Path, description = "Complaint ID")
    ),
    responses(
        (status = 200, description = "Complaint found", body = Complaint),
        (status = 401, description = "No submitting user on the request", body = ErrorResponse),
        (status = 404, description = "Complaint not found", body = ErrorResponse)
    ),
    security(("gateway_user" = [])),
    tag = "complaints"
)]
pub async fn get_user_complaint(
    user: SubmittingUser,
    State(service): State<Arc<ComplaintService>>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<Complaint>> {
    let complaint = service.get_for_user(id, user.user_id).await?;
    Ok(Json(complaint))
}
