use std::sync::Arc;

use axum::{
    extract::State,
    Json,
};
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, AppPath};
use crate::features::complaints::dtos::UpdateStatusDto;
use crate::features::complaints::models::{Complaint, ComplaintStatus, StatusHistoryEntry};
use crate::features::complaints::services::{AuditLogService, ComplaintService};
use crate::shared::constants::DEFAULT_CHANGED_BY;
use crate::shared::types::{ErrorResponse, StatusResponse};

/// State for admin handlers
#[derive(Clone)]
pub struct AdminState {
    pub complaints: Arc<ComplaintService>,
    pub audit_log: Arc<AuditLogService>,
}

/// List all complaints, newest first
#[utoipa::path(
    get,
    path = "/api/admin/complaints",
    responses(
        (status = 200, description = "All complaints", body = Vec<Complaint>),
    ),
    tag = "admin"
)]
pub async fn list_complaints(State(state): State<AdminState>) -> Result<Json<Vec<Complaint>>> {
    let complaints = state.complaints.list_all().await?;
    Ok(Json(complaints))
}

/// Get complaint by ID
#[utoipa::path(
    get,
    path = "/api/admin/complaints/{id}",
    params(
        ("id" = i64, Path, description = "Complaint ID")
    ),
    responses(
        (status = 200, description = "Complaint found", body = Complaint),
        (status = 400, description = "Malformed complaint ID", body = ErrorResponse),
        (status = 404, description = "Complaint not found", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn get_complaint(
    State(state): State<AdminState>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<Complaint>> {
    let complaint = state.complaints.get(id).await?;
    Ok(Json(complaint))
}

/// Status history of a complaint, oldest first. Kept after deletion.
#[utoipa::path(
    get,
    path = "/api/admin/complaints/{id}/history",
    params(
        ("id" = i64, Path, description = "Complaint ID")
    ),
    responses(
        (status = 200, description = "Audit trail", body = Vec<StatusHistoryEntry>),
    ),
    tag = "admin"
)]
pub async fn get_history(
    State(state): State<AdminState>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<Vec<StatusHistoryEntry>>> {
    let history = state.audit_log.history_for(id).await?;
    Ok(Json(history))
}

/// Change the status of a complaint
#[utoipa::path(
    put,
    path = "/api/admin/complaints/{id}/status",
    params(
        ("id" = i64, Path, description = "Complaint ID")
    ),
    request_body = UpdateStatusDto,
    responses(
        (status = 200, description = "Status updated", body = StatusResponse),
        (status = 400, description = "Unknown status or validation error", body = ErrorResponse),
        (status = 400, description = "Malformed complaint ID", body = ErrorResponse),
        (status = 404, description = "Complaint not found", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn update_status(
    State(state): State<AdminState>,
    AppPath(id): AppPath<i64>,
    AppJson(dto): AppJson<UpdateStatusDto>,
) -> Result<Json<StatusResponse>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let status = ComplaintStatus::from_label(&dto.status).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Invalid status '{}'. Expected one of: Submitted, In Progress, Resolved, Closed",
            dto.status
        ))
    })?;
    let changed_by = dto.changed_by.as_deref().unwrap_or(DEFAULT_CHANGED_BY);
    let comments = dto.comments.as_deref().unwrap_or("");

    state
        .complaints
        .update_status(id, status, changed_by, comments)
        .await?;

    Ok(Json(StatusResponse::success("Status updated successfully")))
}

/// Delete a complaint; its history stays
#[utoipa::path(
    delete,
    path = "/api/admin/complaints/{id}",
    params(
        ("id" = i64, Path, description = "Complaint ID")
    ),
    responses(
        (status = 200, description = "Complaint deleted", body = StatusResponse),
        (status = 400, description = "Malformed complaint ID", body = ErrorResponse),
        (status = 404, description = "Complaint not found", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn delete_complaint(
    State(state): State<AdminState>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<StatusResponse>> {
    state.complaints.delete(id, DEFAULT_CHANGED_BY).await?;
    Ok(Json(StatusResponse::success(format!(
        "Complaint ID {} has been deleted.",
        id
    ))))
}
