use std::sync::Arc;

use axum::{
    extract::{multipart::Field, Multipart, State},
    http::StatusCode,
    Json,
};
use tracing::debug;

use crate::core::error::AppError;
use crate::core::extractor::SubmittingUser;
use crate::features::complaints::dtos::{ReportIssueFormDto, ReportIssueResponseDto};
use crate::features::complaints::services::{IntakeService, IntakeSubmission, Upload};
use crate::shared::types::ErrorResponse;

async fn read_upload(field: Field<'_>, name: &str) -> Result<Option<Upload>, AppError> {
    let content_type = field.content_type().map(|s| s.to_string());
    let data = field.bytes().await.map_err(|e| {
        debug!("Failed to read {} bytes: {}", name, e);
        AppError::BadRequest(format!("Failed to read {} data: {}", name, e))
    })?;

    // Browsers send an empty part for an untouched file input
    if data.is_empty() {
        return Ok(None);
    }

    Ok(Some(Upload {
        bytes: data.to_vec(),
        content_type,
    }))
}

async fn read_text(field: Field<'_>, name: &str) -> Result<Option<String>, AppError> {
    let text = field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read {} field: {}", name, e)))?;
    Ok(Some(text).filter(|t| !t.trim().is_empty()))
}

/// Report a civic issue
///
/// Accepts multipart/form-data with:
/// - `image`: photo of the issue (required)
/// - `audio`: voice note (optional)
/// - `description`: free text (required when no voice note)
/// - `location_text`: manual address (used without device coordinates)
/// - `device_latitude` / `device_longitude`: device GPS
#[utoipa::path(
    post,
    path = "/api/report-issue",
    tag = "complaints",
    request_body(
        content = ReportIssueFormDto,
        content_type = "multipart/form-data",
        description = "Photo, optional voice note, description and location of the issue",
    ),
    responses(
        (status = 201, description = "Complaint registered", body = ReportIssueResponseDto),
        (status = 400, description = "Missing image, content or location", body = ErrorResponse),
        (status = 500, description = "AI or storage failure", body = ErrorResponse)
    )
)]
pub async fn report_issue(
    user: Option<SubmittingUser>,
    State(intake): State<Arc<IntakeService>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ReportIssueResponseDto>), AppError> {
    let mut submission = IntakeSubmission {
        user_id: user.map(|u| u.user_id),
        ..Default::default()
    };

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "image" => submission.image = read_upload(field, "image").await?,
            "audio" => submission.audio = read_upload(field, "audio").await?,
            "description" => submission.description = read_text(field, "description").await?,
            "location_text" => {
                submission.location_text = read_text(field, "location_text").await?
            }
            "device_latitude" => {
                submission.device_latitude = read_text(field, "device_latitude").await?
            }
            "device_longitude" => {
                submission.device_longitude = read_text(field, "device_longitude").await?
            }
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let acknowledgement = intake.submit_detached(submission).await?;
    tracing::info!(
        complaint_id = acknowledgement.complaint_id,
        ghmc_id = %acknowledgement.ghmc_id,
        "Complaint registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(ReportIssueResponseDto::submitted(acknowledgement)),
    ))
}
