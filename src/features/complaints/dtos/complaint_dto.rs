use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::features::complaints::models::{ComplaintCategory, Priority};

/// Multipart form accepted by the intake endpoint (documentation only).
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct ReportIssueFormDto {
    /// Photo of the issue
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub image: String,
    /// Optional voice note
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub audio: Option<String>,
    /// Free-text description; required when no voice note is attached
    #[schema(example = "Huge pothole near the bus stop, two-wheelers are falling")]
    pub description: Option<String>,
    /// Manual address, used when device coordinates are absent
    #[schema(example = "Road No. 12, Banjara Hills, Hyderabad")]
    pub location_text: Option<String>,
    #[schema(example = "17.3850")]
    pub device_latitude: Option<String>,
    #[schema(example = "78.4867")]
    pub device_longitude: Option<String>,
}

/// Summary handed back to the citizen once a complaint is stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AcknowledgementDto {
    pub complaint_id: i64,
    #[schema(example = "GHMC/HYD/1718000000")]
    pub ghmc_id: String,
    pub subject: String,
    pub category: ComplaintCategory,
    pub priority: Priority,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReportIssueResponseDto {
    pub status: String,
    pub message: String,
    pub acknowledgement: AcknowledgementDto,
}

impl ReportIssueResponseDto {
    pub fn submitted(acknowledgement: AcknowledgementDto) -> Self {
        Self {
            status: "success".to_string(),
            message: "Your complaint has been successfully submitted.".to_string(),
            acknowledgement,
        }
    }
}

/// Request DTO for an admin status change
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStatusDto {
    /// One of: Submitted, In Progress, Resolved, Closed
    #[schema(example = "In Progress")]
    pub status: String,
    /// Who made the change; defaults to "Admin"
    #[validate(length(min = 1, max = 100, message = "changed_by must be 1-100 characters"))]
    pub changed_by: Option<String>,
    #[validate(length(max = 1000, message = "Comments must not exceed 1000 characters"))]
    pub comments: Option<String>,
}

/// Liveness plus the storage tier the service ended up on
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponseDto {
    #[schema(example = "ok")]
    pub status: String,
    /// One of: postgres, sqlite-file, in-memory
    #[schema(example = "sqlite-file")]
    pub storage_tier: String,
}
