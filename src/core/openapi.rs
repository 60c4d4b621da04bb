use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::core::middleware::USER_ID_HEADER;
use crate::features::complaints::{
    dtos as complaints_dtos, handlers as complaints_handlers, models as complaints_models,
};
use crate::shared::types::{ErrorResponse, StatusResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Intake
        complaints_handlers::report_issue,
        complaints_handlers::list_user_complaints,
        complaints_handlers::get_user_complaint,
        // Admin
        complaints_handlers::list_complaints,
        complaints_handlers::get_complaint,
        complaints_handlers::get_history,
        complaints_handlers::update_status,
        complaints_handlers::delete_complaint,
        // Health
        complaints_handlers::health,
    ),
    components(
        schemas(
            // Shared
            ErrorResponse,
            StatusResponse,
            // Complaints
            complaints_models::ComplaintCategory,
            complaints_models::Priority,
            complaints_models::ComplaintStatus,
            complaints_models::Complaint,
            complaints_models::StatusHistoryEntry,
            complaints_dtos::ReportIssueFormDto,
            complaints_dtos::AcknowledgementDto,
            complaints_dtos::ReportIssueResponseDto,
            complaints_dtos::UpdateStatusDto,
            complaints_dtos::HealthResponseDto,
        )
    ),
    tags(
        (name = "complaints", description = "Citizen complaint intake"),
        (name = "admin", description = "Complaint administration and audit trail"),
        (name = "health", description = "Liveness and storage tier"),
    ),
    modifiers(&GatewayUserAddon),
    info(
        title = "FixMyHyd API",
        version = "0.1.0",
        description = "Civic complaint intake for GHMC",
    )
)]
pub struct ApiDoc;

/// Documents the user-id header forwarded by the authenticating gateway
struct GatewayUserAddon;

impl Modify for GatewayUserAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "gateway_user",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    USER_ID_HEADER.as_str(),
                    "Numeric id of the submitting user, set by the gateway",
                ))),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
