use axum::{extract::State, Json};

use crate::core::database::StorageTier;
use crate::features::complaints::dtos::HealthResponseDto;

/// Liveness and active storage tier
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponseDto),
    ),
    tag = "health"
)]
pub async fn health(State(tier): State<StorageTier>) -> Json<HealthResponseDto> {
    Json(HealthResponseDto {
        status: "ok".to_string(),
        storage_tier: tier.as_str().to_string(),
    })
}
