use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core::database::RowMap;
use crate::core::error::{AppError, Result};

/// One immutable audit record of a status change or removal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StatusHistoryEntry {
    pub id: i64,
    pub complaint_id: i64,
    pub old_status: Option<String>,
    pub new_status: String,
    pub changed_by: String,
    pub comments: String,
    pub created_at: String,
}

impl StatusHistoryEntry {
    pub fn from_row(row: RowMap) -> Result<Self> {
        serde_json::from_value(serde_json::Value::Object(row))
            .map_err(|e| AppError::Internal(format!("Malformed status history row: {}", e)))
    }
}
