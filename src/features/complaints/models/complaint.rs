use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core::database::RowMap;
use crate::core::error::{AppError, Result};
use crate::shared::constants::COMPLAINT_CATEGORIES;

/// Fixed set of complaint categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ComplaintCategory {
    #[serde(rename = "Open Garbage Dump")]
    OpenGarbageDump,
    #[serde(rename = "Sewage Leak/Overflow")]
    SewageLeak,
    #[serde(rename = "Pothole/Damaged Road")]
    DamagedRoad,
    #[serde(rename = "Damaged Electrical Infrastructure")]
    DamagedElectrical,
    #[serde(rename = "Fallen Tree")]
    FallenTree,
    #[serde(rename = "Water Logging")]
    WaterLogging,
    #[serde(rename = "Stray Animals")]
    StrayAnimals,
    Other,
}

impl ComplaintCategory {
    const ALL: [ComplaintCategory; 8] = [
        ComplaintCategory::OpenGarbageDump,
        ComplaintCategory::SewageLeak,
        ComplaintCategory::DamagedRoad,
        ComplaintCategory::DamagedElectrical,
        ComplaintCategory::FallenTree,
        ComplaintCategory::WaterLogging,
        ComplaintCategory::StrayAnimals,
        ComplaintCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        COMPLAINT_CATEGORIES[*self as usize]
    }

    /// Match a model-supplied label; anything outside the fixed set is `None`
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(label))
    }
}

impl std::fmt::Display for ComplaintCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complaint lifecycle. Admins may move a complaint to any status;
/// removal is recorded in the audit trail but is not itself a status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ComplaintStatus {
    #[default]
    Submitted,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
    Closed,
}

impl ComplaintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Submitted => "Submitted",
            ComplaintStatus::InProgress => "In Progress",
            ComplaintStatus::Resolved => "Resolved",
            ComplaintStatus::Closed => "Closed",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "submitted" => Some(ComplaintStatus::Submitted),
            "in progress" => Some(ComplaintStatus::InProgress),
            "resolved" => Some(ComplaintStatus::Resolved),
            "closed" => Some(ComplaintStatus::Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored complaint, as read back from the `complaints` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Complaint {
    pub id: i64,
    pub ghmc_id: String,
    pub user_id: Option<i64>,
    pub category: String,
    pub priority: String,
    pub subject: String,
    pub description: String,
    pub location: String,
    pub zone: String,
    pub gps_lat: Option<f64>,
    pub gps_lng: Option<f64>,
    pub status: String,
    pub submitted_by: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Complaint {
    pub fn from_row(row: RowMap) -> Result<Self> {
        serde_json::from_value(serde_json::Value::Object(row))
            .map_err(|e| AppError::Internal(format!("Malformed complaint row: {}", e)))
    }
}

/// Fields of a complaint produced by the intake pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct NewComplaint {
    pub user_id: Option<i64>,
    pub category: ComplaintCategory,
    pub priority: Priority,
    pub subject: String,
    pub description: String,
    pub location: String,
    pub zone: String,
    pub gps: Option<(f64, f64)>,
    pub submitted_by: String,
}
