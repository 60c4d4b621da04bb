use std::sync::Arc;

use crate::core::database::{Database, DbTransaction, SqlValue};
use crate::core::error::{AppError, Result};
use crate::features::complaints::models::{Complaint, ComplaintStatus, NewComplaint};
use crate::features::complaints::services::AuditLogService;
use crate::shared::constants::{DELETED_STATUS, GHMC_ID_PREFIX};

const COMPLAINT_COLUMNS: &str = "id, ghmc_id, user_id, category, priority, subject, description, \
     location, zone, gps_lat, gps_lng, status, submitted_by, created_at, updated_at";

/// Inserts that lose a race on `ghmc_id` are retried this many times
const MAX_INSERT_ATTEMPTS: u32 = 3;

/// Identifier of a freshly stored complaint
#[derive(Debug, Clone, PartialEq)]
pub struct StoredComplaint {
    pub id: i64,
    pub ghmc_id: String,
}

pub fn ghmc_id_for(epoch_secs: i64) -> String {
    format!("{}{}", GHMC_ID_PREFIX, epoch_secs)
}

/// Read/update/delete access to complaints
pub struct ComplaintService {
    db: Arc<Database>,
}

impl ComplaintService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a new complaint in one transaction with status `Submitted`.
    /// Nothing is left behind if the insert fails.
    pub async fn create(&self, complaint: &NewComplaint) -> Result<StoredComplaint> {
        let mut attempt = 1;
        loop {
            match self.try_create(complaint).await {
                Err(AppError::Database(sqlx::Error::Database(e)))
                    if e.is_unique_violation() && attempt < MAX_INSERT_ATTEMPTS =>
                {
                    tracing::warn!("ghmc_id collision on insert, retrying: {}", e);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_create(&self, complaint: &NewComplaint) -> Result<StoredComplaint> {
        let mut tx = self.db.begin().await?;

        let ghmc_id = next_free_ghmc_id(&mut tx, chrono::Utc::now().timestamp()).await?;
        let (gps_lat, gps_lng) = match complaint.gps {
            Some((lat, lng)) => (Some(lat), Some(lng)),
            None => (None, None),
        };

        let row = tx
            .fetch_one(
                "INSERT INTO complaints (ghmc_id, user_id, category, priority, subject, description, \
                 location, zone, gps_lat, gps_lng, status, submitted_by) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
                &[
                    ghmc_id.as_str().into(),
                    complaint.user_id.into(),
                    complaint.category.as_str().into(),
                    complaint.priority.as_str().into(),
                    complaint.subject.as_str().into(),
                    complaint.description.as_str().into(),
                    complaint.location.as_str().into(),
                    complaint.zone.as_str().into(),
                    gps_lat.into(),
                    gps_lng.into(),
                    ComplaintStatus::Submitted.as_str().into(),
                    complaint.submitted_by.as_str().into(),
                ],
            )
            .await?
            .ok_or_else(|| AppError::Internal("Insert returned no id".to_string()))?;

        let id = row
            .get("id")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| AppError::Internal("Insert returned no id".to_string()))?;

        tx.commit().await?;

        tracing::info!(complaint_id = id, ghmc_id = %ghmc_id, "Complaint stored");
        Ok(StoredComplaint { id, ghmc_id })
    }

    /// All complaints, newest first
    pub async fn list_all(&self) -> Result<Vec<Complaint>> {
        let sql = format!(
            "SELECT {} FROM complaints ORDER BY created_at DESC, id DESC",
            COMPLAINT_COLUMNS
        );
        self.db
            .fetch_all(&sql, &[])
            .await?
            .into_iter()
            .map(Complaint::from_row)
            .collect()
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Complaint>> {
        let sql = format!(
            "SELECT {} FROM complaints WHERE user_id = ? ORDER BY created_at DESC, id DESC",
            COMPLAINT_COLUMNS
        );
        self.db
            .fetch_all(&sql, &[user_id.into()])
            .await?
            .into_iter()
            .map(Complaint::from_row)
            .collect()
    }

    pub async fn get(&self, id: i64) -> Result<Complaint> {
        let sql = format!("SELECT {} FROM complaints WHERE id = ?", COMPLAINT_COLUMNS);
        let row = self
            .db
            .fetch_one(&sql, &[id.into()])
            .await?
            .ok_or_else(|| not_found(id))?;
        Complaint::from_row(row)
    }

    /// A complaint owned by `user_id`; anyone else's is reported as missing
    pub async fn get_for_user(&self, id: i64, user_id: i64) -> Result<Complaint> {
        let sql = format!(
            "SELECT {} FROM complaints WHERE id = ? AND user_id = ?",
            COMPLAINT_COLUMNS
        );
        let row = self
            .db
            .fetch_one(&sql, &[id.into(), user_id.into()])
            .await?
            .ok_or_else(|| not_found(id))?;
        Complaint::from_row(row)
    }

    /// Move a complaint to `new_status` and record exactly one audit entry
    pub async fn update_status(
        &self,
        id: i64,
        new_status: ComplaintStatus,
        changed_by: &str,
        comments: &str,
    ) -> Result<()> {
        let mut tx = self.db.begin().await?;
        let old_status = current_status(&mut tx, id).await?;

        tx.execute(
            "UPDATE complaints SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            &[new_status.as_str().into(), id.into()],
        )
        .await?;

        AuditLogService::record_transition(
            &mut tx,
            id,
            old_status.as_deref(),
            new_status.as_str(),
            changed_by,
            comments,
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Remove a complaint for good. The audit entry is written first and
    /// outlives the row.
    pub async fn delete(&self, id: i64, changed_by: &str) -> Result<()> {
        let mut tx = self.db.begin().await?;
        let old_status = current_status(&mut tx, id).await?;

        AuditLogService::record_transition(
            &mut tx,
            id,
            old_status.as_deref(),
            DELETED_STATUS,
            changed_by,
            "Complaint deleted by admin",
        )
        .await?;

        tx.execute("DELETE FROM complaints WHERE id = ?", &[id.into()])
            .await?;

        tx.commit().await?;
        tracing::info!(complaint_id = id, "Complaint deleted");
        Ok(())
    }
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Complaint {} not found", id))
}

async fn current_status(tx: &mut DbTransaction, id: i64) -> Result<Option<String>> {
    let row = tx
        .fetch_one("SELECT status FROM complaints WHERE id = ?", &[id.into()])
        .await?
        .ok_or_else(|| not_found(id))?;

    Ok(row
        .get("status")
        .and_then(|v| v.as_str())
        .map(str::to_string))
}

/// `GHMC/HYD/<epoch>`, advanced by one second's worth until unused
async fn next_free_ghmc_id(tx: &mut DbTransaction, epoch_secs: i64) -> Result<String> {
    let mut candidate = epoch_secs;
    loop {
        let ghmc_id = ghmc_id_for(candidate);
        let taken = tx
            .fetch_one(
                "SELECT id FROM complaints WHERE ghmc_id = ?",
                &[SqlValue::from(ghmc_id.as_str())],
            )
            .await?
            .is_some();

        if !taken {
            return Ok(ghmc_id);
        }
        candidate += 1;
    }
}
