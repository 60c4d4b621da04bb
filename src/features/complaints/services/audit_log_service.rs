use std::sync::Arc;

use crate::core::database::{Database, DbTransaction, SqlValue};
use crate::core::error::Result;
use crate::features::complaints::models::StatusHistoryEntry;

/// Append-only writer and reader for `status_history`
pub struct AuditLogService {
    db: Arc<Database>,
}

impl AuditLogService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Append one transition inside the caller's transaction, so the audited
    /// mutation and its record commit or roll back together.
    pub async fn record_transition(
        tx: &mut DbTransaction,
        complaint_id: i64,
        old_status: Option<&str>,
        new_status: &str,
        changed_by: &str,
        comments: &str,
    ) -> Result<()> {
        tx.execute(
            "INSERT INTO status_history (complaint_id, old_status, new_status, changed_by, comments) \
             VALUES (?, ?, ?, ?, ?)",
            &[
                complaint_id.into(),
                SqlValue::Text(old_status.map(str::to_string)),
                new_status.into(),
                changed_by.into(),
                comments.into(),
            ],
        )
        .await?;

        tracing::info!(
            complaint_id,
            old_status = old_status.unwrap_or("-"),
            new_status,
            changed_by,
            "Recorded status transition"
        );
        Ok(())
    }

    /// Audit trail of a complaint, oldest first. Survives the complaint's removal.
    pub async fn history_for(&self, complaint_id: i64) -> Result<Vec<StatusHistoryEntry>> {
        self.db
            .fetch_all(
                "SELECT id, complaint_id, old_status, new_status, changed_by, comments, created_at \
                 FROM status_history WHERE complaint_id = ? ORDER BY created_at ASC, id ASC",
                &[complaint_id.into()],
            )
            .await?
            .into_iter()
            .map(StatusHistoryEntry::from_row)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AdminSeedConfig;
    use crate::core::schema;

    async fn service() -> AuditLogService {
        let db = Database::connect_in_memory().await.unwrap();
        schema::initialize(&db, &AdminSeedConfig::default())
            .await
            .unwrap();
        AuditLogService::new(Arc::new(db))
    }

    #[tokio::test]
    async fn test_history_is_oldest_first() {
        let audit = service().await;

        let mut tx = audit.db.begin().await.unwrap();
        AuditLogService::record_transition(&mut tx, 7, Some("Submitted"), "In Progress", "Admin", "")
            .await
            .unwrap();
        AuditLogService::record_transition(&mut tx, 7, Some("In Progress"), "Resolved", "Ravi", "Filled")
            .await
            .unwrap();
        AuditLogService::record_transition(&mut tx, 8, Some("Submitted"), "Closed", "Admin", "")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let history = audit.history_for(7).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].new_status, "In Progress");
        assert_eq!(history[1].old_status.as_deref(), Some("In Progress"));
        assert_eq!(history[1].changed_by, "Ravi");
        assert_eq!(history[1].comments, "Filled");
    }

    #[tokio::test]
    async fn test_rolled_back_transition_is_not_recorded() {
        let audit = service().await;

        let mut tx = audit.db.begin().await.unwrap();
        AuditLogService::record_transition(&mut tx, 3, None, "Closed", "Admin", "")
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        assert!(audit.history_for(3).await.unwrap().is_empty());
    }
}
