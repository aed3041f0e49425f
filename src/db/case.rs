//! Case database operations

use async_trait::async_trait;

use super::{CaseStore, PgCaseStore, StoreError};
use crate::case::models::{Attachment, Case, CaseFile, Message};

const CASE_COLUMNS: &str =
    "id, issue_title, COALESCE(summary, '') AS summary, COALESCE(risk_level, '') AS risk_level";

#[async_trait]
impl CaseStore for PgCaseStore {
    async fn list_cases(&self) -> Result<Vec<Case>, StoreError> {
        let cases = sqlx::query_as::<_, Case>(&format!("SELECT {CASE_COLUMNS} FROM cases ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(cases)
    }

    async fn load_case(&self, id: i32) -> Result<CaseFile, StoreError> {
        let case = sqlx::query_as::<_, Case>(&format!("SELECT {CASE_COLUMNS} FROM cases WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::CaseNotFound(id))?;

        let messages = sqlx::query_as::<_, Message>(
            "SELECT id, case_id, sender, COALESCE(subject, '') AS subject, body_text, date_sent \
             FROM messages WHERE case_id = $1 ORDER BY date_sent, id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let attachments = sqlx::query_as::<_, Attachment>(
            "SELECT id, case_id, filename, gcs_path FROM attachments WHERE case_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        log::debug!(
            "loaded case {} with {} messages and {} attachments",
            id,
            messages.len(),
            attachments.len()
        );

        Ok(CaseFile::new(case, messages, attachments))
    }
}
