//! Approval Request Database Layer
//!
//! Serial keys assigned by Postgres on insert; the same revision CAS
//! contract as the transfer store. `pending_changes` is stored as a
//! JSON string column.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::status::ApprovalStatus;
use super::store::{ApprovalFilter, ApprovalStore};
use super::types::{ApprovalAction, ApprovalRequest};
use crate::core_types::UserRef;
use crate::error::WorkflowError;

const REQUEST_COLUMNS: &str = r#"
    id, action, entity_type, entity_id, entity_name, message,
    pending_changes, requested_by_id, requested_by_name, company_id,
    status, reviewed_by_id, reviewed_by_name, review_note,
    created_at, reviewed_at, revision
"#;

pub struct PgApprovalStore {
    pool: PgPool,
}

impl PgApprovalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_request(&self, row: &sqlx::postgres::PgRow) -> Result<ApprovalRequest, WorkflowError> {
        let action_id: i16 = row.get("action");
        let action = ApprovalAction::from_id(action_id).ok_or_else(|| {
            WorkflowError::StorageError(format!("invalid approval action id: {action_id}"))
        })?;

        let status_id: i16 = row.get("status");
        let status = ApprovalStatus::from_id(status_id).ok_or_else(|| {
            WorkflowError::StorageError(format!("invalid approval status id: {status_id}"))
        })?;

        let pending_changes = match row.get::<Option<String>, _>("pending_changes") {
            Some(json) => Some(serde_json::from_str(&json).map_err(|e| {
                WorkflowError::StorageError(format!("corrupt pending_changes: {e}"))
            })?),
            None => None,
        };

        let reviewed_by = match row.get::<Option<i64>, _>("reviewed_by_id") {
            Some(id) => Some(UserRef {
                id: id as u64,
                name: row.get::<Option<String>, _>("reviewed_by_name").unwrap_or_default(),
            }),
            None => None,
        };

        Ok(ApprovalRequest {
            id: row.get("id"),
            action,
            entity_type: row.get("entity_type"),
            entity_id: row.get("entity_id"),
            entity_name: row.get("entity_name"),
            message: row.get("message"),
            pending_changes,
            requested_by: UserRef {
                id: row.get::<i64, _>("requested_by_id") as u64,
                name: row.get("requested_by_name"),
            },
            company_id: row.get("company_id"),
            status,
            reviewed_by,
            review_note: row.get("review_note"),
            created_at: row.get("created_at"),
            reviewed_at: row.get("reviewed_at"),
            revision: row.get::<i64, _>("revision") as u64,
        })
    }
}

#[async_trait]
impl ApprovalStore for PgApprovalStore {
    async fn create(&self, request: ApprovalRequest) -> Result<ApprovalRequest, WorkflowError> {
        let pending_changes = match &request.pending_changes {
            Some(value) => Some(serde_json::to_string(value).map_err(|e| {
                WorkflowError::StorageError(format!("unserializable pending_changes: {e}"))
            })?),
            None => None,
        };

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO approval_requests_tb
                (action, entity_type, entity_id, entity_name, message,
                 pending_changes, requested_by_id, requested_by_name,
                 company_id, status, created_at, revision)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            "#,
        )
        .bind(request.action.id())
        .bind(&request.entity_type)
        .bind(request.entity_id)
        .bind(&request.entity_name)
        .bind(&request.message)
        .bind(pending_changes)
        .bind(request.requested_by.id as i64)
        .bind(&request.requested_by.name)
        .bind(&request.company_id)
        .bind(request.status.id())
        .bind(request.created_at)
        .bind(request.revision as i64)
        .fetch_one(&self.pool)
        .await?;

        Ok(ApprovalRequest { id, ..request })
    }

    async fn get(&self, id: i64) -> Result<Option<ApprovalRequest>, WorkflowError> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM approval_requests_tb WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.row_to_request(&row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, filter: &ApprovalFilter) -> Result<Vec<ApprovalRequest>, WorkflowError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {REQUEST_COLUMNS} FROM approval_requests_tb
            WHERE ($1::text IS NULL OR company_id = $1)
              AND ($2::bigint IS NULL OR requested_by_id = $2)
              AND ($3::smallint IS NULL OR status = $3)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(filter.company_id.as_deref())
        .bind(filter.requested_by.map(|u| u as i64))
        .bind(filter.status.map(|s| s.id()))
        .fetch_all(&self.pool)
        .await?;

        let mut requests = Vec::with_capacity(rows.len());
        for row in rows {
            requests.push(self.row_to_request(&row)?);
        }
        Ok(requests)
    }

    async fn update_if(
        &self,
        expected_revision: u64,
        updated: &ApprovalRequest,
    ) -> Result<bool, WorkflowError> {
        let result = sqlx::query(
            r#"
            UPDATE approval_requests_tb
            SET status = $1, reviewed_by_id = $2, reviewed_by_name = $3,
                review_note = $4, reviewed_at = $5, revision = $6
            WHERE id = $7 AND revision = $8
            "#,
        )
        .bind(updated.status.id())
        .bind(updated.reviewed_by.as_ref().map(|u| u.id as i64))
        .bind(updated.reviewed_by.as_ref().map(|u| u.name.as_str()))
        .bind(&updated.review_note)
        .bind(updated.reviewed_at)
        .bind(updated.revision as i64)
        .bind(updated.id)
        .bind(expected_revision as i64)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Create the approval tables if missing.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), WorkflowError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS approval_requests_tb (
            id                 BIGSERIAL PRIMARY KEY,
            action             SMALLINT NOT NULL,
            entity_type        TEXT NOT NULL,
            entity_id          BIGINT NOT NULL,
            entity_name        TEXT NOT NULL,
            message            TEXT NOT NULL,
            pending_changes    TEXT,
            requested_by_id    BIGINT NOT NULL,
            requested_by_name  TEXT NOT NULL,
            company_id         TEXT NOT NULL,
            status             SMALLINT NOT NULL,
            reviewed_by_id     BIGINT,
            reviewed_by_name   TEXT,
            review_note        TEXT,
            created_at         TIMESTAMPTZ NOT NULL,
            reviewed_at        TIMESTAMPTZ,
            revision           BIGINT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_approval_requests_company ON approval_requests_tb (company_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
