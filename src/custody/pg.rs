//! Transfer Database Layer
//!
//! PostgreSQL persistence for transfer state. Transitions commit
//! through an atomic CAS on the revision column; checkpoints live in a
//! side table ordered by seq and only the new tail is inserted on
//! update.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::status::{CustodyStatus, DeliveryStatus};
use super::store::{TransferFilter, TransferStore};
use super::types::{Checkpoint, Transfer, TransferId, TransferKind};
use crate::core_types::UserRef;
use crate::error::WorkflowError;

const TRANSFER_COLUMNS: &str = r#"
    id, kind, sender_id, sender_name, receiver_id, receiver_name,
    documents, message, custody_status, delivery_status,
    tracking_number, courier_name, company_id,
    created_at, accepted_at, cancelled_at, updated_at, revision
"#;

pub struct PgTransferStore {
    pool: PgPool,
}

impl PgTransferStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_checkpoints(
        &self,
        transfer_id: TransferId,
    ) -> Result<Vec<Checkpoint>, WorkflowError> {
        let rows = sqlx::query(
            r#"
            SELECT status, location, note, tracking_number, courier_name,
                   updated_by_id, updated_by_name, created_at
            FROM transfer_checkpoints_tb
            WHERE transfer_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(transfer_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut checkpoints = Vec::with_capacity(rows.len());
        for row in rows {
            let status_id: i16 = row.get("status");
            let status = DeliveryStatus::from_id(status_id).ok_or_else(|| {
                WorkflowError::StorageError(format!("invalid delivery status id: {status_id}"))
            })?;
            checkpoints.push(Checkpoint {
                status,
                location: row.get("location"),
                note: row.get("note"),
                tracking_number: row.get("tracking_number"),
                courier_name: row.get("courier_name"),
                updated_by: UserRef {
                    id: row.get::<i64, _>("updated_by_id") as u64,
                    name: row.get("updated_by_name"),
                },
                created_at: row.get("created_at"),
            });
        }
        Ok(checkpoints)
    }

    fn row_to_transfer(
        &self,
        row: &sqlx::postgres::PgRow,
        checkpoints: Vec<Checkpoint>,
    ) -> Result<Transfer, WorkflowError> {
        let id_str: String = row.get("id");
        let id: TransferId = id_str
            .parse()
            .map_err(|_| WorkflowError::StorageError(format!("invalid transfer id: {id_str}")))?;

        let kind_id: i16 = row.get("kind");
        let kind = TransferKind::from_id(kind_id).ok_or_else(|| {
            WorkflowError::StorageError(format!("invalid transfer kind id: {kind_id}"))
        })?;

        let custody_id: i16 = row.get("custody_status");
        let custody_status = CustodyStatus::from_id(custody_id).ok_or_else(|| {
            WorkflowError::StorageError(format!("invalid custody status id: {custody_id}"))
        })?;

        let delivery_status = match row.get::<Option<i16>, _>("delivery_status") {
            Some(delivery_id) => Some(DeliveryStatus::from_id(delivery_id).ok_or_else(|| {
                WorkflowError::StorageError(format!("invalid delivery status id: {delivery_id}"))
            })?),
            None => None,
        };

        let documents: Vec<i64> = row.get("documents");

        Ok(Transfer {
            id,
            kind,
            sender: UserRef {
                id: row.get::<i64, _>("sender_id") as u64,
                name: row.get("sender_name"),
            },
            receiver: UserRef {
                id: row.get::<i64, _>("receiver_id") as u64,
                name: row.get("receiver_name"),
            },
            documents: documents.into_iter().map(|d| d as u64).collect(),
            message: row.get("message"),
            custody_status,
            delivery_status,
            tracking_number: row.get("tracking_number"),
            courier_name: row.get("courier_name"),
            checkpoints,
            company_id: row.get("company_id"),
            created_at: row.get("created_at"),
            accepted_at: row.get("accepted_at"),
            cancelled_at: row.get("cancelled_at"),
            updated_at: row.get("updated_at"),
            revision: row.get::<i64, _>("revision") as u64,
        })
    }

    async fn insert_checkpoint_tail(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        transfer: &Transfer,
        from_seq: usize,
    ) -> Result<(), WorkflowError> {
        for (seq, checkpoint) in transfer.checkpoints.iter().enumerate().skip(from_seq) {
            sqlx::query(
                r#"
                INSERT INTO transfer_checkpoints_tb
                    (transfer_id, seq, status, location, note, tracking_number,
                     courier_name, updated_by_id, updated_by_name, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(transfer.id.to_string())
            .bind(seq as i32)
            .bind(checkpoint.status.id())
            .bind(&checkpoint.location)
            .bind(&checkpoint.note)
            .bind(&checkpoint.tracking_number)
            .bind(&checkpoint.courier_name)
            .bind(checkpoint.updated_by.id as i64)
            .bind(&checkpoint.updated_by.name)
            .bind(checkpoint.created_at)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl TransferStore for PgTransferStore {
    async fn create(&self, transfer: &Transfer) -> Result<(), WorkflowError> {
        let documents: Vec<i64> = transfer.documents.iter().map(|&d| d as i64).collect();
        sqlx::query(
            r#"
            INSERT INTO custody_transfers_tb
                (id, kind, sender_id, sender_name, receiver_id, receiver_name,
                 documents, message, custody_status, delivery_status,
                 tracking_number, courier_name, company_id,
                 created_at, accepted_at, cancelled_at, updated_at, revision)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(transfer.id.to_string())
        .bind(transfer.kind.id())
        .bind(transfer.sender.id as i64)
        .bind(&transfer.sender.name)
        .bind(transfer.receiver.id as i64)
        .bind(&transfer.receiver.name)
        .bind(&documents)
        .bind(&transfer.message)
        .bind(transfer.custody_status.id())
        .bind(transfer.delivery_status.map(|s| s.id()))
        .bind(&transfer.tracking_number)
        .bind(&transfer.courier_name)
        .bind(&transfer.company_id)
        .bind(transfer.created_at)
        .bind(transfer.accepted_at)
        .bind(transfer.cancelled_at)
        .bind(transfer.updated_at)
        .bind(transfer.revision as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: TransferId) -> Result<Option<Transfer>, WorkflowError> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM custody_transfers_tb WHERE id = $1"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let checkpoints = self.load_checkpoints(id).await?;
                Ok(Some(self.row_to_transfer(&row, checkpoints)?))
            }
            None => Ok(None),
        }
    }

    async fn list(&self, filter: &TransferFilter) -> Result<Vec<Transfer>, WorkflowError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {TRANSFER_COLUMNS} FROM custody_transfers_tb
            WHERE ($1::text IS NULL OR company_id = $1)
              AND ($2::bigint IS NULL OR sender_id = $2 OR receiver_id = $2)
              AND ($3::smallint IS NULL OR kind = $3)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(filter.company_id.as_deref())
        .bind(filter.participant.map(|p| p as i64))
        .bind(filter.kind.map(|k| k.id()))
        .fetch_all(&self.pool)
        .await?;

        let mut transfers = Vec::with_capacity(rows.len());
        for row in rows {
            let transfer = self.row_to_transfer(&row, Vec::new())?;
            let checkpoints = self.load_checkpoints(transfer.id).await?;
            transfers.push(Transfer {
                checkpoints,
                ..transfer
            });
        }
        Ok(transfers)
    }

    async fn update_if(
        &self,
        expected_revision: u64,
        updated: &Transfer,
    ) -> Result<bool, WorkflowError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE custody_transfers_tb
            SET custody_status = $1, delivery_status = $2,
                tracking_number = $3, courier_name = $4,
                accepted_at = $5, cancelled_at = $6,
                updated_at = $7, revision = $8
            WHERE id = $9 AND revision = $10
            "#,
        )
        .bind(updated.custody_status.id())
        .bind(updated.delivery_status.map(|s| s.id()))
        .bind(&updated.tracking_number)
        .bind(&updated.courier_name)
        .bind(updated.accepted_at)
        .bind(updated.cancelled_at)
        .bind(updated.updated_at)
        .bind(updated.revision as i64)
        .bind(updated.id.to_string())
        .bind(expected_revision as i64)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        // Checkpoints are append-only: persist only entries beyond the
        // count already stored.
        let stored: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM transfer_checkpoints_tb WHERE transfer_id = $1",
        )
        .bind(updated.id.to_string())
        .fetch_one(&mut *tx)
        .await?;
        self.insert_checkpoint_tail(&mut tx, updated, stored as usize)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}

/// Create the custody tables if missing. Dev convenience; production
/// schemas are managed by migrations.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), WorkflowError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS custody_transfers_tb (
            id               TEXT PRIMARY KEY,
            kind             SMALLINT NOT NULL,
            sender_id        BIGINT NOT NULL,
            sender_name      TEXT NOT NULL,
            receiver_id      BIGINT NOT NULL,
            receiver_name    TEXT NOT NULL,
            documents        BIGINT[] NOT NULL,
            message          TEXT,
            custody_status   SMALLINT NOT NULL,
            delivery_status  SMALLINT,
            tracking_number  TEXT,
            courier_name     TEXT,
            company_id       TEXT NOT NULL,
            created_at       TIMESTAMPTZ NOT NULL,
            accepted_at      TIMESTAMPTZ,
            cancelled_at     TIMESTAMPTZ,
            updated_at       TIMESTAMPTZ NOT NULL,
            revision         BIGINT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transfer_checkpoints_tb (
            transfer_id      TEXT NOT NULL REFERENCES custody_transfers_tb(id),
            seq              INTEGER NOT NULL,
            status           SMALLINT NOT NULL,
            location         TEXT,
            note             TEXT,
            tracking_number  TEXT,
            courier_name     TEXT,
            updated_by_id    BIGINT NOT NULL,
            updated_by_name  TEXT NOT NULL,
            created_at       TIMESTAMPTZ NOT NULL,
            PRIMARY KEY (transfer_id, seq)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_custody_transfers_company ON custody_transfers_tb (company_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
