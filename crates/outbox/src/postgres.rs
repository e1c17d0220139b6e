use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    MessageId, OutboxError, OutboxMessage, Result,
    store::{DueQuery, OutboxStore, validate_messages_for_append},
};

const SELECT_COLUMNS: &str =
    "SELECT id, message_type, content, occurred_on, processed_on, retry_count, error FROM outbox_messages";

/// PostgreSQL-backed outbox store.
#[derive(Clone)]
pub struct PostgresOutboxStore {
    pool: PgPool,
}

impl PostgresOutboxStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` with a small connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Inserts messages inside a caller-owned transaction.
    ///
    /// This is how the capture hook joins the transaction that writes the
    /// aggregate: the rows become visible only if the caller commits.
    pub async fn append_in_transaction(
        tx: &mut Transaction<'_, Postgres>,
        messages: &[OutboxMessage],
    ) -> Result<()> {
        validate_messages_for_append(messages)?;

        for message in messages {
            sqlx::query(
                r#"
                INSERT INTO outbox_messages (id, message_type, content, occurred_on, processed_on, retry_count, error)
                VALUES ($1, $2, $3, $4, NULL, 0, NULL)
                "#,
            )
            .bind(message.id.as_uuid())
            .bind(&message.message_type)
            .bind(&message.content)
            .bind(message.occurred_on)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("outbox_messages_pkey")
                {
                    return OutboxError::DuplicateMessage(message.id);
                }
                OutboxError::Database(e)
            })?;
        }

        Ok(())
    }

    fn row_to_message(row: PgRow) -> Result<OutboxMessage> {
        let retry_count: i32 = row.try_get("retry_count")?;
        let retry_count = u32::try_from(retry_count).map_err(|_| {
            OutboxError::InvalidMessage(format!("negative retry_count {retry_count}"))
        })?;

        Ok(OutboxMessage {
            id: MessageId::from_uuid(row.try_get::<Uuid, _>("id")?),
            message_type: row.try_get("message_type")?,
            content: row.try_get("content")?,
            occurred_on: row.try_get("occurred_on")?,
            processed_on: row.try_get("processed_on")?,
            retry_count,
            error: row.try_get("error")?,
        })
    }

    fn retry_count_param(value: u32) -> i32 {
        i32::try_from(value).unwrap_or(i32::MAX)
    }
}

#[async_trait]
impl OutboxStore for PostgresOutboxStore {
    async fn append(&self, messages: Vec<OutboxMessage>) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::append_in_transaction(&mut tx, &messages).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn due_messages(&self, query: DueQuery) -> Result<Vec<OutboxMessage>> {
        let mut sql = format!(
            "{SELECT_COLUMNS} WHERE processed_on IS NULL AND retry_count < $1 ORDER BY occurred_on ASC, id ASC"
        );
        if query.limit.is_some() {
            sql.push_str(" LIMIT $2");
        }

        let mut sqlx_query =
            sqlx::query(&sql).bind(Self::retry_count_param(query.max_retry_count));
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_message).collect()
    }

    async fn save_batch(&self, messages: Vec<OutboxMessage>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for message in &messages {
            let updated = sqlx::query(
                r#"
                UPDATE outbox_messages
                SET processed_on = $2, retry_count = $3, error = $4
                WHERE id = $1 AND processed_on IS NULL
                "#,
            )
            .bind(message.id.as_uuid())
            .bind(message.processed_on)
            .bind(Self::retry_count_param(message.retry_count))
            .bind(&message.error)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                let exists: Option<Uuid> =
                    sqlx::query_scalar("SELECT id FROM outbox_messages WHERE id = $1")
                        .bind(message.id.as_uuid())
                        .fetch_optional(&mut *tx)
                        .await?;
                // Dropping the transaction rolls back the rows already updated.
                return Err(match exists {
                    Some(_) => OutboxError::AlreadyProcessed(message.id),
                    None => OutboxError::MessageNotFound(message.id),
                });
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: MessageId) -> Result<Option<OutboxMessage>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_message).transpose()
    }

    async fn all(&self) -> Result<Vec<OutboxMessage>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY occurred_on ASC, id ASC"))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_message).collect()
    }
}
