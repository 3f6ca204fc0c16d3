use async_trait::async_trait;
use keyhole_core::{
    DeleteRequest, Repository, ShortCode, StorageError, StorageResult, UrlRecord, UsageStats,
    SAVE_BATCH_LIMIT,
};
use sqlx::{PgPool, Row};
use std::collections::HashMap;

/// Constraint names carry the uniqueness semantics back out of the engine;
/// they must match the DDL below.
const CODE_CONSTRAINT: &str = "url_records_code_pkey";
const ORIGINAL_CONSTRAINT: &str = "url_records_original_ukey";

const BOOTSTRAP_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS url_records (
    short_code varchar(8) CONSTRAINT url_records_code_pkey PRIMARY KEY,
    original_url varchar(2048) CONSTRAINT url_records_original_ukey UNIQUE,
    owner_id varchar(64) NOT NULL,
    deleted boolean NOT NULL DEFAULT false
)
"#;

/// Postgres implementation of the repository contract.
///
/// Both uniqueness invariants are delegated to the engine's unique
/// constraints; violation errors are translated back by inspecting the
/// constraint name. The service layer holds no locks of its own around
/// these calls.
#[derive(Debug, Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a repository from an existing pool and ensures the schema
    /// exists.
    pub async fn new(pool: PgPool) -> StorageResult<Self> {
        sqlx::query(BOOTSTRAP_DDL)
            .execute(&pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self { pool })
    }

    /// Creates a repository by opening a new connection pool.
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Self::new(pool).await
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn save_chunk(
        &self,
        chunk: &[(&ShortCode, &String)],
        owner_id: &str,
    ) -> StorageResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        for (code, original_url) in chunk {
            let result = sqlx::query(
                r#"
                INSERT INTO url_records (short_code, original_url, owner_id)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(code.as_str())
            .bind(original_url.as_str())
            .bind(owner_id)
            .execute(&mut *tx)
            .await;

            if let Err(err) = result {
                return Err(translate_insert_error(err, code, original_url));
            }
        }
        tx.commit().await.map_err(map_sqlx_error)
    }
}

fn translate_insert_error(err: sqlx::Error, code: &ShortCode, original_url: &str) -> StorageError {
    if let Some(db) = err.as_database_error() {
        if db.is_unique_violation() {
            return match db.constraint() {
                Some(CODE_CONSTRAINT) => StorageError::CodeCollision(code.to_string()),
                Some(ORIGINAL_CONSTRAINT) => {
                    StorageError::UrlAlreadyMapped(original_url.to_owned())
                }
                _ => StorageError::Query(db.to_string()),
            };
        }
    }
    map_sqlx_error(err)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn save_one(
        &self,
        code: &ShortCode,
        original_url: &str,
        owner_id: &str,
    ) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO url_records (short_code, original_url, owner_id)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(code.as_str())
        .bind(original_url)
        .bind(owner_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => Err(translate_insert_error(err, code, original_url)),
        }
    }

    async fn save_many(
        &self,
        entries: &HashMap<ShortCode, String>,
        owner_id: &str,
    ) -> StorageResult<()> {
        // One transaction per chunk; chunks committed before a failure stay
        // committed.
        let pairs: Vec<(&ShortCode, &String)> = entries.iter().collect();
        for chunk in pairs.chunks(SAVE_BATCH_LIMIT) {
            self.save_chunk(chunk, owner_id).await?;
        }
        Ok(())
    }

    async fn find_by_original(&self, original_url: &str) -> StorageResult<Option<ShortCode>> {
        let row = sqlx::query(
            r#"
            SELECT short_code
            FROM url_records
            WHERE original_url = $1
            LIMIT 1
            "#,
        )
        .bind(original_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|row| {
            let short_code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
            Ok(ShortCode::new_unchecked(short_code))
        })
        .transpose()
    }

    async fn find_by_code(&self, code: &ShortCode) -> StorageResult<Option<UrlRecord>> {
        let row = sqlx::query(
            r#"
            SELECT original_url, owner_id, deleted
            FROM url_records
            WHERE short_code = $1
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(UrlRecord {
            original_url: row.try_get("original_url").map_err(map_sqlx_error)?,
            owner_id: row.try_get("owner_id").map_err(map_sqlx_error)?,
            deleted: row.try_get("deleted").map_err(map_sqlx_error)?,
        }))
    }

    async fn list_by_owner(&self, owner_id: &str) -> StorageResult<HashMap<ShortCode, String>> {
        let rows = sqlx::query(
            r#"
            SELECT short_code, original_url
            FROM url_records
            WHERE owner_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let mut owned = HashMap::with_capacity(rows.len());
        for row in rows {
            let short_code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
            let original_url: String = row.try_get("original_url").map_err(map_sqlx_error)?;
            owned.insert(ShortCode::new_unchecked(short_code), original_url);
        }
        Ok(owned)
    }

    async fn mark_deleted(&self, requests: &[DeleteRequest]) -> StorageResult<u64> {
        if requests.is_empty() {
            return Ok(0);
        }

        // One set-based update joined against the requested pairs, so an
        // ownership mismatch naturally affects zero rows.
        let values: Vec<String> = (0..requests.len())
            .map(|i| format!("(${}, ${})", i * 2 + 1, i * 2 + 2))
            .collect();
        let sql = format!(
            "UPDATE url_records SET deleted = true \
             FROM (VALUES {}) AS data(short_code, owner_id) \
             WHERE url_records.short_code = data.short_code \
               AND url_records.owner_id = data.owner_id",
            values.join(",")
        );

        let mut query = sqlx::query(&sql);
        for request in requests {
            query = query.bind(request.code.as_str()).bind(&request.owner_id);
        }

        let result = query.execute(&self.pool).await.map_err(map_sqlx_error)?;
        tracing::debug!(
            requested = requests.len(),
            affected = result.rows_affected(),
            "marked records deleted"
        );
        Ok(result.rows_affected())
    }

    async fn stats(&self) -> StorageResult<UsageStats> {
        let row = sqlx::query(
            r#"
            SELECT
                count(*) FILTER (WHERE NOT deleted) AS urls,
                count(DISTINCT owner_id) AS users
            FROM url_records
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let urls: i64 = row.try_get("urls").map_err(map_sqlx_error)?;
        let users: i64 = row.try_get("users").map_err(map_sqlx_error)?;
        Ok(UsageStats {
            urls: urls as u64,
            users: users as u64,
        })
    }

    async fn health_check(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn shutdown(&self) -> StorageResult<()> {
        self.pool.close().await;
        Ok(())
    }
}
