//! Postgres-backed sequence allocator.
//!
//! One row per inventory in `inventory_sequences`. Allocation is a single
//! statement:
//!
//! ```sql
//! INSERT INTO inventory_sequences (inventory_id, last_ordinal) VALUES ($1, 1)
//! ON CONFLICT (inventory_id)
//! DO UPDATE SET last_ordinal = inventory_sequences.last_ordinal + 1
//! RETURNING last_ordinal
//! ```
//!
//! Postgres takes a row lock for the update, so concurrent allocations for the same
//! inventory are serialized by the database while other inventories' rows stay
//! untouched. If the statement fails, the transaction is rolled back and no ordinal
//! is consumed.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | AllocationError |
//! |------------|----------------------|-----------------|
//! | Database (numeric value out of range) | `22003` | `Exhausted` |
//! | Database (other) | Any other | `Unavailable` |
//! | PoolClosed / PoolTimedOut / Io / Tls | N/A | `Unavailable` |

use std::sync::Arc;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::instrument;

use invtrack_inventory::InventoryId;

use super::r#trait::{AllocationError, SequenceAllocator};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS inventory_sequences (
    inventory_id UUID PRIMARY KEY,
    last_ordinal BIGINT NOT NULL DEFAULT 0 CHECK (last_ordinal >= 0)
)
"#;

/// Postgres-backed sequence allocator.
///
/// The async methods are the primary API. The [`SequenceAllocator`] impl blocks on
/// them and therefore needs a multi-threaded tokio runtime.
#[derive(Debug, Clone)]
pub struct PostgresSequenceAllocator {
    pool: Arc<PgPool>,
}

impl PostgresSequenceAllocator {
    /// Create a new allocator with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, AllocationError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", None, e))?;
        Ok(Self::new(pool))
    }

    /// Create the counter table if it does not exist.
    pub async fn ensure_schema(&self) -> Result<(), AllocationError> {
        sqlx::query(CREATE_TABLE)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", None, e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(inventory_id = %inventory_id), err)]
    pub async fn initialize_async(&self, inventory_id: InventoryId) -> Result<(), AllocationError> {
        sqlx::query(
            r#"
            INSERT INTO inventory_sequences (inventory_id, last_ordinal)
            VALUES ($1, 0)
            ON CONFLICT (inventory_id) DO NOTHING
            "#,
        )
        .bind(*inventory_id.0.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("initialize", Some(inventory_id), e))?;
        Ok(())
    }

    /// Atomically advance the counter and return the new ordinal.
    #[instrument(skip(self), fields(inventory_id = %inventory_id), err)]
    pub async fn allocate_next_async(
        &self,
        inventory_id: InventoryId,
    ) -> Result<u64, AllocationError> {
        let last: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO inventory_sequences (inventory_id, last_ordinal)
            VALUES ($1, 1)
            ON CONFLICT (inventory_id)
            DO UPDATE SET last_ordinal = inventory_sequences.last_ordinal + 1
            RETURNING last_ordinal
            "#,
        )
        .bind(*inventory_id.0.as_uuid())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("allocate_next", Some(inventory_id), e))?;

        to_ordinal(last)
    }

    #[instrument(skip(self), fields(inventory_id = %inventory_id), err)]
    pub async fn current_async(&self, inventory_id: InventoryId) -> Result<u64, AllocationError> {
        let last: Option<i64> = sqlx::query_scalar(
            "SELECT last_ordinal FROM inventory_sequences WHERE inventory_id = $1",
        )
        .bind(*inventory_id.0.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("current", Some(inventory_id), e))?;

        last.map(to_ordinal).unwrap_or(Ok(0))
    }
}

fn to_ordinal(value: i64) -> Result<u64, AllocationError> {
    // The CHECK constraint keeps the column non-negative.
    u64::try_from(value).map_err(|_| {
        AllocationError::Unavailable(format!("counter holds negative value {value}"))
    })
}

fn map_sqlx_error(
    operation: &str,
    inventory_id: Option<InventoryId>,
    err: sqlx::Error,
) -> AllocationError {
    match err {
        sqlx::Error::Database(db_err) => match (db_err.code().as_deref(), inventory_id) {
            (Some("22003"), Some(inventory_id)) => AllocationError::Exhausted(inventory_id),
            _ => AllocationError::Unavailable(format!(
                "database error in {operation}: {}",
                db_err.message()
            )),
        },
        sqlx::Error::PoolClosed => {
            AllocationError::Unavailable(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::PoolTimedOut => {
            AllocationError::Unavailable(format!("connection pool timed out in {operation}"))
        }
        other => AllocationError::Unavailable(format!("sqlx error in {operation}: {other}")),
    }
}

/// Run an allocator future from synchronous code.
fn block_on<F, T>(fut: F) -> Result<T, AllocationError>
where
    F: std::future::Future<Output = Result<T, AllocationError>>,
{
    let handle = tokio::runtime::Handle::try_current().map_err(|_| {
        AllocationError::Unavailable(
            "PostgresSequenceAllocator requires a tokio runtime".to_string(),
        )
    })?;
    if handle.runtime_flavor() != tokio::runtime::RuntimeFlavor::MultiThread {
        return Err(AllocationError::Unavailable(
            "PostgresSequenceAllocator needs a multi-threaded tokio runtime for blocking calls"
                .to_string(),
        ));
    }
    tokio::task::block_in_place(|| handle.block_on(fut))
}

impl SequenceAllocator for PostgresSequenceAllocator {
    fn initialize(&self, inventory_id: InventoryId) -> Result<(), AllocationError> {
        block_on(self.initialize_async(inventory_id))
    }

    fn allocate_next(&self, inventory_id: InventoryId) -> Result<u64, AllocationError> {
        block_on(self.allocate_next_async(inventory_id))
    }

    fn current(&self, inventory_id: InventoryId) -> Result<u64, AllocationError> {
        block_on(self.current_async(inventory_id))
    }
}
