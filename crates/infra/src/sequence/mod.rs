//! Per-inventory ordinal allocation.
//!
//! The allocator is the single authority for item ordinals. Each backend turns
//! `allocate_next` into one atomic step per inventory: a per-key mutex in memory,
//! a single `INSERT … ON CONFLICT DO UPDATE … RETURNING` statement in Postgres.
//! Ordinals are never derived from counting existing items.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

use std::sync::Arc;

pub use in_memory::InMemorySequenceAllocator;
pub use postgres::PostgresSequenceAllocator;
pub use r#trait::{AllocationError, SequenceAllocator};

use crate::config::{InfraConfig, SequenceBackend};

/// Build the allocator selected by configuration.
///
/// The Postgres backend connects and creates its table if missing.
pub async fn build_allocator(
    config: &InfraConfig,
) -> Result<Arc<dyn SequenceAllocator>, AllocationError> {
    match config.sequence_backend {
        SequenceBackend::Memory => {
            tracing::info!(backend = "memory", "using in-memory sequence allocator");
            Ok(Arc::new(InMemorySequenceAllocator::new()))
        }
        SequenceBackend::Postgres => {
            let url = config.database_url.as_deref().ok_or_else(|| {
                AllocationError::Unavailable("DATABASE_URL is not configured".to_string())
            })?;
            let allocator =
                PostgresSequenceAllocator::connect(url, config.database_max_connections).await?;
            allocator.ensure_schema().await?;
            tracing::info!(backend = "postgres", "using postgres sequence allocator");
            Ok(Arc::new(allocator))
        }
    }
}
