//! CLI argument definitions.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use invtrack_observability::LogFormat;

/// Top-level CLI parser for `invtrack-idgen`.
#[derive(Debug, Parser)]
#[command(
    name = "invtrack-idgen",
    version,
    about = "Validate, preview and allocate inventory item identifiers"
)]
pub struct Cli {
    /// Log output format (json or pretty).
    #[arg(long, env = "INVTRACK_LOG_FORMAT", default_value = "json", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check a format definition and print its normalized form.
    Validate {
        /// Format definition as a JSON array of tokens.
        format: String,
    },

    /// Render identifiers for a range of ordinals without allocating anything.
    Preview {
        /// Format definition; defaults to INVTRACK_DEFAULT_ID_FORMAT or `ITEM-` + 4 digits.
        #[arg(long)]
        format: Option<String>,

        /// Number of identifiers to render.
        #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..=10_000))]
        count: u64,

        /// First ordinal to render.
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
        start: u64,

        /// Timestamp used for date tokens (RFC 3339); defaults to now.
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Allocate ordinals from the configured sequence backend.
    Allocate {
        /// Inventory id (UUID).
        #[arg(long)]
        inventory: Uuid,

        /// Number of ordinals to allocate.
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..=10_000))]
        count: u64,
    },
}
