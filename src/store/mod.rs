//! Append-only tabular stores addressed by an external store id.
//!
//! A store holds named sub-tables (sheets). The submission handler only ever needs
//! to locate-or-create a sheet, write its header once and append rows, so that is
//! all the traits expose, plus a read/rewrite pair used by the opt-in dedupe pass.
//!
//! ## Implementations
//!
//! - [`MemoryStore`]: in-process, used by tests and the `memory` backend
//! - [`FsStore`]: one JSON-lines file per sheet under a data directory
//! - [`SheetsStore`]: Google Sheets v4 REST API

mod error;
mod fs;
mod memory;
mod sheets;

use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use tracing::info;

use crate::config::{StoreBackend, StoreConfig};

pub use error::{StoreError, StoreResult};
pub use fs::FsStore;
pub use memory::MemoryStore;
pub use sheets::SheetsStore;

/// One row of a sheet, every cell stored as text.
pub type Row = Vec<String>;

// ###################################
// ->   TRAITS
// ###################################
#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Opens `sheet_name` inside the store identified by `store_id`, creating the sheet if it
    /// does not exist yet.
    async fn open(&self, store_id: &str, sheet_name: &str) -> StoreResult<Box<dyn Table>>;
}

#[async_trait]
pub trait Table: Send + Sync {
    fn name(&self) -> &str;

    /// Writes `columns` as the first row if the sheet is still empty.
    /// Returns `true` when the header was written by this call.
    async fn ensure_header(&self, columns: &[&str]) -> StoreResult<bool>;

    async fn append_row(&self, values: Row) -> StoreResult<()>;

    /// Every row after the header.
    async fn data_rows(&self) -> StoreResult<Vec<Row>>;

    /// Replaces every row after the header with `rows`.
    async fn replace_data_rows(&self, rows: Vec<Row>) -> StoreResult<()>;
}

/// Builds the store selected by `StoreConfig::backend`.
pub fn build_store(config: &StoreConfig) -> StoreResult<Arc<dyn TabularStore>> {
    info!(
        "{:<20} - Initializing the '{:?}' store",
        "build_store", config.backend
    );

    let store: Arc<dyn TabularStore> = match config.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Fs => Arc::new(FsStore::new(&config.data_dir)),
        StoreBackend::Sheets => Arc::new(SheetsStore::new(
            &config.sheets_api_url,
            config.sheets_access_token.clone(),
            config.sheets_timeout(),
        )?),
    };

    Ok(store)
}

// ###################################
// ->   DEDUPE
// ###################################
/// Drops every row whose values at `key_columns` were already seen, keeping the first one.
/// Missing cells count as empty strings.
pub fn dedupe_rows(rows: Vec<Row>, key_columns: &[usize]) -> Vec<Row> {
    let mut seen = HashSet::new();

    rows.into_iter()
        .filter(|row| {
            let key: Vec<String> = key_columns
                .iter()
                .map(|&col| row.get(col).cloned().unwrap_or_default())
                .collect();
            seen.insert(key)
        })
        .collect()
}

/// Dedupes the data rows of `table` in place, leaving the header untouched.
/// The table is only rewritten when something was dropped; returns the number of dropped rows.
pub async fn dedupe_table(table: &dyn Table, key_columns: &[usize]) -> StoreResult<usize> {
    let rows = table.data_rows().await?;
    let before = rows.len();

    let kept = dedupe_rows(rows, key_columns);
    let dropped = before - kept.len();

    if dropped > 0 {
        table.replace_data_rows(kept).await?;
        info!(sheet = table.name(), dropped, "Removed duplicate rows");
    }

    Ok(dropped)
}

/// Rejects names that could escape their directory or an A1 range.
pub(crate) fn validate_name(name: &str) -> StoreResult<&str> {
    let forbidden = ['/', '\\', '\0'];
    if name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.chars().any(|c| forbidden.contains(&c) || c.is_control())
    {
        return Err(StoreError::InvalidName(name.to_string()));
    }

    Ok(name)
}
