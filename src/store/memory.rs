use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;

use super::{validate_name, Row, StoreError, StoreResult, Table, TabularStore};

/// store id -> sheet name -> rows (header included)
type Sheets = HashMap<String, HashMap<String, Vec<Row>>>;

/// In-process `TabularStore`. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<Sheets>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All rows of a sheet including the header, `None` if the sheet was never opened.
    pub fn rows(&self, store_id: &str, sheet_name: &str) -> StoreResult<Option<Vec<Row>>> {
        let data = self.data.read().map_err(|_| StoreError::Poisoned)?;
        Ok(data
            .get(store_id)
            .and_then(|sheets| sheets.get(sheet_name))
            .cloned())
    }

    /// Names of the sheets in `store_id`, sorted.
    pub fn sheet_names(&self, store_id: &str) -> StoreResult<Vec<String>> {
        let data = self.data.read().map_err(|_| StoreError::Poisoned)?;
        let mut names: Vec<String> = data
            .get(store_id)
            .map(|sheets| sheets.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl TabularStore for MemoryStore {
    async fn open(&self, store_id: &str, sheet_name: &str) -> StoreResult<Box<dyn Table>> {
        let store_id = validate_name(store_id)?;
        let sheet_name = validate_name(sheet_name)?;

        self.data
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .entry(store_id.to_string())
            .or_default()
            .entry(sheet_name.to_string())
            .or_default();

        Ok(Box::new(MemoryTable {
            data: self.data.clone(),
            store_id: store_id.to_string(),
            name: sheet_name.to_string(),
        }))
    }
}

struct MemoryTable {
    data: Arc<RwLock<Sheets>>,
    store_id: String,
    name: String,
}

impl MemoryTable {
    fn with_rows<T>(&self, f: impl FnOnce(&mut Vec<Row>) -> T) -> StoreResult<T> {
        let mut data = self.data.write().map_err(|_| StoreError::Poisoned)?;
        let rows = data
            .entry(self.store_id.clone())
            .or_default()
            .entry(self.name.clone())
            .or_default();
        Ok(f(rows))
    }
}

#[async_trait]
impl Table for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ensure_header(&self, columns: &[&str]) -> StoreResult<bool> {
        self.with_rows(|rows| {
            if rows.is_empty() {
                rows.push(columns.iter().map(|c| c.to_string()).collect());
                true
            } else {
                false
            }
        })
    }

    async fn append_row(&self, values: Row) -> StoreResult<()> {
        self.with_rows(|rows| rows.push(values))
    }

    async fn data_rows(&self) -> StoreResult<Vec<Row>> {
        self.with_rows(|rows| rows.iter().skip(1).cloned().collect())
    }

    async fn replace_data_rows(&self, new_rows: Vec<Row>) -> StoreResult<()> {
        self.with_rows(|rows| {
            rows.truncate(1);
            rows.extend(new_rows);
        })
    }
}
