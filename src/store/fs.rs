use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::{fs, io::AsyncWriteExt};

use super::{validate_name, Row, StoreError, StoreResult, Table, TabularStore};

/// File backed `TabularStore`.
///
/// Layout: `<base_path>/<store_id>/<sheet_name>.jsonl`, one JSON array of strings per line,
/// the first line being the header.
#[derive(Debug, Clone)]
pub struct FsStore {
    base_path: PathBuf,
}

impl FsStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn sheet_path(&self, store_id: &str, sheet_name: &str) -> StoreResult<PathBuf> {
        let store_id = validate_name(store_id)?;
        let sheet_name = validate_name(sheet_name)?;
        Ok(self
            .base_path
            .join(store_id)
            .join(format!("{sheet_name}.jsonl")))
    }
}

#[async_trait]
impl TabularStore for FsStore {
    async fn open(&self, store_id: &str, sheet_name: &str) -> StoreResult<Box<dyn Table>> {
        let path = self.sheet_path(store_id, sheet_name)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }
        // Touch the file so an opened sheet always exists on disk.
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Box::new(FsTable {
            name: sheet_name.to_string(),
            path,
        }))
    }
}

struct FsTable {
    name: String,
    path: PathBuf,
}

impl FsTable {
    async fn append_line(&self, row: &[String]) -> StoreResult<()> {
        let mut line = serde_json::to_vec(row)?;
        line.push(b'\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        Ok(())
    }

    async fn read_lines(&self) -> StoreResult<Vec<String>> {
        let content = fs::read_to_string(&self.path).await?;
        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    fn parse_row(&self, line: &str) -> StoreResult<Row> {
        serde_json::from_str(line).map_err(|source| StoreError::MalformedRow {
            path: self.path.clone(),
            source,
        })
    }
}

#[async_trait]
impl Table for FsTable {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ensure_header(&self, columns: &[&str]) -> StoreResult<bool> {
        if fs::metadata(&self.path).await?.len() > 0 {
            return Ok(false);
        }

        let header: Row = columns.iter().map(|c| c.to_string()).collect();
        self.append_line(&header).await?;
        Ok(true)
    }

    async fn append_row(&self, values: Row) -> StoreResult<()> {
        self.append_line(&values).await
    }

    async fn data_rows(&self) -> StoreResult<Vec<Row>> {
        self.read_lines()
            .await?
            .iter()
            .skip(1)
            .map(|line| self.parse_row(line))
            .collect()
    }

    async fn replace_data_rows(&self, rows: Vec<Row>) -> StoreResult<()> {
        let lines = self.read_lines().await?;

        let mut content = String::new();
        if let Some(header) = lines.first() {
            content.push_str(header);
            content.push('\n');
        }
        for row in &rows {
            content.push_str(&serde_json::to_string(row)?);
            content.push('\n');
        }

        // Write next to the sheet and rename so readers never see a half written file.
        let tmp_path = self.path.with_extension("jsonl.tmp");
        fs::write(&tmp_path, content).await?;
        fs::rename(&tmp_path, &self.path).await?;

        Ok(())
    }
}
