use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{validate_name, Row, StoreError, StoreResult, Table, TabularStore};

/// `TabularStore` backed by the Google Sheets v4 REST API.
/// The store id is the spreadsheet id, sub-tables are sheets (tabs) of that spreadsheet.
#[derive(Debug, Clone)]
pub struct SheetsStore {
    http_client: Client,
    api_url: reqwest::Url,
    access_token: SecretString,
}

impl SheetsStore {
    pub fn new<S: AsRef<str>>(
        api_url: S,
        access_token: SecretString,
        timeout: Duration,
    ) -> StoreResult<Self> {
        let api_url = reqwest::Url::parse(api_url.as_ref())
            .map_err(|e| StoreError::UrlParsing(e.to_string()))?;

        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(SheetsStore {
            http_client,
            api_url,
            access_token,
        })
    }

    /// `<api_url>/v4/spreadsheets/<segments..>`, every segment percent-encoded.
    fn url(&self, segments: &[&str]) -> StoreResult<reqwest::Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::UrlParsing(format!("not a base url: {}", self.api_url)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets"])
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> StoreResult<Response> {
        let resp = request
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        Err(StoreError::Remote {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl TabularStore for SheetsStore {
    async fn open(&self, store_id: &str, sheet_name: &str) -> StoreResult<Box<dyn Table>> {
        let store_id = validate_name(store_id)?;
        let sheet_name = validate_name(sheet_name)?;

        let url = self.url(&[store_id])?;
        let meta: SpreadsheetMeta = self
            .send(
                self.http_client
                    .get(url)
                    .query(&[("fields", "sheets.properties.title")]),
            )
            .await?
            .json()
            .await?;

        if !meta.has_sheet(sheet_name) {
            let url = self.url(&[&format!("{store_id}:batchUpdate")])?;
            let body = json!({
                "requests": [{ "addSheet": { "properties": { "title": sheet_name } } }]
            });
            self.send(self.http_client.post(url).json(&body)).await?;
            info!(store_id, sheet_name, "Created sheet");
        }

        Ok(Box::new(SheetsTable {
            store: self.clone(),
            store_id: store_id.to_string(),
            name: sheet_name.to_string(),
        }))
    }
}

struct SheetsTable {
    store: SheetsStore,
    store_id: String,
    name: String,
}

impl SheetsTable {
    /// A1 notation scoped to this sheet, e.g. `'newsletter'!A1:Z1`.
    fn range(&self, cells: &str) -> String {
        format!("'{}'!{}", self.name.replace('\'', "''"), cells)
    }

    fn values_url(&self, cells: &str, action: &str) -> StoreResult<reqwest::Url> {
        let range = format!("{}{action}", self.range(cells));
        self.store.url(&[&self.store_id, "values", &range])
    }

    async fn get_values(&self, cells: &str) -> StoreResult<Vec<Row>> {
        let url = self.values_url(cells, "")?;
        let range: ValueRange = self
            .store
            .send(self.store.http_client.get(url))
            .await?
            .json()
            .await?;

        Ok(range.into_rows())
    }
}

#[async_trait]
impl Table for SheetsTable {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ensure_header(&self, columns: &[&str]) -> StoreResult<bool> {
        if !self.get_values("A1:Z1").await?.is_empty() {
            return Ok(false);
        }

        let header: Row = columns.iter().map(|c| c.to_string()).collect();
        self.append_row(header).await?;
        Ok(true)
    }

    async fn append_row(&self, values: Row) -> StoreResult<()> {
        let url = self.values_url("A1", ":append")?;
        let body = json!({ "values": [values] });

        self.store
            .send(
                self.store
                    .http_client
                    .post(url)
                    .query(&[
                        ("valueInputOption", "RAW"),
                        ("insertDataOption", "INSERT_ROWS"),
                    ])
                    .json(&body),
            )
            .await?;

        debug!(sheet = %self.name, "Row appended");
        Ok(())
    }

    async fn data_rows(&self) -> StoreResult<Vec<Row>> {
        self.get_values("A2:Z").await
    }

    async fn replace_data_rows(&self, rows: Vec<Row>) -> StoreResult<()> {
        let url = self.values_url("A2:Z", ":clear")?;
        self.store
            .send(self.store.http_client.post(url).json(&json!({})))
            .await?;

        if rows.is_empty() {
            return Ok(());
        }

        let url = self.values_url("A2", "")?;
        let body = json!({ "values": rows });
        self.store
            .send(
                self.store
                    .http_client
                    .put(url)
                    .query(&[("valueInputOption", "RAW")])
                    .json(&body),
            )
            .await?;

        Ok(())
    }
}

// ###################################
// ->   API TYPES
// ###################################
#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

impl SpreadsheetMeta {
    fn has_sheet(&self, name: &str) -> bool {
        self.sheets.iter().any(|s| s.properties.title == name)
    }
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl ValueRange {
    fn into_rows(self) -> Vec<Row> {
        self.values
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| match cell {
                        Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect()
    }
}
