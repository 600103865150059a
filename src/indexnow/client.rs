use reqwest::{header, Client};
use serde::Serialize;

use super::{IndexNowError, IndexNowResult};

/// Posts url batches to an IndexNow endpoint.
#[derive(Debug)]
pub struct IndexNowClient {
    pub http_client: Client,
    pub endpoint: reqwest::Url,
}

/// What the endpoint answered to an accepted ping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingReport {
    pub status: u16,
    pub body: String,
}

impl IndexNowClient {
    pub fn new<S: AsRef<str>>(endpoint: S) -> IndexNowResult<Self> {
        let endpoint = reqwest::Url::parse(endpoint.as_ref())
            .map_err(|e| IndexNowError::UrlParsing(e.to_string()))?;

        let http_client = Client::builder().build()?;

        Ok(IndexNowClient {
            http_client,
            endpoint,
        })
    }

    /// Sends the payload once. A non-success status is an `IndexNowError::RemoteRejected`
    /// carrying the response body.
    pub async fn ping(&self, payload: &IndexNowPayload<'_>) -> IndexNowResult<PingReport> {
        let resp = self
            .http_client
            .post(self.endpoint.clone())
            .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
            .body(serde_json::to_vec(payload)?)
            .send()
            .await?;

        let status = resp.status();
        // The body is informational only, an unreadable one is logged as empty.
        let body = resp.text().await.unwrap_or_default();

        if status.is_success() {
            Ok(PingReport {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(IndexNowError::RemoteRejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct IndexNowPayload<'a> {
    pub host: &'a str,
    pub key: &'a str,
    pub key_location: &'a str,
    pub url_list: &'a [String],
}
