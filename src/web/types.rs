//! Most of the structs in `web` module and their implementations live here.
//! Includes the untrusted submission body, its validation and the row composed from it.

use axum::http::{header, HeaderMap};
use chrono::{DateTime, SecondsFormat, Utc};
use lazy_regex::regex_is_match;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{config::StatusMode, store::Row};

/// Column order of every stored row.
pub const STORE_HEADERS: [&str; 6] = ["timestamp", "email", "page", "lang", "utm_source", "consent"];

/// Dedupe key: `(email, lang)`.
pub const DEDUPE_KEY_COLUMNS: [usize; 2] = [1, 3];

pub const DEFAULT_CONSENT: &str = "newsletter";

// ###################################
// ->   STRUCTS
// ###################################
/// Deserializable submission body `{ storeId, record }`.
/// Every field is optional so missing data can be reported with a precise message.
#[derive(Debug, Deserialize)]
pub struct DeserSubmission {
    #[serde(
        default,
        rename = "storeId",
        alias = "sheetId",
        deserialize_with = "lenient_string"
    )]
    pub store_id: Option<String>,
    #[serde(default)]
    pub record: Option<DeserRecord>,
}

/// The signup as sent by the website form.
#[derive(Debug, Default, Deserialize)]
pub struct DeserRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub page: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub lang: Option<String>,
    /// `{ utm_source, utm_medium, .. }`, only `utm_source` is stored.
    #[serde(default)]
    pub utm: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub consent: Option<String>,
}

/// A submission with a store id and a syntactically valid email.
#[derive(Debug)]
pub struct ValidSubmission {
    pub store_id: String,
    pub email: ValidEmail,
    pub record: DeserRecord,
}

impl TryFrom<DeserSubmission> for ValidSubmission {
    type Error = DataParsingError;

    fn try_from(deser: DeserSubmission) -> Result<Self, Self::Error> {
        let store_id = deser.store_id.filter(|id| !id.is_empty());
        let record = deser.record.filter(|record| {
            record
                .email
                .as_deref()
                .is_some_and(|email| !email.is_empty())
        });

        let (Some(store_id), Some(record)) = (store_id, record) else {
            return Err(DataParsingError::MissingFields);
        };
        let email = ValidEmail::parse(record.email.as_deref().unwrap_or_default())?;

        Ok(ValidSubmission {
            store_id,
            email,
            record,
        })
    }
}

/// Validated email, trimmed and lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidEmail(String);

impl AsRef<str> for ValidEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl ValidEmail {
    /// Accepts `local@domain.tld`: no whitespace, a single `@`, at least one `.` after it.
    pub fn parse<S>(value: S) -> Result<Self, DataParsingError>
    where
        S: AsRef<str>,
    {
        let value = value.as_ref().trim();

        if regex_is_match!(r"^[^\s@]+@[^\s@]+\.[^\s@]+$", value) {
            Ok(ValidEmail(value.to_lowercase()))
        } else {
            Err(DataParsingError::EmailInvalid)
        }
    }
}

/// One row of the newsletter sheet, in `STORE_HEADERS` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
    pub timestamp: String,
    pub email: String,
    pub page: String,
    pub lang: String,
    pub utm_source: String,
    pub consent: String,
}

impl StoredRow {
    /// Missing or empty values fall back to `now` for the timestamp, to `"newsletter"` for the
    /// consent and to the empty string for everything else.
    pub fn compose(submission: &ValidSubmission, now: DateTime<Utc>) -> Self {
        let record = &submission.record;
        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());

        StoredRow {
            timestamp: non_empty(&record.timestamp)
                .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Millis, true)),
            email: submission.email.as_ref().to_string(),
            page: record.page.clone().unwrap_or_default(),
            lang: record.lang.clone().unwrap_or_default(),
            utm_source: record
                .utm
                .as_ref()
                .and_then(|utm| utm.get("utm_source"))
                .and_then(value_to_string)
                .unwrap_or_default(),
            consent: non_empty(&record.consent).unwrap_or_else(|| DEFAULT_CONSENT.to_string()),
        }
    }

    pub fn into_values(self) -> Row {
        vec![
            self.timestamp,
            self.email,
            self.page,
            self.lang,
            self.utm_source,
            self.consent,
        ]
    }
}

/// Successful submission body.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl Ack {
    pub fn ok(status_mode: StatusMode) -> Self {
        Ack {
            ok: true,
            status: matches!(status_mode, StatusMode::Embedded).then_some(200),
        }
    }
}

// ###################################
// ->   PARSING
// ###################################
/// Checks the body is present and declared as JSON, then deserializes it.
pub fn parse_body(headers: &HeaderMap, body: &[u8]) -> Result<DeserSubmission, DataParsingError> {
    if body.is_empty() {
        return Err(DataParsingError::EmptyBody);
    }

    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"));
    if !is_json {
        return Err(DataParsingError::ContentType);
    }

    serde_json::from_slice(body).map_err(|er| DataParsingError::InvalidJson(er.to_string()))
}

/// Strings stay as they are, other scalars are stringified, `null` and `false` count as absent.
fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_string))
}

// ###################################
// ->   ERROR
// ###################################
#[derive(Debug, thiserror::Error)]
pub enum DataParsingError {
    #[error("Empty body")]
    EmptyBody,
    #[error("Content-Type must be application/json")]
    ContentType,
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
    #[error("Missing storeId or record.email")]
    MissingFields,
    #[error("Invalid email")]
    EmailInvalid,
}
