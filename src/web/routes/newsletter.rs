use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::{
    app::AppState,
    lock::LockGuard,
    store::{self, Row},
    web::{
        types::{
            parse_body, Ack, StoredRow, ValidSubmission, DEDUPE_KEY_COLUMNS, STORE_HEADERS,
        },
        Error, WebResult,
    },
};

/// Validates a newsletter signup and appends it to the sheet of the requested store.
#[tracing::instrument(name = "Appending a newsletter signup", skip_all)]
pub async fn submit(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> WebResult<Json<Ack>> {
    let body = body?;
    let submission: ValidSubmission = parse_body(&headers, &body)?.try_into()?;
    let row = StoredRow::compose(&submission, Utc::now());
    info!("{:<20} - store: {}", "submit", submission.store_id);
    debug!("{:<20} - email: {}", "submit", submission.email.as_ref());

    let _guard = acquire_store_lock(&app_state).await?;
    append_submission(&app_state, &submission.store_id, row.into_values()).await?;

    Ok(Json(Ack::ok(app_state.submission_config.status_mode)))
}

/// CORS preflight, the headers are added by the server layers.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Waits for the store lock. When the wait expires the request either proceeds without the
/// lock or fails, depending on `strict_lock`.
async fn acquire_store_lock(app_state: &AppState) -> WebResult<Option<LockGuard>> {
    let config = &app_state.submission_config;
    let guard = app_state.lock.try_acquire(config.lock_timeout()).await;

    match guard {
        Some(guard) => {
            debug!("{:<20} - Acquired", "lock");
            Ok(Some(guard))
        }
        None if config.strict_lock => Err(Error::LockTimeout),
        None => {
            warn!(
                "{:<20} - Timed out after {:?}, proceeding without the lock",
                "lock",
                config.lock_timeout()
            );
            Ok(None)
        }
    }
}

async fn append_submission(app_state: &AppState, store_id: &str, row: Row) -> WebResult<()> {
    let config = &app_state.submission_config;
    let table = app_state.store.open(store_id, &config.sheet_name).await?;

    if table.ensure_header(&STORE_HEADERS).await? {
        info!("{:<20} - Wrote header to '{}'", "append", table.name());
    }
    table.append_row(row).await?;

    if config.dedupe {
        store::dedupe_table(table.as_ref(), &DEDUPE_KEY_COLUMNS).await?;
    }

    Ok(())
}
