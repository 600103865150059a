use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{
    app::AppState,
    config::StatusMode,
    web::{log, Error, REQUEST_ID_HEADER},
};

/// Turns an `Error` left in the response extensions into the `{ ok: false, error }` body.
///
/// With `StatusMode::Embedded` the HTTP status is always `200 OK` and the real one travels
/// in the `status` field of the body.
pub async fn response_mapper(
    State(app_state): State<AppState>,
    req_method: Method,
    uri: Uri,
    req_headers: HeaderMap,
    resp: Response,
) -> Response {
    let req_id = req_headers
        .get(REQUEST_ID_HEADER)
        .and_then(|id| id.to_str().ok())
        .map(str::to_string);

    let web_error = resp.extensions().get::<Arc<Error>>().map(Arc::as_ref);
    let client_status_and_error = web_error.map(Error::status_code_and_client_error);

    let err_resp = client_status_and_error.as_ref().map(|(status, cl_err)| {
        match app_state.submission_config.status_mode {
            StatusMode::Real => {
                let body = json!({ "ok": false, "error": cl_err.to_string() });
                (*status, Json(body)).into_response()
            }
            StatusMode::Embedded => {
                let body = json!({
                    "ok": false,
                    "status": status.as_u16(),
                    "error": cl_err.to_string(),
                });
                (StatusCode::OK, Json(body)).into_response()
            }
        }
    });

    log::log_request(
        req_id,
        &req_method,
        &uri,
        resp.status(),
        web_error,
        client_status_and_error.as_ref(),
    );

    err_resp.unwrap_or(resp)
}
