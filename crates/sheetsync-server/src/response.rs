//! Response building: JSON bodies, error bodies, CORS headers

use std::convert::Infallible;

use serde::Serialize;
use serde_json::json;
use sheetsync_core::{ErrorKind, SheetError};
use warp::filters::body::BodyDeserializeError;
use warp::http::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, VARY,
};
use warp::http::StatusCode;
use warp::reject::{LengthRequired, MethodNotAllowed, PayloadTooLarge, UnsupportedMediaType};
use warp::reply::{Reply, Response};
use warp::Rejection;

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "authorization, content-type";

/// HTTP status for an error kind
#[must_use]
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Auth | ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Validation | ErrorKind::Evaluation | ErrorKind::Conflict => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `{"detail": message}` with the given status
#[must_use]
pub fn detail(status: StatusCode, message: &str) -> Response {
    warp::reply::with_status(warp::reply::json(&json!({ "detail": message })), status).into_response()
}

/// Error body for a service error
#[must_use]
pub fn error(err: &SheetError) -> Response {
    let status = status_for(err.kind());
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }
    detail(status, &err.to_string())
}

/// JSON body with the given status
#[must_use]
pub fn json<T: Serialize>(status: StatusCode, body: &T) -> Response {
    warp::reply::with_status(warp::reply::json(body), status).into_response()
}

/// JSON body on success, error body otherwise
#[must_use]
pub fn reply<T: Serialize>(status: StatusCode, result: Result<T, SheetError>) -> Response {
    match result {
        Ok(body) => json(status, &body),
        Err(err) => error(&err),
    }
}

/// Empty response
#[must_use]
pub fn empty(status: StatusCode) -> Response {
    status.into_response()
}

/// Echo the request origin and allow credentials
#[must_use]
pub fn with_cors(origin: Option<String>, mut response: Response) -> Response {
    let Some(origin) = origin.and_then(|origin| HeaderValue::from_str(&origin).ok()) else {
        return response;
    };
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOWED_METHODS));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOWED_HEADERS));
    headers.insert(VARY, HeaderValue::from_static("Origin"));
    response
}

/// Turn warp rejections into `{"detail"}` bodies
pub async fn recover(rejection: Rejection) -> Result<Response, Infallible> {
    let response = if rejection.is_not_found() {
        detail(StatusCode::NOT_FOUND, "Not found.")
    } else if let Some(err) = rejection.find::<BodyDeserializeError>() {
        detail(StatusCode::BAD_REQUEST, &format!("JSON parse error - {err}"))
    } else if rejection.find::<PayloadTooLarge>().is_some() {
        detail(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
    } else if rejection.find::<LengthRequired>().is_some() {
        detail(StatusCode::LENGTH_REQUIRED, "Content-Length header is required")
    } else if rejection.find::<UnsupportedMediaType>().is_some() {
        detail(StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported media type")
    } else if rejection.find::<MethodNotAllowed>().is_some() {
        detail(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed.")
    } else {
        tracing::error!(?rejection, "unhandled rejection");
        detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(status_for(ErrorKind::Auth), StatusCode::FORBIDDEN);
        assert_eq!(status_for(ErrorKind::Authorization), StatusCode::FORBIDDEN);
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::Validation), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::Conflict), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::Internal), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn cors_echoes_origin() {
        let response = with_cors(Some("https://app.example.com".into()), empty(StatusCode::OK));
        let headers = response.headers();
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "https://app.example.com");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }

    #[test]
    fn no_origin_no_cors() {
        let response = with_cors(None, empty(StatusCode::OK));
        assert!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}
