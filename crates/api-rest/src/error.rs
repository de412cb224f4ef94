//! Mapping from core errors to HTTP responses.

use api_shared::ActionRes;
use axum::http::StatusCode;
use axum::Json;
use patchlist_core::PatchError;

/// Error half of every handler result.
pub type ApiFailure = (StatusCode, Json<ActionRes>);

/// - unknown filename: `404 {success:false}`
/// - bad request data: `400 {success:false, error}`
/// - anything else: `500 {success:false, error}`
pub fn failure(err: PatchError) -> ApiFailure {
    match &err {
        PatchError::NotFound(name) => {
            tracing::debug!("no record for {:?}", name);
            (
                StatusCode::NOT_FOUND,
                Json(ActionRes {
                    success: false,
                    error: None,
                }),
            )
        }
        e if e.is_client_error() => (StatusCode::BAD_REQUEST, Json(ActionRes::failed(e.to_string()))),
        e => {
            tracing::error!("request failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ActionRes::failed(e.to_string())),
            )
        }
    }
}

pub fn bad_request(message: impl Into<String>) -> ApiFailure {
    (StatusCode::BAD_REQUEST, Json(ActionRes::failed(message)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchlist_core::SafeFilename;

    #[test]
    fn test_status_codes() {
        let (status, Json(body)) = failure(PatchError::NotFound("a.bin".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, None);

        let invalid = SafeFilename::new("..").unwrap_err();
        let (status, _) = failure(invalid.into());
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, Json(body)) = failure(PatchError::Task("panicked".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.success);
        assert!(body.error.unwrap().contains("panicked"));
    }
}
