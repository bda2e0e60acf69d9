use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use pelagos_core::PelagosError;

#[expect(
    clippy::needless_pass_by_value,
    reason = "handlers naturally own error values from `Result` and pass them through"
)]
pub fn error_response(err: PelagosError, operation: &str, uri: Option<String>) -> Response {
    let status = status_for_error(&err);
    let payload = err.to_payload(operation, uri);
    (status, Json(payload)).into_response()
}

fn status_for_error(err: &PelagosError) -> StatusCode {
    match err {
        PelagosError::InvalidConfig(_)
        | PelagosError::Validation(_)
        | PelagosError::QueryRejected(_)
        | PelagosError::InvalidDataset(_)
        | PelagosError::PathTraversal(_) => StatusCode::BAD_REQUEST,
        PelagosError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        PelagosError::Forbidden(_) => StatusCode::FORBIDDEN,
        PelagosError::NotFound(_) => StatusCode::NOT_FOUND,
        PelagosError::Conflict(_) => StatusCode::CONFLICT,
        PelagosError::LlmUnavailable(_) | PelagosError::LlmProtocol(_) => StatusCode::BAD_GATEWAY,
        PelagosError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
            StatusCode::NOT_FOUND
        }
        PelagosError::Io(_)
        | PelagosError::Json(_)
        | PelagosError::Sqlite(_)
        | PelagosError::Http(_)
        | PelagosError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::status_for_error;
    use axum::http::StatusCode;
    use pelagos_core::PelagosError;

    #[test]
    fn statuses_follow_error_kind() {
        let cases = [
            (
                PelagosError::Validation("empty".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                PelagosError::QueryRejected("DROP TABLE".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                PelagosError::Unauthorized("login".to_string()),
                StatusCode::UNAUTHORIZED,
            ),
            (
                PelagosError::Forbidden("admin".to_string()),
                StatusCode::FORBIDDEN,
            ),
            (
                PelagosError::NotFound("file".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                PelagosError::Conflict("user".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                PelagosError::LlmUnavailable("timeout".to_string()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                PelagosError::Internal("poisoned".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(status_for_error(&err), expected, "{err}");
        }
    }

    #[test]
    fn missing_files_map_to_not_found() {
        let err = PelagosError::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(status_for_error(&err), StatusCode::NOT_FOUND);
    }
}
