//! Rejection responses.
//!
//! Plain-text bodies with standard status codes. Forwarded responses are
//! assembled in the admission gate, not here.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Connection slots exhausted.
pub fn too_many_requests() -> Response {
    (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").into_response()
}

/// Credential token rejected.
pub fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
}

/// Upstream could not be reached or did not answer.
pub fn proxy_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Proxy Error").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::CONTENT_TYPE;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn rejections_are_plain_text() {
        let cases = [
            (too_many_requests(), StatusCode::TOO_MANY_REQUESTS, "Too Many Requests"),
            (unauthorized(), StatusCode::UNAUTHORIZED, "Unauthorized"),
            (proxy_error(), StatusCode::INTERNAL_SERVER_ERROR, "Proxy Error"),
        ];
        for (response, status, text) in cases {
            assert_eq!(response.status(), status);
            assert!(response.headers()[CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/plain"));
            assert_eq!(body_text(response).await, text);
        }
    }
}
