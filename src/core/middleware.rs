use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::Span;
use uuid::Uuid;

use crate::core::extractor::SubmittingUser;

/// Header carrying the caller's user id, set by the authenticating gateway
pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");

/// Request ID generator using UUID v7 (time-ordered)
#[derive(Clone, Copy)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Custom MakeSpan that includes request_id in the tracing span
#[derive(Clone, Debug)]
pub struct MakeSpanWithRequestId;

impl<B> tower_http::trace::MakeSpan<B> for MakeSpanWithRequestId {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> Span {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

pub fn cors_layer(allowed_origins: Vec<String>) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    // If origins list contains "*", allow any origin
    if allowed_origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

/// Attach [`SubmittingUser`] when the gateway forwarded a numeric user id.
/// Requests without one pass through anonymously.
pub async fn submitting_user_middleware(mut req: Request, next: Next) -> Response {
    let user_id = req
        .headers()
        .get(&USER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<i64>().ok());

    if let Some(user_id) = user_id {
        req.extensions_mut().insert(SubmittingUser { user_id });
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderValue, routing::get, Router};
    use axum_test::TestServer;

    async fn whoami(user: Option<SubmittingUser>) -> String {
        user.map(|u| u.user_id.to_string())
            .unwrap_or_else(|| "anonymous".to_string())
    }

    fn server() -> TestServer {
        let router = Router::new()
            .route("/whoami", get(whoami))
            .layer(axum::middleware::from_fn(submitting_user_middleware));
        TestServer::new(router).unwrap()
    }

    #[tokio::test]
    async fn test_user_header_becomes_submitting_user() {
        let response = server()
            .get("/whoami")
            .add_header(USER_ID_HEADER, HeaderValue::from_static("7"))
            .await;
        response.assert_text("7");
    }

    #[tokio::test]
    async fn test_missing_or_malformed_header_is_anonymous() {
        let server = server();
        server.get("/whoami").await.assert_text("anonymous");
        server
            .get("/whoami")
            .add_header(USER_ID_HEADER, HeaderValue::from_static("abc"))
            .await
            .assert_text("anonymous");
    }
}
