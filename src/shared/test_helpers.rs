use axum::{extract::Request, middleware::Next, response::Response, Router};

use crate::core::extractor::SubmittingUser;

pub const TEST_USER_ID: i64 = 42;

async fn inject_submitting_user_middleware(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(SubmittingUser {
        user_id: TEST_USER_ID,
    });
    next.run(request).await
}

/// Wrap a router so every request carries [`TEST_USER_ID`] as its submitter
pub fn with_submitting_user(router: Router) -> Router {
    router.layer(axum::middleware::from_fn(inject_submitting_user_middleware))
}
