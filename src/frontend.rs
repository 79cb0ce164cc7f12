//! ==============================================================================
//! frontend.rs - pre-built web app serving
//! ==============================================================================
//!
//! purpose:
//!     serves the front-end bundle produced by an external build step.
//!     installed as the router fallback, so every path the api does not own
//!     lands here.
//!
//! resolution order:
//!     existing file          -> that file (ServeDir: decoding, traversal, `/` -> index.html)
//!     /                      -> 503 if the build is missing
//!     other non-api path     -> index.html (client-side routing)
//!     api/* or assets/*      -> 404 json
//!
//! ==============================================================================

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};

use crate::api::AppState;
use crate::error::ApiError;

const INDEX: &str = "index.html";

/// prefixes that never fall back to the single-page entry document
const NO_FALLBACK_PREFIXES: [&str; 2] = ["api/", "assets/"];

pub async fn serve_frontend(State(state): State<AppState>, req: Request) -> Response {
    let dist = state.dist_dir.as_path();
    let path = req.uri().path().trim_start_matches('/').to_string();
    let method = req.method().clone();
    let headers = req.headers().clone();

    // ServeDir decodes the path, rejects traversal and answers `/` with index.html
    let res = match ServeDir::new(dist).oneshot(req).await {
        Ok(res) => res,
        Err(never) => match never {},
    };
    if !matches!(res.status(), StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED) {
        return res.into_response();
    }

    if path.is_empty() {
        return ApiError::FrontendMissing(dist.display().to_string()).into_response();
    }
    if NO_FALLBACK_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return ApiError::NotFound(path).into_response();
    }

    // client-side route
    let mut index_req = Request::new(Body::empty());
    *index_req.method_mut() = method;
    *index_req.headers_mut() = headers;
    let res = match ServeFile::new(dist.join(INDEX)).oneshot(index_req).await {
        Ok(res) => res,
        Err(never) => match never {},
    };
    if res.status() == StatusCode::NOT_FOUND {
        return ApiError::NotFound(path).into_response();
    }
    res.into_response()
}
