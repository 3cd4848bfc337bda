//! Panic recovery.
//!
//! A panicking handler is a bug; the proxy still needs an answer. The
//! layer converts the panic to a 500 with a generic JSON body and counts
//! it.

use axum::body::Body;
use http::{Response, StatusCode, header};
use tower_http::catch_panic::CatchPanicLayer;

use crate::observability::metrics;

type PanicHandler = fn(Box<dyn std::any::Any + Send + 'static>) -> Response<Body>;

pub fn catch_panic_layer() -> CatchPanicLayer<PanicHandler> {
    CatchPanicLayer::custom(handle_panic as PanicHandler)
}

fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };

    tracing::error!(panic = %detail, "handler panicked");
    metrics::record_panic();

    let body = serde_json::json!({
        "error": "Internal server error",
        "timestamp": chrono::Utc::now().timestamp(),
    });

    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("static response must build")
}

#[cfg(test)]
mod tests {
    use axum::{Router, routing::get};
    use http::Request;
    use tower::ServiceExt;

    use super::*;

    async fn boom_handler() -> StatusCode {
        panic!("kaboom")
    }

    #[tokio::test]
    async fn panic_becomes_500_json() {
        let app = Router::new()
            .route("/boom", get(boom_handler))
            .layer(catch_panic_layer());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/boom")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
