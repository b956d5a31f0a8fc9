pub mod chat_routes;
pub mod translator;

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::routes::chat_routes::{chat_handler, health_handler};
use crate::service::chat_service::ChatService;

pub fn build_router(svc: ChatService) -> Router {
    let cors = cors_layer(svc.config().cors_allow_origin.as_deref());

    Router::new()
        .route("/chat", get(health_handler).post(chat_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(svc)
}

fn cors_layer(allow_origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    match allow_origin {
        None => layer.allow_origin(AllowOrigin::any()),
        Some(origin) => match HeaderValue::from_str(origin) {
            Ok(value) => layer.allow_origin(AllowOrigin::exact(value)),
            Err(e) => {
                warn!("Ignoring invalid CORS_ALLOW_ORIGIN '{origin}': {e}");
                layer
            }
        },
    }
}
