//! HTTP surface of the journal service.

pub mod envelope;
pub mod handlers;
pub mod state;

use crate::cli::globals::GlobalArgs;
use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post},
    Extension, Router,
};
use self::state::AppState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::posts::list,
        handlers::posts::create,
        handlers::stats::stats,
        handlers::refresh::refresh,
        handlers::weather::weather,
        handlers::location::location,
    ),
    components(schemas(
        handlers::posts::Pagination,
        handlers::posts::PostsPage,
        handlers::posts::CreatePost,
        handlers::stats::UserStats,
        handlers::refresh::RefreshRequest,
        handlers::refresh::RefreshedSession,
        handlers::weather::Point,
        handlers::weather::WeatherDetails,
        handlers::weather::WeatherReport,
        handlers::location::LocationReport,
    )),
    tags(
        (name = "posts", description = "Journal posts"),
        (name = "users", description = "Profile statistics"),
        (name = "auth", description = "Session refresh"),
        (name = "proxies", description = "Weather and geocoding proxies"),
        (name = "health", description = "Service health")
    )
)]
struct ApiDoc;

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, globals: &GlobalArgs) -> Result<()> {
    let state = Arc::new(AppState::from_globals(globals)?);

    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Build the application router; separated from [`new`] so tests can drive
/// the routes against an ephemeral listener.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any);

    Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/api/posts",
            get(handlers::posts::list).post(handlers::posts::create),
        )
        .route("/api/users/stats", get(handlers::stats::stats))
        .route("/api/auth/refresh", post(handlers::refresh::refresh))
        .route("/api/weather", get(handlers::weather::weather))
        .route("/api/location", get(handlers::location::location))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(state)),
        )
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
