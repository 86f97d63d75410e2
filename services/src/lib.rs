use crate::catalogue::CatalogueStorage;
use crate::config::Config;
use crate::dashboard::AppState;
use crate::version_info::{RuntimeEnv, format_version_for_runtime_env};
use axum::{
    Router,
    extract::{Extension, Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{any, get},
};
use opentelemetry::{global, propagation::Extractor};
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub mod catalogue;
pub mod config;
pub mod dashboard;
pub mod database;
pub mod grid;
pub mod telemetry;
pub mod version_info;

struct HeaderExtractor<'a>(&'a axum::http::HeaderMap);

impl<'a> Extractor for HeaderExtractor<'a> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Builds the service router over a catalogue storage.
///
/// The grid switches in `config` become the [`grid::TableOptions`] every
/// dashboard request builds its table with.
pub async fn routes<S>(storage: S, config: Config) -> Router
where
    S: CatalogueStorage,
{
    let state = AppState::new(storage, config.table_options());

    Router::new()
        .route("/is-health", get(health_check::<S>))
        .nest(dashboard::PREFIX, dashboard::routes::<S>())
        .fallback(any(catch_all))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let parent_context = global::get_text_map_propagator(|propagator| {
                    propagator.extract(&HeaderExtractor(request.headers()))
                });

                let span = tracing::info_span!(
                    "http_request",
                    http_request.method = ?request.method(),
                    http_request.uri = ?request.uri(),
                    http_request.version = ?request.version(),
                    http_request.user_agent = ?request.headers().get(axum::http::header::USER_AGENT),
                    trace_id = tracing::field::Empty,
                );

                span.set_parent(parent_context);

                span
            }),
        )
        .layer(Extension(config))
        .with_state(state)
}

async fn health_check<S>(
    State(state): State<AppState<S>>,
    Extension(config): Extension<Config>,
) -> impl IntoResponse
where
    S: CatalogueStorage,
{
    let mut response = if state.storage.is_connected().await {
        (StatusCode::OK, "OK").into_response()
    } else {
        (StatusCode::BAD_GATEWAY, "502").into_response()
    };

    let env_value = config.environment().to_string();
    response.headers_mut().insert(
        HeaderName::from_static("x-service-env"),
        HeaderValue::from_str(&env_value).expect("environment header is valid ASCII"),
    );

    let runtime_env: RuntimeEnv = config.environment().into();
    let version_value = format_version_for_runtime_env(runtime_env);
    response.headers_mut().insert(
        HeaderName::from_static("x-service-version"),
        HeaderValue::from_str(&version_value).expect("version header is valid ASCII"),
    );

    response
}

async fn catch_all() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing to see here")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::MockCatalogueStorage;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    async fn send_get(app: Router, uri: &str) -> axum::response::Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_check_connected() {
        let app = routes(MockCatalogueStorage::new(), Config::new_for_test()).await;

        let response = send_get(app, "/is-health").await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_check_disconnected() {
        let app = routes(MockCatalogueStorage::disconnected(), Config::new_for_test()).await;

        let response = send_get(app, "/is-health").await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_health_check_includes_headers() {
        let app = routes(MockCatalogueStorage::new(), Config::new_for_test()).await;

        let response = send_get(app, "/is-health").await;

        let env_header = response
            .headers()
            .get("x-service-env")
            .and_then(|v| v.to_str().ok());
        assert_eq!(env_header, Some("local"));

        let version_header = response
            .headers()
            .get("x-service-version")
            .and_then(|v| v.to_str().ok());
        let expected_version = format_version_for_runtime_env(RuntimeEnv::Local);
        assert_eq!(version_header, Some(expected_version.as_str()));
    }

    #[tokio::test]
    async fn test_unknown_path_falls_through() {
        let app = routes(MockCatalogueStorage::new(), Config::new_for_test()).await;

        let response = send_get(app, "/admin").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_dashboard_requires_token() {
        let app = routes(MockCatalogueStorage::new(), Config::new_for_test()).await;

        let response = send_get(app, "/dashboard/product_table").await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_env_to_runtime_env_conversion() {
        assert_eq!(RuntimeEnv::from(&config::Env::Local), RuntimeEnv::Local);
        assert_eq!(RuntimeEnv::from(&config::Env::Test), RuntimeEnv::Test);
        assert_eq!(RuntimeEnv::from(&config::Env::Prod), RuntimeEnv::Prod);
    }
}
