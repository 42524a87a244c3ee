// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers and routing for the export service.
//!
//! `/export` sits behind URL validation and then the rate limiting
//! middleware, so only well-formed requests spend tokens. The CSV body is
//! produced by a spawned task and streamed to the client, so once the
//! status line is sent a failure can only truncate the body.

use crate::config::Config;
use crate::error::{ExportError, InitError};
use crate::exporter::CsvExporter;
use crate::fetcher::FeedFetcher;
use crate::limiter::RateLimiter;
use crate::metrics::Metrics;
use crate::middleware::{rate_limit, validate_target, ClientIdentity, FeedTarget};
use crate::validator::UrlValidator;
use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    middleware::from_fn_with_state,
    response::{Html, IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Chunks buffered between the CSV task and the response body.
const STREAM_BUFFER: usize = 16;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>RSS to CSV Exporter</title>
</head>
<body>
  <h1>RSS to CSV Exporter</h1>
  <form action="/export" method="get">
    <label for="url">Feed URL</label>
    <input type="url" id="url" name="url" placeholder="https://example.com/feed.xml" required>
    <label><input type="checkbox" name="sanitize" value="true"> Strip HTML</label>
    <button type="submit">Export CSV</button>
  </form>
</body>
</html>
"#;

/// Shared application state.
pub struct AppState {
    pub limiter: Arc<RateLimiter>,
    pub validator: UrlValidator,
    pub fetcher: FeedFetcher,
    pub exporter: CsvExporter,
    pub metrics: Metrics,
    pub config: Config,
}

impl AppState {
    /// Build every collaborator from configuration.
    pub fn new(config: Config) -> Result<Self, InitError> {
        Ok(Self {
            limiter: Arc::new(RateLimiter::new(config.rate_limit.clone())),
            validator: UrlValidator::new(config.validation.clone()),
            fetcher: FeedFetcher::new(&config.fetch)?,
            exporter: CsvExporter::default(),
            metrics: Metrics::new()?,
            config,
        })
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Query parameters of `/export`.
#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub sanitize: Option<String>,
}

impl ExportParams {
    /// Only the literal `true` enables stripping; an absent parameter
    /// defers to `default`.
    pub fn sanitize_or(&self, default: bool) -> bool {
        match self.sanitize.as_deref() {
            Some(value) => value == "true",
            None => default,
        }
    }
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let export_routes = Router::new()
        .route("/export", get(export))
        .route_layer(from_fn_with_state(state.clone(), rate_limit))
        // Added last, so it runs first.
        .route_layer(from_fn_with_state(state.clone(), validate_target));

    let mut app = Router::new()
        .merge(export_routes)
        .route("/", get(index))
        .route("/health", get(health))
        .route("/healthz", get(health));

    if state.config.metrics.enabled {
        app = app.route(&state.config.metrics.path, get(metrics));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .with_state(state)
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "rss-csv-exporter",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Landing page with the export form.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Fetch a validated feed and stream it back as CSV.
pub async fn export(
    State(state): State<Arc<AppState>>,
    Extension(FeedTarget(url)): Extension<FeedTarget>,
    client: Option<Extension<ClientIdentity>>,
    headers: HeaderMap,
    Query(params): Query<ExportParams>,
) -> Result<Response, ExportError> {
    let client = client
        .map(|Extension(ClientIdentity(id))| id)
        .unwrap_or_else(|| "unknown".to_string());

    let sanitize = params.sanitize_or(state.config.export.default_sanitize);

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    info!(url = %url, client = %client, user_agent, "Fetching feed");

    let started = Instant::now();
    let fetched = state.fetcher.fetch(&url).await;
    state.metrics.observe_fetch(started.elapsed().as_secs_f64());

    let feed = match fetched {
        Ok(feed) => feed,
        Err(e) => return Err(reject(&state, e, url.as_str(), &client)),
    };

    info!(
        url = %url,
        client = %client,
        items = feed.items.len(),
        sanitize,
        "Parsed feed"
    );

    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    let write_timeout = state.config.server.write_timeout();
    let task_state = state.clone();

    tokio::spawn(async move {
        let result = task_state
            .exporter
            .export_to_channel(&tx, &feed.items, sanitize, write_timeout)
            .await;

        match result {
            Ok(rows) => {
                task_state.metrics.record_export(rows);
                info!(url = %url, client = %client, rows, "CSV export completed");
            }
            Err(e) => {
                task_state.metrics.record_export_failure(&e);
                error!(url = %url, client = %client, error = %e, "Failed to export CSV");
            }
        }
    });

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=feed.csv"),
        ],
        Body::from_stream(ReceiverStream::new(rx)),
    )
        .into_response())
}

/// Log and count a fetch or parse failure before it becomes a response.
fn reject(state: &AppState, err: ExportError, url: &str, client: &str) -> ExportError {
    error!(url, client, error = %err, kind = err.kind(), "Failed to fetch or parse feed");
    state.metrics.record_export_failure(&err);
    err
}
