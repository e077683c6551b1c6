use super::{ApiError, AppState};
use crate::analysis::{AnalysisOptions, AnalysisOutput, ReportFormat};
use crate::chunk::RangedChunkProvider;
use crate::context::RequestContext;
use crate::proxy::{self, ProxyMethod, ProxyRequest};
use crate::resolver;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

/// Caller label for logs: first `X-Forwarded-For` entry, if any.
fn request_context(headers: &HeaderMap) -> RequestContext {
    let client = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    RequestContext::new(client)
}

fn require_url(url: Option<String>) -> Result<String, ApiError> {
    url.map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing url parameter"))
}

#[derive(Debug, Deserialize)]
pub(super) struct InfoQuery {
    url: Option<String>,
}

/// `GET /info?url=` → `{filename, size, type}`.
pub(super) async fn info(
    State(app): State<AppState>,
    Query(q): Query<InfoQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let url = require_url(q.url)?;
    let ctx = request_context(&headers);
    let desc = resolver::resolve(&url, app.policy(), &app.config().http, &ctx).await?;
    tracing::info!(
        "{} info {} -> {} ({:?} bytes, {:?})",
        ctx,
        url,
        desc.filename,
        desc.total_size,
        desc.content_type
    );
    let body = json!({
        "filename": desc.filename,
        "size": desc.total_size.unwrap_or(0),
        "type": desc.content_type,
    });
    let cache = format!("public, max-age={}", app.config().info_cache_secs);
    Ok(([(header::CACHE_CONTROL, cache)], Json(body)).into_response())
}

#[derive(Debug, Deserialize)]
pub(super) struct AnalyzeQuery {
    url: Option<String>,
    format: Option<String>,
    #[serde(default)]
    cover: bool,
    #[serde(default)]
    full: bool,
}

/// `GET /resource/analyze?url=&format=` → `{results: {<format>: payload}}`.
pub(super) async fn analyze(
    State(app): State<AppState>,
    Query(q): Query<AnalyzeQuery>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let url = require_url(q.url)?;
    let format = match q.format.as_deref() {
        Some(f) if !f.trim().is_empty() => f.parse::<ReportFormat>()?,
        _ => ReportFormat::default(),
    };
    let ctx = request_context(&headers);
    let config = app.config();
    let desc = resolver::resolve(&url, app.policy(), &config.http, &ctx).await?;

    let options = AnalysisOptions {
        chunk_size: config.analysis.chunk_size,
        cover_data: q.cover,
        format,
        full_detail: q.full,
    };
    let source = RangedChunkProvider::new(
        desc.canonical_url,
        desc.total_size,
        options.chunk_size,
        config.http.clone(),
    );
    let report = app.new_driver().run(&source, &options, &ctx).await?;
    tracing::info!(
        "{} analyzed {} in {} requests ({} bytes)",
        ctx,
        url,
        report.stats.requests,
        report.stats.bytes_fetched
    );
    let payload = match report.output {
        AnalysisOutput::Structured(v) => v,
        AnalysisOutput::Text(t) => Value::String(t),
    };
    let mut results = serde_json::Map::new();
    results.insert(format.as_str().to_string(), payload);
    Ok(Json(json!({ "results": results })))
}

pub(super) async fn proxy_get(
    State(app): State<AppState>,
    Path((target, filename)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    relay(app, &target, filename, &headers, ProxyMethod::Get).await
}

pub(super) async fn proxy_head(
    State(app): State<AppState>,
    Path((target, filename)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    relay(app, &target, filename, &headers, ProxyMethod::Head).await
}

/// CORS preflight.
pub(super) async fn proxy_options() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    apply_headers(response.headers_mut(), &proxy::service_headers());
    response
}

async fn relay(
    app: AppState,
    target: &str,
    filename: String,
    headers: &HeaderMap,
    method: ProxyMethod,
) -> Result<Response, ApiError> {
    let url = proxy::decode_target(target)?;
    let ctx = request_context(headers);
    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|r| r.starts_with("bytes="))
        .map(str::to_string);
    let request = ProxyRequest {
        method,
        range,
        filename,
    };
    let upstream = proxy::stream(
        &url,
        &request,
        app.policy(),
        &app.config().http,
        &ctx,
        app.events(),
    )
    .await?;

    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let body = match method {
        ProxyMethod::Get => Body::from_stream(upstream.body),
        ProxyMethod::Head => Body::empty(),
    };
    let mut response = (status, body).into_response();
    apply_headers(response.headers_mut(), &upstream.headers);
    Ok(response)
}

fn apply_headers(map: &mut HeaderMap, headers: &[(&'static str, String)]) {
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => tracing::debug!("dropping unrepresentable {} header", name),
        }
    }
}
