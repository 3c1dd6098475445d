use std::{collections::HashMap, sync::Arc, time::Duration, time::Instant};

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use serde::Serialize;

use crate::state::AppState;

/// Request counters keyed by route template, so ids in paths do not
/// multiply the key space.
pub async fn metrics_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let start = Instant::now();
    let response = next.run(req).await;
    state
        .metrics
        .record(&route, response.status(), start.elapsed())
        .await;
    response
}

#[derive(Clone, Default)]
pub struct GatewayMetrics {
    inner: Arc<tokio::sync::Mutex<MetricsInner>>,
}

#[derive(Default)]
struct MetricsInner {
    total_requests: u64,
    total_errors: u64,
    routes: HashMap<String, RouteStats>,
}

#[derive(Default)]
struct RouteStats {
    request_count: u64,
    error_count: u64,
    total_latency_ms: u64,
}

impl GatewayMetrics {
    pub async fn record(&self, route: &str, status: StatusCode, latency: Duration) {
        let failed = status.is_client_error() || status.is_server_error();
        let mut inner = self.inner.lock().await;
        inner.total_requests += 1;
        if failed {
            inner.total_errors += 1;
        }
        let stats = inner.routes.entry(route.to_string()).or_default();
        stats.request_count += 1;
        if failed {
            stats.error_count += 1;
        }
        stats.total_latency_ms += u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
    }

    pub async fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.lock().await;
        let mut routes: Vec<RouteMetrics> = inner
            .routes
            .iter()
            .map(|(route, stats)| RouteMetrics {
                route: route.clone(),
                requests: stats.request_count,
                errors: stats.error_count,
                avg_latency_ms: (stats.request_count > 0)
                    .then(|| stats.total_latency_ms as f64 / stats.request_count as f64),
            })
            .collect();
        routes.sort_by(|a, b| a.route.cmp(&b.route));
        MetricsSnapshot {
            total_requests: inner.total_requests,
            total_errors: inner.total_errors,
            routes,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_errors: u64,
    pub routes: Vec<RouteMetrics>,
}

#[derive(Debug, Serialize)]
pub struct RouteMetrics {
    pub route: String,
    pub requests: u64,
    pub errors: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_latency_ms: Option<f64>,
}
