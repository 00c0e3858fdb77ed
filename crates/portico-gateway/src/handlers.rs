//! Request handlers: direct forwarding and composite aggregation

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::aggregate::CompositeRequest;
use crate::error::ApiError;
use crate::routes::{CompositeRoute, DirectRoute, RouteMatch};
use crate::state::AppState;

/// Forwarded bodies larger than this are rejected up front.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Serialize)]
pub struct RoutesResponse {
    pub direct: Vec<DirectRoute>,
    pub composite: Vec<CompositeRoute>,
}

/// GET /routes
/// Read-only view of the configured route table
pub async fn list_routes(State(state): State<AppState>) -> Json<RoutesResponse> {
    Json(RoutesResponse {
        direct: state.routes().direct_routes().to_vec(),
        composite: state.routes().composite_routes().to_vec(),
    })
}

/// Fallback handler: every non-reserved path is routed downstream.
///
/// Only the path is inspected for routing; method, query, and body are
/// carried through to the downstream call on direct routes.
pub async fn forward(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let path = parts.uri.path().to_string();

    match state.routes().route(&path)? {
        RouteMatch::Direct {
            service,
            path: forward_path,
        } => {
            let forward_path = match parts.uri.query() {
                Some(query) => format!("{}?{}", forward_path, query),
                None => forward_path,
            };
            debug!(%path, service = %service, forward = %forward_path, "Forwarding direct route");

            let body = to_bytes(body, MAX_BODY_BYTES)
                .await
                .map_err(|e| ApiError::BadRequest(format!("Unreadable request body: {}", e)))?;
            let content_type = parts.headers.get(header::CONTENT_TYPE).cloned();

            let connection = state.cache().get(&service).await?;
            let downstream = match connection
                .send(
                    parts.method,
                    &forward_path,
                    content_type,
                    if body.is_empty() { None } else { Some(body) },
                )
                .await
            {
                Ok(downstream) => downstream,
                Err(err) => {
                    // Stale-connection self-healing: evict so the next
                    // request re-resolves, then surface the failure.
                    state.cache().invalidate(&service).await;
                    return Err(err.into());
                }
            };

            // Pass-through: downstream status, content type, and body
            // reach the caller unchanged, errors included.
            let mut response = Response::builder().status(downstream.status);
            if let Some(value) = downstream.content_type {
                response = response.header(header::CONTENT_TYPE, value);
            }
            response
                .body(Body::from(downstream.body))
                .map_err(|e| ApiError::Internal(e.to_string()))
        }
        RouteMatch::Composite { entries } => {
            debug!(%path, entries = entries.len(), "Dispatching composite route");
            let result = state
                .aggregator()
                .aggregate(CompositeRequest { entries })
                .await;

            if result.is_success() {
                return Ok((StatusCode::OK, Json(result.into_body())).into_response());
            }

            // All-or-nothing policy: any failed entry fails the whole
            // response, listing every error; successful payloads are
            // withheld.
            let mut errors = Map::new();
            for (service, message) in result.errors() {
                errors.insert(service.to_string(), Value::String(message.to_string()));
            }
            let body = serde_json::json!({
                "error": "aggregate_failure",
                "message": "One or more downstream calls failed",
                "errors": errors,
            });
            Ok((StatusCode::BAD_GATEWAY, Json(body)).into_response())
        }
    }
}
