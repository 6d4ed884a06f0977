//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: preflight short-circuit, body
//! limits, route matching, the error boundary and response decoration.

use crate::config::{AppState, RoutesConfig};
use crate::error::ApiError;
use crate::handler::{announcement, forum, static_files, submission, RequestContext};
use crate::http;
use crate::logger::{self, AccessLogEntry, Event};
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::header::CONTENT_LENGTH;
use hyper::{Method, Request, Response, StatusCode, Version};
use std::convert::Infallible;
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Any key works; readiness only needs the read to complete
const READINESS_KEY: &str = "announcement:latest";

/// Main entry point for HTTP request handling
///
/// Never fails: every error becomes a decorated JSON response.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: Option<SocketAddr>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body + Send,
    B::Error: Display,
{
    let started = Instant::now();
    let (parts, body) = req.into_parts();
    let mut ctx = RequestContext::from_parts(parts, peer_addr);

    // Preflight never reaches a handler or the store
    let response = if ctx.method == Method::OPTIONS {
        http::decorate_preflight(http::build_preflight_response(), &state.config.http)
    } else {
        let response = match dispatch(&mut ctx, body, &state).await {
            Ok(response) => response,
            Err(error) => {
                report_error(&ctx, &error, &state);
                error.into_response()
            }
        };
        http::decorate(response, &state.config.http)
    };

    if state.config.logging.access_log {
        log_access(&ctx, &response, started, &state.config.logging.access_log_format);
    }
    Ok(response)
}

async fn dispatch<B>(
    ctx: &mut RequestContext,
    body: B,
    state: &AppState,
) -> Result<Response<Full<Bytes>>, ApiError>
where
    B: Body + Send,
    B::Error: Display,
{
    let max_body_size = state.config.http.max_body_size;
    check_body_size(ctx, max_body_size)?;
    ctx.body = read_body(body, max_body_size).await?;

    route_request(ctx, &state.config.routes, state).await
}

/// Reject a declared `Content-Length` above the limit before reading anything
fn check_body_size(ctx: &RequestContext, max_body_size: u64) -> Result<(), ApiError> {
    let Some(value) = ctx.headers.get(CONTENT_LENGTH) else {
        return Ok(());
    };
    match value.to_str().ok().and_then(|v| v.parse::<u64>().ok()) {
        Some(size) if size > max_body_size => Err(ApiError::PayloadTooLarge {
            limit: max_body_size,
        }),
        Some(_) => Ok(()),
        None => {
            logger::log_warning(&format!(
                "Invalid Content-Length value: {value:?}, skipping size check"
            ));
            Ok(())
        }
    }
}

/// Buffer the body, enforcing the limit for chunked uploads too
async fn read_body<B>(body: B, max_body_size: u64) -> Result<Bytes, ApiError>
where
    B: Body,
    B::Error: Display,
{
    let collected = body
        .collect()
        .await
        .map_err(|e| ApiError::BodyRead(e.to_string()))?
        .to_bytes();

    if collected.len() as u64 > max_body_size {
        return Err(ApiError::PayloadTooLarge {
            limit: max_body_size,
        });
    }
    Ok(collected)
}

/// Route request based on path and configuration
async fn route_request(
    ctx: &RequestContext,
    routes: &RoutesConfig,
    state: &AppState,
) -> Result<Response<Full<Bytes>>, ApiError> {
    // Health check endpoints first, always fast
    if routes.health.enabled {
        let health = &routes.health;
        if ctx.path == health.liveness_path || ctx.path == health.readiness_path {
            if ctx.method != Method::GET && !ctx.is_head() {
                return Err(ApiError::method_not_allowed(ctx.method.clone(), "GET, HEAD"));
            }
            if ctx.path == health.liveness_path {
                return Ok(http::text_response(StatusCode::OK, "ok"));
            }
            return Ok(readiness(state).await);
        }
    }

    let path = ctx.path.as_str();
    if path.starts_with(forum::PREFIX) {
        forum::handle(ctx, state).await
    } else if path.starts_with(announcement::PREFIX) {
        announcement::handle(ctx, state).await
    } else if path.starts_with(submission::PREFIX) {
        submission::handle(ctx, state).await
    } else if let Some(dir) = &routes.static_dir {
        static_files::serve(ctx, dir, &routes.index_files).await
    } else {
        Err(ApiError::NotFound(ctx.path.clone()))
    }
}

/// Ready when the store answers a read
async fn readiness(state: &AppState) -> Response<Full<Bytes>> {
    match state.store.get(READINESS_KEY).await {
        Ok(_) => http::text_response(StatusCode::OK, "ok"),
        Err(e) => {
            state.observer.record(&Event::StoreCheckFailed {
                error: &e.to_string(),
            });
            http::text_response(StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    }
}

fn report_error(ctx: &RequestContext, error: &ApiError, state: &AppState) {
    let message = error.to_string();
    let event = match error {
        ApiError::Validation(_) | ApiError::MalformedBody(_) => Event::ValidationRejected {
            path: &ctx.path,
            reason: &message,
        },
        _ => Event::RequestFailed {
            method: ctx.method.as_str(),
            path: &ctx.path,
            status: error.status().as_u16(),
            error: &message,
        },
    };
    state.observer.record(&event);
}

fn log_access(
    ctx: &RequestContext,
    response: &Response<Full<Bytes>>,
    started: Instant,
    format: &str,
) {
    let remote_addr = ctx
        .peer_addr
        .map_or_else(|| "-".to_string(), |addr| addr.ip().to_string());
    let mut entry = AccessLogEntry::new(remote_addr, ctx.method.to_string(), ctx.path.clone());
    entry.query.clone_from(&ctx.query);
    entry.http_version = version_label(ctx.version).to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = response
        .body()
        .size_hint()
        .exact()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0);
    entry.referer = ctx.header("referer").map(ToString::to_string);
    entry.user_agent = ctx.header("user-agent").map(ToString::to_string);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

    logger::log_access(&entry, format);
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
