//! `/api/submit`: accept user submissions

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Response, StatusCode};
use serde::Deserialize;

use super::RequestContext;
use crate::config::AppState;
use crate::error::ApiError;
use crate::http;
use crate::logger::Event;
use crate::model::Submission;
use crate::store::Collection;

pub const PREFIX: &str = "/api/submit";
pub const NAMESPACE: &str = "submissions";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CreateSubmission {
    message: Option<String>,
}

pub async fn handle(ctx: &RequestContext, state: &AppState) -> Result<Response<Full<Bytes>>, ApiError> {
    if ctx.method != Method::POST {
        return Err(ApiError::method_not_allowed(ctx.method.clone(), "POST"));
    }

    let input: CreateSubmission = ctx.json()?;
    let message = input
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::validation("message is required"))?;

    let submission = Submission::new(&message, ctx.origin_ip());
    let seq = Collection::<Submission>::new(state.store.as_ref(), NAMESPACE, state.max_retries())
        .append(&submission)
        .await?;
    state.observer.record(&Event::RecordAppended {
        collection: NAMESPACE,
        id: &submission.id,
        seq,
    });

    Ok(http::json_response(
        StatusCode::OK,
        &serde_json::json!({ "success": true, "id": submission.id }),
    ))
}
