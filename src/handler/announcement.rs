//! `/api/announcement`: read and overwrite the site announcement
//!
//! Content and timestamp live under two plain-text keys. The timestamp is
//! written first; concurrent writers may interleave the pair (last write wins
//! per key).

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Response, StatusCode};
use serde::Deserialize;

use super::RequestContext;
use crate::config::AppState;
use crate::error::ApiError;
use crate::http;
use crate::logger::Event;
use crate::model::{self, Announcement, NO_ANNOUNCEMENT};

pub const PREFIX: &str = "/api/announcement";
const CONTENT_KEY: &str = "announcement:latest";
const UPDATED_AT_KEY: &str = "announcement:updatedAt";
const ALLOW: &str = "GET, POST";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SetAnnouncement {
    content: Option<String>,
}

pub async fn handle(ctx: &RequestContext, state: &AppState) -> Result<Response<Full<Bytes>>, ApiError> {
    match ctx.method {
        Method::GET => {
            let store = state.store.as_ref();
            let announcement = Announcement {
                content: store
                    .get(CONTENT_KEY)
                    .await?
                    .unwrap_or_else(|| NO_ANNOUNCEMENT.to_string()),
                updated_at: store.get(UPDATED_AT_KEY).await?,
            };
            Ok(http::json_response(StatusCode::OK, &announcement))
        }
        Method::POST => {
            let input: SetAnnouncement = ctx.json()?;
            let content = input
                .content
                .filter(|c| !c.is_empty())
                .ok_or_else(|| ApiError::validation("content is required"))?;

            // Timestamp first: a failed update must never publish new content
            let updated_at = model::now_iso8601();
            state.store.put(UPDATED_AT_KEY, updated_at.clone()).await?;
            state.store.put(CONTENT_KEY, content.clone()).await?;

            state.observer.record(&Event::AnnouncementUpdated {
                updated_at: &updated_at,
                length: content.chars().count(),
            });
            Ok(http::json_response(
                StatusCode::OK,
                &Announcement {
                    content,
                    updated_at: Some(updated_at),
                },
            ))
        }
        _ => Err(ApiError::method_not_allowed(ctx.method.clone(), ALLOW)),
    }
}
