//! `/api/forum`: list and create posts

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Response, StatusCode};
use serde::Deserialize;

use super::RequestContext;
use crate::config::AppState;
use crate::error::ApiError;
use crate::http;
use crate::logger::Event;
use crate::model::Post;
use crate::store::Collection;

pub const PREFIX: &str = "/api/forum";
pub const NAMESPACE: &str = "forum_posts";
const ALLOW: &str = "GET, POST";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CreatePost {
    content: Option<String>,
    author: Option<String>,
}

pub async fn handle(ctx: &RequestContext, state: &AppState) -> Result<Response<Full<Bytes>>, ApiError> {
    let posts = Collection::<Post>::new(state.store.as_ref(), NAMESPACE, state.max_retries());

    match ctx.method {
        Method::GET => Ok(http::json_response(StatusCode::OK, &posts.list().await?)),
        Method::POST => {
            let input: CreatePost = ctx.json()?;
            let content = input
                .content
                .filter(|c| !c.is_empty())
                .ok_or_else(|| ApiError::validation("content is required"))?;

            let post = Post::new(content, input.author);
            let seq = posts.append(&post).await?;
            state.observer.record(&Event::RecordAppended {
                collection: NAMESPACE,
                id: &post.id,
                seq,
            });
            Ok(http::json_response(StatusCode::CREATED, &post))
        }
        _ => Err(ApiError::method_not_allowed(ctx.method.clone(), ALLOW)),
    }
}
