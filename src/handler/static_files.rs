//! Static file serving module
//!
//! Fallback for non-API paths when `routes.static_dir` is configured, so the
//! service can host its own front end.

use crate::error::ApiError;
use crate::handler::RequestContext;
use crate::http::{self, cache, mime};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Response};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Serve `ctx.path` from `dir`
pub async fn serve(
    ctx: &RequestContext,
    dir: &str,
    index_files: &[String],
) -> Result<Response<Full<Bytes>>, ApiError> {
    if ctx.method != Method::GET && !ctx.is_head() {
        return Err(ApiError::method_not_allowed(ctx.method.clone(), "GET, HEAD"));
    }

    let Some((content, content_type)) = load_from_directory(dir, &ctx.path, index_files).await
    else {
        return Err(ApiError::NotFound(ctx.path.clone()));
    };

    let etag = cache::generate_etag(&content);
    if cache::check_etag_match(ctx.header("if-none-match"), &etag) {
        return Ok(http::build_304_response(&etag));
    }
    Ok(http::build_cached_response(
        Bytes::from(content),
        content_type,
        &etag,
        ctx.is_head(),
    ))
}

/// Load a file below `static_dir`, trying index files for directory paths
///
/// Anything resolving outside the directory is treated as missing.
pub async fn load_from_directory(
    static_dir: &str,
    path: &str,
    index_files: &[String],
) -> Option<(Vec<u8>, &'static str)> {
    let relative_path = path.trim_start_matches('/');
    let mut file_path = Path::new(static_dir).join(relative_path);

    let static_dir_canonical = match fs::canonicalize(static_dir).await {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!(
                "Static directory not found or inaccessible '{static_dir}': {e}"
            ));
            return None;
        }
    };

    if relative_path.is_empty() || relative_path.ends_with('/') || is_dir(&file_path).await {
        file_path = find_index(&file_path, index_files).await?;
    }

    // Missing files are the common 404 case, not worth a log line
    let file_path_canonical = fs::canonicalize(&file_path).await.ok()?;
    if !file_path_canonical.starts_with(&static_dir_canonical) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {} -> {}",
            path,
            file_path_canonical.display()
        ));
        return None;
    }

    let content = match fs::read(&file_path_canonical).await {
        Ok(c) => c,
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {e}",
                file_path.display()
            ));
            return None;
        }
    };

    let content_type = mime::get_content_type(file_path.extension().and_then(|e| e.to_str()));
    Some((content, content_type))
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_dir())
}

async fn find_index(dir: &Path, index_files: &[String]) -> Option<PathBuf> {
    for index_file in index_files {
        let candidate = dir.join(index_file);
        if fs::metadata(&candidate).await.is_ok_and(|m| m.is_file()) {
            return Some(candidate);
        }
    }
    None
}
