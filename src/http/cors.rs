//! Response decorator
//!
//! Every response leaving the service passes through [`decorate`], success and
//! error paths alike.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{
    HeaderMap, HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, SERVER,
};
use hyper::Response;

use crate::config::HttpConfig;
use crate::logger;

/// Overwrite the cross-origin and `Server` headers, keeping status, body and
/// every other header as produced by the handler
pub fn decorate(response: Response<Full<Bytes>>, http: &HttpConfig) -> Response<Full<Bytes>> {
    let mut response = decorate_preflight(response, http);
    insert_header(response.headers_mut(), SERVER, &http.server_name);
    response
}

/// Cross-origin headers only, for OPTIONS answers
pub fn decorate_preflight(
    mut response: Response<Full<Bytes>>,
    http: &HttpConfig,
) -> Response<Full<Bytes>> {
    let headers = response.headers_mut();
    insert_header(headers, ACCESS_CONTROL_ALLOW_ORIGIN, &http.cors.allow_origin);
    insert_header(headers, ACCESS_CONTROL_ALLOW_METHODS, &http.cors.allow_methods);
    insert_header(headers, ACCESS_CONTROL_ALLOW_HEADERS, &http.cors.allow_headers);
    response
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            headers.insert(name, v);
        }
        Err(_) => logger::log_warning(&format!("Skipping invalid {name} header value: {value:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::http::{build_preflight_response, text_response};
    use hyper::header::CONTENT_TYPE;
    use hyper::StatusCode;

    #[test]
    fn test_decorate_sets_headers_and_keeps_status() {
        let http = Config::defaults().unwrap().http;
        let response = decorate(text_response(StatusCode::NOT_FOUND, "Not Found"), &http);

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_METHODS],
            "GET,POST,PUT,DELETE,OPTIONS"
        );
        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_HEADERS],
            "Content-Type,Authorization,X-Requested-With"
        );
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
    }

    #[test]
    fn test_decorate_overwrites_existing_values() {
        let http = Config::defaults().unwrap().http;
        let mut response = build_preflight_response();
        response
            .headers_mut()
            .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("https://old"));

        let response = decorate(response, &http);
        let origins: Vec<_> = response
            .headers()
            .get_all(ACCESS_CONTROL_ALLOW_ORIGIN)
            .iter()
            .collect();
        assert_eq!(origins, vec!["*"]);
    }

    #[test]
    fn test_preflight_gets_cors_headers_only() {
        let http = Config::defaults().unwrap().http;
        let response = decorate_preflight(build_preflight_response(), &http);

        let mut names: Vec<_> = response.headers().keys().map(HeaderName::as_str).collect();
        names.sort_unstable();
        assert_eq!(
            names,
            [
                "access-control-allow-headers",
                "access-control-allow-methods",
                "access-control-allow-origin",
            ]
        );
        assert!(response.headers().get(SERVER).is_none());
    }
}
