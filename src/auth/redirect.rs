//! Working out where to send a user once they have logged in.

use axum::{extract::Request, http::Uri};

use crate::endpoints;

/// Keep only same-site paths, and never loop back to the log-in page.
fn is_local_path(path_and_query: &str) -> bool {
    if !path_and_query.starts_with('/') || path_and_query.starts_with("//") {
        return false;
    }

    let path = path_and_query
        .split_once('?')
        .map_or(path_and_query, |(path, _)| path);

    path != endpoints::LOG_IN_VIEW
}

/// Reduce `raw_url` to a local path and query, or `None` if it points
/// somewhere else.
pub fn normalize_redirect_url(raw_url: &str) -> Option<String> {
    let uri = raw_url.parse::<Uri>().ok()?;

    if uri.scheme().is_some() || uri.authority().is_some() {
        return None;
    }

    let path_and_query = uri.path_and_query()?.as_str();
    is_local_path(path_and_query).then(|| path_and_query.to_owned())
}

/// The log-in page URL with `target` as the page to return to.
pub fn log_in_url_with_redirect(target: &str) -> Option<String> {
    match serde_urlencoded::to_string([("redirect_url", target)]) {
        Ok(query) => Some(format!("{}?{query}", endpoints::LOG_IN_VIEW)),
        Err(error) => {
            tracing::error!("Could not encode redirect URL {target}: {error}");
            None
        }
    }
}

/// The log-in page URL that returns the user to the page behind `request`.
///
/// Page requests return to their own URL. HTMX requests to `/api` return to
/// the page that made them, taken from the `HX-Current-URL` header.
pub fn build_log_in_redirect_url(request: &Request) -> Option<String> {
    let target = if request.uri().path().starts_with("/api") {
        page_behind_hx_request(request)?
    } else {
        normalize_redirect_url(request.uri().path_and_query()?.as_str())?
    };

    log_in_url_with_redirect(&target)
}

fn page_behind_hx_request(request: &Request) -> Option<String> {
    let headers = request.headers();

    let is_hx_request = headers
        .get("hx-request")
        .and_then(|header| header.to_str().ok())
        .is_some_and(|header| header.eq_ignore_ascii_case("true"));

    if !is_hx_request {
        tracing::warn!("Missing HX-Request header for {}", request.uri().path());
        return None;
    }

    let Some(current_url) = headers
        .get("hx-current-url")
        .and_then(|header| header.to_str().ok())
    else {
        tracing::warn!("Missing HX-Current-URL header for {}", request.uri().path());
        return None;
    };

    // HX-Current-URL is absolute, so only the path and query are checked.
    let path_and_query = current_url
        .parse::<Uri>()
        .ok()?
        .path_and_query()?
        .as_str()
        .to_owned();

    if is_local_path(&path_and_query) {
        Some(path_and_query)
    } else {
        tracing::warn!("Ignoring HX-Current-URL {current_url}");
        None
    }
}

#[cfg(test)]
mod redirect_tests {
    use axum::{body::Body, extract::Request};

    use crate::{
        auth::redirect::{build_log_in_redirect_url, normalize_redirect_url},
        endpoints,
    };

    #[test]
    fn keeps_local_paths() {
        assert_eq!(
            normalize_redirect_url("/transactions?month=2025-10"),
            Some("/transactions?month=2025-10".to_owned())
        );
    }

    #[test]
    fn rejects_other_sites_and_log_in_page() {
        for raw in [
            "https://evil.example.com/dashboard",
            "//evil.example.com",
            "dashboard",
            endpoints::LOG_IN_VIEW,
        ] {
            assert_eq!(normalize_redirect_url(raw), None, "{raw} should be rejected");
        }
    }

    #[test]
    fn page_request_returns_to_itself() {
        let request = Request::get("/categories?month=2025-10")
            .body(Body::empty())
            .unwrap();

        let got = build_log_in_redirect_url(&request);

        let query =
            serde_urlencoded::to_string([("redirect_url", "/categories?month=2025-10")]).unwrap();
        assert_eq!(got, Some(format!("{}?{query}", endpoints::LOG_IN_VIEW)));
    }

    #[test]
    fn api_request_returns_to_current_page() {
        let request = Request::get("/api/summary")
            .header("HX-Request", "true")
            .header("HX-Current-URL", "http://localhost:3000/dashboard?month=2025-10")
            .body(Body::empty())
            .unwrap();

        let got = build_log_in_redirect_url(&request);

        let query =
            serde_urlencoded::to_string([("redirect_url", "/dashboard?month=2025-10")]).unwrap();
        assert_eq!(got, Some(format!("{}?{query}", endpoints::LOG_IN_VIEW)));
    }

    #[test]
    fn api_request_without_htmx_headers_has_no_target() {
        let request = Request::get("/api/summary").body(Body::empty()).unwrap();

        assert_eq!(build_log_in_redirect_url(&request), None);
    }
}
