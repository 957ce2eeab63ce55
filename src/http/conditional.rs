use hyper::HeaderMap;
use hyper::header::{CACHE_CONTROL, ETAG, HeaderValue, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};

use crate::file::file_record::LoadedFile;
use crate::logging::syslog::trace;

/// Sets `Last-Modified` and, when the content hash is known, a quoted `ETag`.
pub fn set_validators(headers: &mut HeaderMap, loaded: &LoadedFile) {
    let last_modified = httpdate::fmt_http_date(loaded.modified_at);
    if let Ok(value) = HeaderValue::from_str(&last_modified) {
        headers.insert(LAST_MODIFIED, value);
    }

    if let Some(content_hash) = &loaded.content_hash {
        if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", content_hash)) {
            headers.insert(ETAG, value);
        }
    }
}

/// Whether the client's cached copy is still valid, judged from the request
/// validators against the validators already set on the response.
///
/// A request without validators, or one sending `Cache-Control: no-cache`,
/// is never fresh. Every validator present must match.
pub fn is_fresh(request_headers: &HeaderMap, response_headers: &HeaderMap) -> bool {
    let modified_since = header_str(request_headers, IF_MODIFIED_SINCE);
    let none_match = header_str(request_headers, IF_NONE_MATCH);
    if modified_since.is_none() && none_match.is_none() {
        return false;
    }

    if let Some(cache_control) = header_str(request_headers, CACHE_CONTROL) {
        if has_no_cache_directive(cache_control) {
            trace("Request sent Cache-Control: no-cache, skipping freshness check");
            return false;
        }
    }

    if let Some(none_match) = none_match {
        if none_match.trim() != "*" {
            let Some(etag) = header_str(response_headers, ETAG) else {
                return false;
            };
            if !etag_list_matches(none_match, etag) {
                return false;
            }
        }
    }

    if let Some(modified_since) = modified_since {
        let last_modified = header_str(response_headers, LAST_MODIFIED).and_then(|v| httpdate::parse_http_date(v).ok());
        let modified_since = httpdate::parse_http_date(modified_since).ok();
        match (last_modified, modified_since) {
            (Some(last_modified), Some(modified_since)) if last_modified <= modified_since => {}
            _ => return false,
        }
    }

    true
}

fn header_str(headers: &HeaderMap, name: hyper::header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok()).filter(|v| !v.is_empty())
}

fn has_no_cache_directive(cache_control: &str) -> bool {
    cache_control.split(',').any(|directive| directive.trim().eq_ignore_ascii_case("no-cache"))
}

// Weak comparison, `W/"x"` and `"x"` are the same validator for GET and HEAD
fn etag_list_matches(none_match: &str, etag: &str) -> bool {
    let etag = etag.trim();
    none_match.split(',').map(str::trim).filter(|tag| !tag.is_empty()).any(|tag| {
        tag == etag || tag.strip_prefix("W/") == Some(etag) || etag.strip_prefix("W/") == Some(tag)
    })
}
