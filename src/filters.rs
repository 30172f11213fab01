//! §4.5 Pre-matching Filter Pipeline: (1) trailing-slash redirect, (2)
//! typed-header validation, assembled into one immutable [`LdpRequest`].
//! Session attachment and the WebAC filter (steps 3–4) are layered on top
//! in `src/web/mod.rs`, since they need the resolved `Resource` identifier
//! and a live [`crate::services::AccessControlService`].

use axum::http::HeaderMap;

use crate::error::LdpError;
use crate::headers::{digest::Digest, link::Link, prefer::Prefer, range::Range, want_digest::WantDigest};
use crate::model::{Extension, LdpRequest};

/// Step (1): a path ending in `/` redirects 303 to the same path with
/// trailing slashes stripped.
pub fn trailing_slash_redirect(path: &str) -> Option<String> {
    if path.ends_with('/') && path != "/" {
        Some(path.trim_end_matches('/').to_string())
    } else {
        None
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Step (2): construct every typed header from the raw request; any
/// single parse failure aborts the whole pipeline with 400 (or 404 for
/// `Version`, per its carve-out).
pub fn build_request(
    headers: &HeaderMap,
    partition: String,
    path: String,
    extension: Option<&str>,
    version: Option<&str>,
    base_url: String,
) -> Result<LdpRequest, LdpError> {
    let extension = extension.and_then(Extension::parse);

    let version = version.map(crate::headers::version::parse).transpose()?;

    let accept_datetime = header_str(headers, "accept-datetime")
        .map(crate::headers::accept_datetime::parse)
        .transpose()?;

    let prefer = header_str(headers, "prefer").map(Prefer::parse).transpose()?;

    let range = header_str(headers, "range").map(Range::parse).transpose()?;

    let want_digest = header_str(headers, "want-digest").map(WantDigest::parse).transpose()?;

    let digest = header_str(headers, "digest").map(Digest::parse).transpose()?;

    let link = header_str(headers, "link")
        .map(Link::parse_list)
        .transpose()?
        .unwrap_or_default();

    let accept = header_str(headers, "accept")
        .map(|raw| raw.split(',').map(|s| s.trim().to_string()).collect())
        .unwrap_or_default();

    let content_type = header_str(headers, "content-type").map(str::to_string);
    let slug = header_str(headers, "slug").map(str::to_string);
    let if_none_match = header_str(headers, "if-none-match").map(str::to_string);
    let if_modified_since = header_str(headers, "if-modified-since")
        .map(crate::headers::accept_datetime::parse)
        .transpose()?;

    Ok(LdpRequest {
        partition,
        path,
        extension,
        version,
        accept_datetime,
        prefer,
        range,
        want_digest,
        digest,
        content_type,
        slug,
        link,
        accept,
        if_none_match,
        if_modified_since,
        base_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_redirects() {
        assert_eq!(trailing_slash_redirect("/a/b/"), Some("/a/b".to_string()));
        assert_eq!(trailing_slash_redirect("/a/b"), None);
        assert_eq!(trailing_slash_redirect("/"), None);
    }

    #[test]
    fn build_request_parses_known_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("accept", "text/turtle".parse().unwrap());
        headers.insert("prefer", "return=minimal".parse().unwrap());

        let req = build_request(&headers, "a".into(), "/b".into(), None, None, "http://host".into()).unwrap();
        assert_eq!(req.accept, vec!["text/turtle"]);
        assert!(req.prefer.unwrap().is_minimal());
    }

    #[test]
    fn build_request_propagates_header_parse_errors() {
        let mut headers = HeaderMap::new();
        headers.insert("range", "nonsense".parse().unwrap());
        let result = build_request(&headers, "a".into(), "/b".into(), None, None, "http://host".into());
        assert!(matches!(result, Err(LdpError::BadRequest(_))));
    }

    #[test]
    fn build_request_maps_malformed_version_to_not_found() {
        let headers = HeaderMap::new();
        let result = build_request(&headers, "a".into(), "/b".into(), None, Some("not-a-number"), "http://host".into());
        assert!(matches!(result, Err(LdpError::NotFound)));
    }
}
