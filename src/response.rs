//! Response Builder Utilities: cache evaluation, ETag construction, and
//! the `Link`/`Allow`/`Vary` header assembly shared by every method
//! handler (§4.7's shared preamble and per-handler header-building steps).

use axum::http::HeaderValue;

use crate::model::{Instant, InteractionModel, Resource};

/// An `ETag`, strong or weak, rendered the way `IntoResponse` expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ETag {
    pub value: String,
    pub weak: bool,
}

impl ETag {
    /// Strong ETag for a binary: `md5(mod + identifier + "BINARY")` (§4.7.1 step 4).
    pub fn for_binary(modified: Instant, identifier: &str) -> Self {
        let digest = md5::compute(format!("{}{}BINARY", modified.timestamp_millis(), identifier));
        Self { value: format!("{digest:x}"), weak: false }
    }

    /// Weak ETag for an RDF representation: `md5(mod + identifier)` (§4.7.1 step 5).
    pub fn for_rdf(modified: Instant, identifier: &str) -> Self {
        let digest = md5::compute(format!("{}{}", modified.timestamp_millis(), identifier));
        Self { value: format!("{digest:x}"), weak: true }
    }

    pub fn header_value(&self) -> String {
        if self.weak {
            format!("W/\"{}\"", self.value)
        } else {
            format!("\"{}\"", self.value)
        }
    }

    /// Does this ETag match the raw `If-None-Match` header value? Strong
    /// comparison ignores the weak `W/` prefix per the usual HTTP
    /// conditional-GET semantics used for cache hits (P8).
    pub fn matches(&self, if_none_match: &str) -> bool {
        if_none_match
            .split(',')
            .map(str::trim)
            .any(|candidate| candidate.trim_start_matches("W/") == format!("\"{}\"", self.value))
    }
}

/// §4.7 shared preamble: did the conditional request headers already
/// satisfy this GET? `P8`.
pub fn is_cache_hit(etag: &ETag, if_none_match: Option<&str>, if_modified_since: Option<Instant>, modified: Instant) -> bool {
    if let Some(inm) = if_none_match {
        if etag.matches(inm) {
            return true;
        }
    }
    if let Some(since) = if_modified_since {
        if modified <= since {
            return true;
        }
    }
    false
}

/// `Allow` header per §4.7.1 step 3/5 and §4.7.2, given resource state.
pub fn allow_for(model: InteractionModel, is_memento: bool, is_acl: bool) -> Vec<&'static str> {
    if is_memento {
        return vec!["GET", "HEAD", "OPTIONS"];
    }
    if is_acl {
        return vec!["GET", "HEAD", "OPTIONS", "PATCH"];
    }
    match model {
        InteractionModel::NonRDFSource => vec!["GET", "HEAD", "OPTIONS", "PUT", "DELETE"],
        InteractionModel::RDFSource => vec!["GET", "HEAD", "OPTIONS", "PATCH", "PUT", "DELETE"],
        m if m.is_container() => vec!["GET", "HEAD", "OPTIONS", "PATCH", "PUT", "DELETE", "POST"],
        _ => vec!["GET", "HEAD", "OPTIONS", "PATCH", "PUT", "DELETE"],
    }
}

/// All known RDF media types minus `text/html`, for `Accept-Post`/`Accept-Put`
/// on a container (§4.7.1 step 3).
pub fn rdf_media_types_for_post() -> Vec<&'static str> {
    crate::negotiation::RdfSyntax::known()
        .into_iter()
        .map(|s| s.media_type())
        .filter(|mt| *mt != "text/html")
        .collect()
}

/// `Link; rel="type"` headers for every LDP type in the sub-class chain
/// (§4.7.1 step 3), plus any user-data `Link`s (`inbox`, `oa:annotationService`).
pub fn type_links(resource: &Resource) -> Vec<crate::headers::link::Link> {
    let mut links: Vec<_> = resource
        .interaction_model
        .ldp_resource_types()
        .into_iter()
        .map(|model| crate::headers::link::Link::new(model.iri()).with_param("rel", "type"))
        .collect();
    if let Some(inbox) = &resource.inbox {
        links.push(crate::headers::link::Link::new(inbox.clone()).with_param("rel", "inbox"));
    }
    if let Some(annotation_service) = &resource.annotation_service {
        links.push(
            crate::headers::link::Link::new(annotation_service.clone())
                .with_param("rel", "http://www.w3.org/ns/oa#annotationService"),
        );
    }
    links
}

/// Join a set of link values into a single header value, as multiple
/// `Link` headers or one comma-joined value (axum accepts either; this
/// crate emits one comma-joined value per response).
pub fn join_links(links: &[crate::headers::link::Link]) -> Option<HeaderValue> {
    if links.is_empty() {
        return None;
    }
    let joined = links.iter().map(|l| l.to_string()).collect::<Vec<_>>().join(", ");
    HeaderValue::from_str(&joined).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn binary_etag_is_strong() {
        let modified = chrono::Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let etag = ETag::for_binary(modified, "trellis:a/b");
        assert!(!etag.weak);
        assert!(etag.header_value().starts_with('"'));
    }

    #[test]
    fn rdf_etag_is_weak() {
        let modified = chrono::Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let etag = ETag::for_rdf(modified, "trellis:a/b");
        assert!(etag.weak);
        assert!(etag.header_value().starts_with("W/\""));
    }

    #[test]
    fn matching_etag_is_a_cache_hit() {
        let modified = chrono::Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let etag = ETag::for_rdf(modified, "trellis:a/b");
        let header = etag.header_value();
        assert!(is_cache_hit(&etag, Some(&header), None, modified));
    }

    #[test]
    fn non_matching_etag_is_not_a_cache_hit() {
        let modified = chrono::Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let etag = ETag::for_rdf(modified, "trellis:a/b");
        assert!(!is_cache_hit(&etag, Some("W/\"nope\""), None, modified));
    }

    #[test]
    fn container_allow_includes_post() {
        let allow = allow_for(InteractionModel::BasicContainer, false, false);
        assert!(allow.contains(&"POST"));
    }

    #[test]
    fn memento_allow_is_read_only() {
        let allow = allow_for(InteractionModel::RDFSource, true, false);
        assert_eq!(allow, vec!["GET", "HEAD", "OPTIONS"]);
    }

    #[test]
    fn acl_allow_excludes_put_delete_post() {
        let allow = allow_for(InteractionModel::RDFSource, false, true);
        assert_eq!(allow, vec!["GET", "HEAD", "OPTIONS", "PATCH"]);
    }
}
