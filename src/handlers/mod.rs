//! §4.7 Method Handlers — the largest component. Each submodule is one
//! state machine; this module holds the preamble every one of them
//! shares: tombstone detection and conditional-GET cache evaluation.

pub mod delete;
pub mod get;
pub mod options;
pub mod patch;
pub mod post;
pub mod put;

use crate::error::LdpError;
use crate::model::{Instant, Resource};
use crate::response::{is_cache_hit, ETag};

/// §4.7 shared preamble, step 1: a tombstoned resource answers every
/// method with 410 (invariant I3, P5).
pub fn reject_tombstone(resource: &Resource) -> Result<(), LdpError> {
    if resource.is_deleted() {
        return Err(LdpError::Gone);
    }
    Ok(())
}

/// §4.7 shared preamble, step 2: conditional-request evaluation against
/// `If-None-Match`/`If-Modified-Since` (P8). Returns `Ok(Some(etag))` when
/// the request should proceed, `Err(NotModified)` on a cache hit.
pub fn evaluate_cache(
    resource: &Resource,
    identifier: &str,
    if_none_match: Option<&str>,
    if_modified_since: Option<Instant>,
) -> Result<ETag, LdpError> {
    let etag = if resource.binary.is_some() {
        ETag::for_binary(resource.modified, identifier)
    } else {
        ETag::for_rdf(resource.modified, identifier)
    };
    if is_cache_hit(&etag, if_none_match, if_modified_since, resource.modified) {
        return Err(LdpError::NotModified);
    }
    Ok(etag)
}

/// Shared context every handler needs: the request, the resolved
/// resource, the authenticated session, and the collaborator services —
/// grouped here rather than threaded as five separate parameters (§9,
/// "Request context").
pub struct HandlerContext<'a> {
    pub request: &'a crate::model::LdpRequest,
    pub session: &'a crate::model::Session,
    pub resources: &'a dyn crate::services::ResourceService,
    pub binaries: &'a dyn crate::services::BinaryService,
    pub io: &'a dyn crate::services::IOService,
    pub constraints: &'a dyn crate::services::ConstraintService,
    pub access_control: &'a dyn crate::services::AccessControlService,
    pub challenges: &'a [String],
}

impl<'a> HandlerContext<'a> {
    pub fn identifier(&self) -> String {
        self.request.external_identifier()
    }

    pub fn internal_identifier(&self) -> String {
        self.request.internal_identifier()
    }
}

/// Shared by PUT/PATCH/DELETE/POST: an audit quad recording `activity`
/// (`Creation`/`Update`/`Deletion`) at `when`, in `PreferAudit`.
pub fn audit_quad(identifier: &str, activity: &str, when: Instant) -> oxrdf::Quad {
    use oxrdf::{GraphName, Literal, NamedNode, Quad, Subject, Term};
    Quad::new(
        Subject::NamedNode(NamedNode::new_unchecked(identifier)),
        NamedNode::new_unchecked("http://www.w3.org/ns/prov#activity"),
        Term::Literal(Literal::new_typed_literal(
            format!("{activity}@{}", when.timestamp_millis()),
            NamedNode::new_unchecked("http://www.w3.org/2001/XMLSchema#string"),
        )),
        GraphName::NamedNode(NamedNode::new_unchecked(crate::model::PreferGraph::Audit.iri())),
    )
}

/// Is `content_type` one of the known RDF media types (§4.2's variant table)?
pub fn post_is_rdf_media_type(content_type: &str) -> bool {
    post_media_type_to_syntax(content_type).is_some()
}

pub fn post_media_type_to_syntax(content_type: &str) -> Option<crate::negotiation::RdfSyntax> {
    let base = content_type.split(';').next().unwrap_or(content_type).trim();
    crate::negotiation::RdfSyntax::known().into_iter().find(|s| s.media_type() == base)
}
