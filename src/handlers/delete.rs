//! §4.7.6 DeleteHandler.

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::Response;

use crate::error::LdpError;
use crate::handlers::{audit_quad, evaluate_cache, reject_tombstone, HandlerContext};
use crate::model::{Extension, PreferGraph, Resource};

#[tracing::instrument(skip_all)]
pub async fn handle(ctx: &HandlerContext<'_>, resource: Resource, now: crate::model::Instant) -> Result<Response, LdpError> {
    reject_tombstone(&resource)?;
    let identifier = ctx.identifier();
    evaluate_cache(&resource, &identifier, ctx.request.if_none_match.as_deref(), ctx.request.if_modified_since)?;

    if resource.interaction_model.is_container() && resource.has_quads_in(PreferGraph::Containment) {
        return Err(LdpError::conflict_with_link(
            "cannot delete a non-empty container",
            "http://www.trellisldp.org/ns/trellis#UnsupportedRecursiveDelete",
        ));
    }

    let is_acl = ctx.request.extension == Some(Extension::Acl);
    let internal_identifier = ctx.internal_identifier();

    let mut dataset = vec![audit_quad(&internal_identifier, "Deletion", now)];

    if is_acl {
        // Only the ACL graph is removed; retain everything else.
        dataset.extend(
            resource
                .quads
                .iter()
                .filter(|q| !PreferGraph::AccessControl.matches_graph_name(&q.graph_name))
                .cloned(),
        );
    } else {
        dataset.push(tombstone_quad(&internal_identifier));
    }

    ctx.resources.put(&internal_identifier, dataset).await.map_err(|_| LdpError::Internal("commit failed".to_string()))?;

    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(Body::empty())
        .map_err(|e| LdpError::Internal(e.to_string()))
}

fn tombstone_quad(identifier: &str) -> oxrdf::Quad {
    use oxrdf::{GraphName, NamedNode, Subject, Term};
    oxrdf::Quad::new(
        Subject::NamedNode(NamedNode::new_unchecked(identifier)),
        NamedNode::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#type"),
        Term::NamedNode(NamedNode::new_unchecked(crate::model::DELETED_RESOURCE_TYPE)),
        GraphName::NamedNode(NamedNode::new_unchecked(PreferGraph::ServerManaged.iri())),
    )
}
