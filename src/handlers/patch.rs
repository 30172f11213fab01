//! §4.7.5 PatchHandler: SPARQL-Update against `PreferUserManaged` by
//! default, or `PreferAccessControl` when `ext=acl`.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use oxrdf::{GraphName, NamedNode, Quad};

use crate::error::LdpError;
use crate::handlers::{audit_quad, evaluate_cache, reject_tombstone, HandlerContext};
use crate::headers::prefer::Preference;
use crate::model::{Extension, PreferGraph, Resource};

#[tracing::instrument(skip_all)]
pub async fn handle(ctx: &HandlerContext<'_>, resource: Resource, sparql: Option<String>, now: crate::model::Instant) -> Result<Response, LdpError> {
    let sparql = sparql.filter(|s| !s.trim().is_empty()).ok_or_else(|| LdpError::BadRequest("missing SPARQL-Update body".to_string()))?;

    reject_tombstone(&resource)?;
    let identifier = ctx.identifier();
    evaluate_cache(&resource, &identifier, ctx.request.if_none_match.as_deref(), ctx.request.if_modified_since)?;

    let is_acl = ctx.request.extension == Some(Extension::Acl);
    let active_graph = if is_acl { PreferGraph::AccessControl } else { PreferGraph::UserManaged };

    let current: Vec<oxrdf::Triple> = resource
        .quads
        .iter()
        .filter(|q| active_graph.matches_graph_name(&q.graph_name))
        .map(|q| oxrdf::Triple::new(q.subject.clone(), q.predicate.clone(), q.object.clone()))
        .collect();

    let updated = ctx
        .io
        .update(&current, &sparql, &identifier)
        .map_err(|_| LdpError::BadRequest("Invalid RDF".to_string()))?;

    let internal_identifier = ctx.internal_identifier();
    let skolemized: Vec<Quad> = updated
        .into_iter()
        .map(|t| {
            let subject = skolemize_subject(t.subject, ctx.resources);
            Quad::new(subject, t.predicate, t.object, GraphName::NamedNode(NamedNode::new_unchecked(active_graph.iri())))
        })
        .collect();

    let mut dataset = vec![audit_quad(&internal_identifier, "Update", now)];

    // Preserve the PreferServerManaged `type` quad.
    dataset.extend(
        resource
            .quads
            .iter()
            .filter(|q| PreferGraph::ServerManaged.matches_graph_name(&q.graph_name))
            .cloned(),
    );
    dataset.extend(skolemized.clone());

    if let Some(violation) = ctx.constraints.constrained_by(resource.interaction_model, &ctx.request.base_url, &skolemized) {
        return Err(LdpError::bad_request_with_link("constraint violation", violation));
    }

    ctx.resources.put(&internal_identifier, dataset).await.map_err(|_| LdpError::Internal("commit failed".to_string()))?;

    if ctx.request.prefer.as_ref().map(|p| p.preference == Some(Preference::Representation)).unwrap_or(false) {
        let triples: Vec<oxrdf::Triple> = skolemized
            .into_iter()
            .map(|q| {
                let q = crate::identifiers::quad_to_external(&q, &ctx.request.base_url);
                oxrdf::Triple::new(q.subject, q.predicate, q.object)
            })
            .collect();
        let bytes = ctx.io.write(&triples, crate::negotiation::RdfSyntax::Turtle, "")?;
        return Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, crate::negotiation::RdfSyntax::Turtle.media_type())
            .body(Body::from(bytes))
            .map_err(|e| LdpError::Internal(e.to_string()));
    }

    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(Body::empty())
        .map_err(|e| LdpError::Internal(e.to_string()))
}

fn skolemize_subject(subject: oxrdf::Subject, resources: &dyn crate::services::ResourceService) -> oxrdf::Subject {
    match subject {
        oxrdf::Subject::BlankNode(b) => oxrdf::Subject::NamedNode(NamedNode::new_unchecked(resources.skolemize(b.as_str()))),
        other => other,
    }
}
