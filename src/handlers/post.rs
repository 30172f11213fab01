//! §4.7.3 PostHandler: creates a new child resource under a container.
//! The router is responsible for the two preconditions the spec assigns
//! to it (parent exists and is a Container; target name unused) before
//! this handler ever runs.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use oxrdf::{GraphName, Literal, NamedNode, Quad, Subject, Term};

use crate::error::LdpError;
use crate::handlers::{audit_quad, post_is_rdf_media_type, post_media_type_to_syntax, reject_tombstone, HandlerContext};
use crate::model::{Extension, InteractionModel, PreferGraph, Resource};
use crate::response::type_links;

const LDP_NS: &str = "http://www.w3.org/ns/ldp#";

/// Resolve the LDP type for a new resource from the `Link: <iri>; rel="type"`
/// request header, falling back to content-type sniffing (§4.7.3 step 1).
pub(crate) fn resolve_interaction_model(links: &[crate::headers::link::Link], content_type: Option<&str>, is_rdf_content_type: bool) -> InteractionModel {
    for link in links {
        if link.rel() != Some("type") || !link.target.starts_with(LDP_NS) {
            continue;
        }
        if let Some(model) = InteractionModel::from_iri(&link.target) {
            if model != InteractionModel::Resource {
                return model;
            }
        }
    }
    match content_type {
        Some(_) if !is_rdf_content_type => InteractionModel::NonRDFSource,
        _ => InteractionModel::RDFSource,
    }
}

fn type_quad(identifier: &str, model: InteractionModel) -> Quad {
    Quad::new(
        Subject::NamedNode(NamedNode::new_unchecked(identifier)),
        NamedNode::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#type"),
        Term::NamedNode(NamedNode::new_unchecked(model.iri())),
        GraphName::NamedNode(NamedNode::new_unchecked(PreferGraph::ServerManaged.iri())),
    )
}

#[tracing::instrument(skip_all)]
pub async fn handle(ctx: &HandlerContext<'_>, parent: Resource, body: Bytes, now: crate::model::Instant) -> Result<Response, LdpError> {
    reject_tombstone(&parent)?;

    if ctx.request.extension == Some(Extension::Uploads) {
        return crate::multipart::initiate(ctx, &parent).await;
    }

    let slug = ctx.request.slug.clone().unwrap_or_else(|| ctx.resources.next_identifier());
    let child_internal = format!("{}/{}", ctx.internal_identifier().trim_end_matches('/'), slug);
    let child_external = format!("{}/{}", ctx.identifier().trim_end_matches('/'), slug);

    let content_type = ctx.request.content_type.as_deref();
    let is_rdf = content_type.map(post_is_rdf_media_type).unwrap_or(false);
    let model = resolve_interaction_model(&ctx.request.link, content_type, is_rdf);

    let mut dataset = vec![audit_quad(&child_internal, "Creation", now), type_quad(&child_internal, model)];

    if !body.is_empty() && is_rdf {
        let syntax = post_media_type_to_syntax(content_type.unwrap_or_default()).ok_or(LdpError::UnsupportedMediaType)?;
        let triples = ctx.io.read(body, &child_external, syntax).await?;
        let skolemized: Vec<oxrdf::Quad> = triples
            .into_iter()
            .map(|t| {
                let subject = skolemize_subject(t.subject, ctx.resources);
                Quad::new(subject, t.predicate, t.object, GraphName::NamedNode(NamedNode::new_unchecked(PreferGraph::UserManaged.iri())))
            })
            .collect();
        if let Some(violation) = ctx.constraints.constrained_by(model, &ctx.request.base_url, &skolemized) {
            return Err(LdpError::conflict_with_link("constraint violation", violation));
        }
        dataset.extend(skolemized);
    } else if !body.is_empty() {
        let resolver = ctx
            .binaries
            .resolver_for(&ctx.request.partition)
            .ok_or_else(|| LdpError::Internal("no binary resolver for partition".to_string()))?;
        let stream = Box::pin(futures::stream::once(async move { Ok(body.clone()) }));
        let size = resolver.set_content(&child_internal, content_type.unwrap_or("application/octet-stream"), stream).await?;
        if let Some(digest) = &ctx.request.digest {
            let computed = resolver.digest(&child_internal, &digest.algorithm).await?;
            if !computed.eq_ignore_ascii_case(&digest.value) {
                resolver.purge_content(&child_internal).await?;
                return Err(LdpError::BadRequest("Digest mismatch".to_string()));
            }
        }
        dataset.push(Quad::new(
            Subject::NamedNode(NamedNode::new_unchecked(&child_internal)),
            NamedNode::new_unchecked("http://www.w3.org/ns/posix/stat#hasPart"),
            Term::NamedNode(NamedNode::new_unchecked(child_internal.clone())),
            GraphName::NamedNode(NamedNode::new_unchecked(PreferGraph::ServerManaged.iri())),
        ));
        dataset.push(Quad::new(
            Subject::NamedNode(NamedNode::new_unchecked(&child_internal)),
            NamedNode::new_unchecked("http://purl.org/dc/terms/extent"),
            Term::Literal(Literal::new_typed_literal(size.to_string(), NamedNode::new_unchecked("http://www.w3.org/2001/XMLSchema#long"))),
            GraphName::NamedNode(NamedNode::new_unchecked(PreferGraph::ServerManaged.iri())),
        ));
        if let Some(ct) = content_type {
            dataset.push(Quad::new(
                Subject::NamedNode(NamedNode::new_unchecked(&child_internal)),
                NamedNode::new_unchecked("http://purl.org/dc/terms/format"),
                Term::Literal(Literal::new_simple_literal(ct)),
                GraphName::NamedNode(NamedNode::new_unchecked(PreferGraph::ServerManaged.iri())),
            ));
        }
    }

    ctx.resources.put(&child_internal, dataset).await.map_err(|_| LdpError::Internal("commit failed".to_string()))?;

    let placeholder = Resource {
        identifier: child_internal.clone(),
        interaction_model: model,
        modified: now,
        types: Default::default(),
        inbox: None,
        annotation_service: None,
        mementos: Vec::new(),
        binary: None,
        quads: Vec::new(),
    };

    let mut response = Response::builder().status(StatusCode::CREATED).header(header::LOCATION, child_external);
    if let Some(link_header) = crate::response::join_links(&type_links(&placeholder)) {
        response = response.header(header::LINK, link_header);
    }
    response.body(Body::empty()).map_err(|e| LdpError::Internal(e.to_string()))
}

fn skolemize_subject(subject: oxrdf::Subject, resources: &dyn crate::services::ResourceService) -> Subject {
    match subject {
        Subject::BlankNode(b) => Subject::NamedNode(NamedNode::new_unchecked(resources.skolemize(b.as_str()))),
        other => other,
    }
}
