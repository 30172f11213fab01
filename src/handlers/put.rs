//! §4.7.4 PutHandler: creates or replaces a resource at the given
//! identifier. PUT to a missing identifier creates it (the router
//! resolves "missing" before calling this handler by passing `existing:
//! None`).

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use oxrdf::{GraphName, Literal, NamedNode, Quad, Subject, Term};

use crate::error::LdpError;
use crate::handlers::{audit_quad, evaluate_cache, post_is_rdf_media_type, post_media_type_to_syntax, reject_tombstone, HandlerContext};
use crate::model::{Extension, InteractionModel, PreferGraph, Resource};
use crate::response::type_links;

#[tracing::instrument(skip_all)]
pub async fn handle(
    ctx: &HandlerContext<'_>,
    existing: Option<Resource>,
    desired_model: InteractionModel,
    body: Bytes,
    now: crate::model::Instant,
) -> Result<Response, LdpError> {
    let identifier = ctx.identifier();
    let internal_identifier = ctx.internal_identifier();

    if let Some(existing) = &existing {
        reject_tombstone(existing)?;
        evaluate_cache(existing, &identifier, ctx.request.if_none_match.as_deref(), ctx.request.if_modified_since)?;
    }

    let is_acl = ctx.request.extension == Some(Extension::Acl);
    let content_type = ctx.request.content_type.as_deref();
    let is_rdf = content_type.map(post_is_rdf_media_type).unwrap_or(false);

    if is_acl && !body.is_empty() && !is_rdf {
        return Err(LdpError::NotAcceptable);
    }

    if let Some(existing) = &existing {
        if !existing.interaction_model.compatible_with(&desired_model) {
            return Err(LdpError::conflict("interaction model change outside the LDP sub-class chain"));
        }
    }

    if desired_model == InteractionModel::NonRDFSource && is_rdf {
        return Err(LdpError::BadRequest("NonRDFSource cannot accept RDF content-type".to_string()));
    }

    let mut dataset = vec![audit_quad(&internal_identifier, "Update", now)];

    // Preserve the inactive companion graph: updating PreferUserManaged
    // retains PreferAccessControl and vice versa (§4.7.4 step 4).
    if let Some(existing) = &existing {
        let preserved_graph = if is_acl { PreferGraph::UserManaged } else { PreferGraph::AccessControl };
        dataset.extend(
            existing
                .quads
                .iter()
                .filter(|q| preserved_graph.matches_graph_name(&q.graph_name))
                .cloned(),
        );
    }

    dataset.push(Quad::new(
        oxrdf::Subject::NamedNode(NamedNode::new_unchecked(&internal_identifier)),
        NamedNode::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#type"),
        oxrdf::Term::NamedNode(NamedNode::new_unchecked(desired_model.iri())),
        GraphName::NamedNode(NamedNode::new_unchecked(PreferGraph::ServerManaged.iri())),
    ));

    let active_graph = if is_acl { PreferGraph::AccessControl } else { PreferGraph::UserManaged };

    if !body.is_empty() && is_rdf {
        let syntax = post_media_type_to_syntax(content_type.unwrap_or_default()).ok_or(LdpError::UnsupportedMediaType)?;
        let triples = ctx.io.read(body, &identifier, syntax).await?;
        let quads: Vec<Quad> = triples
            .into_iter()
            .map(|t| Quad::new(t.subject, t.predicate, t.object, GraphName::NamedNode(NamedNode::new_unchecked(active_graph.iri()))))
            .collect();
        if let Some(violation) = ctx.constraints.constrained_by(desired_model, &ctx.request.base_url, &quads) {
            return Err(LdpError::conflict_with_link("constraint violation", violation));
        }
        dataset.extend(quads);
    } else if !body.is_empty() {
        let resolver = ctx
            .binaries
            .resolver_for(&ctx.request.partition)
            .ok_or_else(|| LdpError::Internal("no binary resolver for partition".to_string()))?;
        let internal_for_stream = internal_identifier.clone();
        let stream = Box::pin(futures::stream::once(async move { Ok(body.clone()) }));
        let size = resolver
            .set_content(&internal_for_stream, content_type.unwrap_or("application/octet-stream"), stream)
            .await?;
        if let Some(digest) = &ctx.request.digest {
            let computed = resolver.digest(&internal_identifier, &digest.algorithm).await?;
            if !computed.eq_ignore_ascii_case(&digest.value) {
                resolver.purge_content(&internal_identifier).await?;
                return Err(LdpError::BadRequest("Digest mismatch".to_string()));
            }
        }
        dataset.push(Quad::new(
            Subject::NamedNode(NamedNode::new_unchecked(&internal_identifier)),
            NamedNode::new_unchecked("http://www.w3.org/ns/posix/stat#hasPart"),
            Term::NamedNode(NamedNode::new_unchecked(internal_identifier.clone())),
            GraphName::NamedNode(NamedNode::new_unchecked(PreferGraph::ServerManaged.iri())),
        ));
        dataset.push(Quad::new(
            Subject::NamedNode(NamedNode::new_unchecked(&internal_identifier)),
            NamedNode::new_unchecked("http://purl.org/dc/terms/extent"),
            Term::Literal(Literal::new_typed_literal(size.to_string(), NamedNode::new_unchecked("http://www.w3.org/2001/XMLSchema#long"))),
            GraphName::NamedNode(NamedNode::new_unchecked(PreferGraph::ServerManaged.iri())),
        ));
        if let Some(ct) = content_type {
            dataset.push(Quad::new(
                Subject::NamedNode(NamedNode::new_unchecked(&internal_identifier)),
                NamedNode::new_unchecked("http://purl.org/dc/terms/format"),
                Term::Literal(Literal::new_simple_literal(ct)),
                GraphName::NamedNode(NamedNode::new_unchecked(PreferGraph::ServerManaged.iri())),
            ));
        }
    }

    ctx.resources.put(&internal_identifier, dataset).await.map_err(|_| LdpError::Internal("commit failed".to_string()))?;

    let placeholder = Resource {
        identifier: internal_identifier,
        interaction_model: desired_model,
        modified: now,
        types: Default::default(),
        inbox: None,
        annotation_service: None,
        mementos: Vec::new(),
        binary: None,
        quads: Vec::new(),
    };

    let mut response = Response::builder().status(StatusCode::NO_CONTENT);
    if let Some(link_header) = crate::response::join_links(&type_links(&placeholder)) {
        response = response.header(header::LINK, link_header);
    }
    response.body(Body::empty()).map_err(|e| LdpError::Internal(e.to_string()))
}
