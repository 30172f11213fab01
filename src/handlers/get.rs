//! §4.7.1 GetHandler. Also backs HEAD, which is the same state machine
//! with the entity dropped before the response is returned.

use std::collections::HashSet;

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use futures_util::StreamExt;

use crate::error::LdpError;
use crate::handlers::{evaluate_cache, reject_tombstone, HandlerContext};
use crate::headers::prefer::Preference;
use crate::memento::{memento_links, original_timegate_link, rfc1123};
use crate::model::{Extension, MementoResource, PreferGraph, Resource};
use crate::negotiation::{negotiate, Negotiated};
use crate::response::{allow_for, join_links, rdf_media_types_for_post, type_links};

/// `include_entity=false` is HEAD; everything else about the state
/// machine is identical to GET.
#[tracing::instrument(skip_all)]
pub async fn handle(
    ctx: &HandlerContext<'_>,
    memento: Option<MementoResource>,
    resource: Resource,
    include_entity: bool,
) -> Result<Response, LdpError> {
    reject_tombstone(&resource)?;

    let identifier = ctx.identifier();
    let etag = evaluate_cache(&resource, &identifier, ctx.request.if_none_match.as_deref(), ctx.request.if_modified_since)?;

    let is_acl = ctx.request.extension == Some(Extension::Acl);
    if is_acl && !resource.has_quads_in(PreferGraph::AccessControl) {
        return Err(LdpError::NotFound);
    }

    let (negotiated, profile) = negotiate(&ctx.request.accept, resource.binary.as_ref().map(|b| b.mime_type.as_str()), &identifier)?;

    let mut response = Response::builder().status(StatusCode::OK);
    response = response.header(header::LAST_MODIFIED, rfc1123(resource.modified));

    let mut links = type_links(&resource);
    let is_memento = memento.is_some();

    if !is_acl {
        links.push(original_timegate_link(&identifier));
        links.extend(memento_links(&identifier, &resource.mementos));
    }

    if resource.interaction_model.is_container() {
        response = response.header(
            "Accept-Post",
            rdf_media_types_for_post().join(", "),
        );
    }
    if matches!(resource.interaction_model, crate::model::InteractionModel::RDFSource) || resource.interaction_model.is_container() {
        response = response.header("Accept-Patch", "application/sparql-update");
    }

    if let Some(link_header) = join_links(&links) {
        response = response.header(header::LINK, link_header);
    }

    let allow = allow_for(resource.interaction_model, is_memento, is_acl);
    response = response.header(header::ALLOW, allow.join(", "));

    if let Some(memento) = &memento {
        response = response.header("Memento-Datetime", rfc1123(memento.datetime));
    } else {
        response = response.header(header::VARY, "Accept-Datetime");
    }

    if let (Negotiated::Binary, true) = (negotiated, resource.binary.is_some()) {
        return stream_binary(ctx, response, &resource, &identifier, etag, include_entity).await;
    }

    response = response.header(header::ETAG, etag.header_value());
    response = response.header(header::CONTENT_TYPE, rdf_content_type(negotiated, &profile));

    let mut prefer_synthesized = ctx.request.prefer.clone();
    if is_acl {
        let mut synthesized = crate::headers::prefer::Prefer::default();
        synthesized.include = vec![PreferGraph::AccessControl.iri().to_string()];
        synthesized.omit = vec![
            PreferGraph::UserManaged.iri().to_string(),
            PreferGraph::Containment.iri().to_string(),
            PreferGraph::Membership.iri().to_string(),
        ];
        prefer_synthesized = Some(synthesized);
    }

    if prefer_synthesized.as_ref().map(|p| p.is_minimal()).unwrap_or(false) {
        return Ok(response.status(StatusCode::NO_CONTENT).body(Body::empty()).map_err(|e| LdpError::Internal(e.to_string()))?);
    }

    if !include_entity {
        return Ok(response.body(Body::empty()).map_err(|e| LdpError::Internal(e.to_string()))?);
    }

    let graphs = include_set(prefer_synthesized.as_ref());
    let quads = resource.quads_in(&graphs).into_iter().cloned().collect::<Vec<_>>();
    let triples: Vec<oxrdf::Triple> = quads
        .into_iter()
        .map(|q| {
            let q = crate::identifiers::quad_to_external(&q, &ctx.request.base_url);
            oxrdf::Triple::new(q.subject, q.predicate, q.object)
        })
        .collect();
    let bytes = ctx.io.write(&triples, negotiated_syntax(negotiated), &profile)?;

    Ok(response.body(Body::from(bytes)).map_err(|e| LdpError::Internal(e.to_string()))?)
}

fn negotiated_syntax(negotiated: Negotiated) -> crate::negotiation::RdfSyntax {
    match negotiated {
        Negotiated::Rdf(syntax) => syntax,
        Negotiated::Binary => crate::negotiation::RdfSyntax::Turtle,
    }
}

fn rdf_content_type(negotiated: Negotiated, profile: &str) -> String {
    match negotiated {
        Negotiated::Rdf(syntax) if !profile.is_empty() => {
            format!("{}; profile=\"{}\"", syntax.media_type(), profile)
        }
        Negotiated::Rdf(syntax) => syntax.media_type().to_string(),
        Negotiated::Binary => "application/octet-stream".to_string(),
    }
}

/// §4.7.7 Prefer Filter: default set, minus `omit`, plus `include`.
fn include_set(prefer: Option<&crate::headers::prefer::Prefer>) -> HashSet<String> {
    let mut graphs: HashSet<String> = PreferGraph::defaults().iter().map(|g| g.iri().to_string()).collect();
    if let Some(prefer) = prefer {
        for omitted in &prefer.omit {
            graphs.remove(omitted);
        }
        for included in &prefer.include {
            graphs.insert(included.clone());
        }
    }
    graphs
}

async fn stream_binary(
    ctx: &HandlerContext<'_>,
    mut response: axum::http::response::Builder,
    resource: &Resource,
    identifier: &str,
    etag: crate::response::ETag,
    include_entity: bool,
) -> Result<Response, LdpError> {
    let binary = resource.binary.as_ref().expect("checked by caller");
    response = response.header(header::ETAG, etag.header_value());
    response = response.header(header::CONTENT_TYPE, binary.mime_type.clone());
    response = response.header(header::VARY, "Range, Want-Digest");
    response = response.header(header::ACCEPT_RANGES, "bytes");

    let resolver = ctx
        .binaries
        .resolver_for(&ctx.request.partition)
        .ok_or_else(|| LdpError::Internal("no binary resolver for partition".to_string()))?;

    if let Some(want_digest) = &ctx.request.want_digest {
        let known = resolver.supported_algorithms();
        if let Some(algorithm) = want_digest.first_supported(&known) {
            let digest_value = resolver.digest(&binary.identifier, algorithm).await?;
            if let Ok(value) = HeaderValue::from_str(&format!("{algorithm}={digest_value}")) {
                response = response.header("Digest", value);
            }
        }
    }

    if !include_entity {
        return response.body(Body::empty()).map_err(|e| LdpError::Internal(e.to_string()));
    }

    let full = resolver.get_content(&binary.identifier).await?;

    let body = if let Some(range) = &ctx.request.range {
        let clamped = range.clamp(binary.size);
        if clamped.from > 0 || clamped.to < binary.size {
            tracing::warn!(identifier, requested = ?range, actual = ?clamped, "range clamped to binary length");
        }
        let skip = clamped.from;
        let take = clamped.to.saturating_sub(clamped.from);
        let mut remaining_skip = skip;
        let mut remaining_take = take;
        let bounded = full.filter_map(move |chunk| {
            let result = chunk.map(|bytes| {
                if remaining_skip >= bytes.len() as u64 {
                    remaining_skip -= bytes.len() as u64;
                    bytes::Bytes::new()
                } else {
                    let start = remaining_skip as usize;
                    remaining_skip = 0;
                    let available = (bytes.len() - start) as u64;
                    let take_now = available.min(remaining_take);
                    remaining_take -= take_now;
                    bytes.slice(start..start + take_now as usize)
                }
            });
            futures::future::ready(Some(result))
        });
        Body::from_stream(bounded)
    } else {
        Body::from_stream(full)
    };

    response.body(body).map_err(|e| LdpError::Internal(e.to_string()))
}
