//! §4.8 Multipart Upload: the state machine keyed by upload session id,
//! layered over [`crate::services::BinaryResolver`]. `initiate` is called
//! from [`crate::handlers::post`] when a container receives
//! `POST ?ext=uploads`; the remaining transitions are routed directly by
//! `src/web/mod.rs` against the `/upload/<partition>/<uploadId>[/<n>]`
//! path.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::LdpError;
use crate::handlers::HandlerContext;
use crate::model::Resource;

#[derive(Debug, Serialize, Deserialize)]
pub struct PartsMap {
    #[serde(flatten)]
    pub parts: std::collections::BTreeMap<u32, String>,
}

/// `POST ?ext=uploads` on a container — §4.8, `initiate`.
pub async fn initiate(ctx: &HandlerContext<'_>, parent: &Resource) -> Result<Response, LdpError> {
    let _ = parent;
    let content_type = ctx.request.content_type.as_deref().unwrap_or("application/octet-stream");
    let resolver = ctx
        .binaries
        .resolver_for(&ctx.request.partition)
        .ok_or_else(|| LdpError::Internal("no binary resolver for partition".to_string()))?;

    let target = ctx.identifier();
    let upload_id = resolver.initiate_upload(&target, content_type).await?;
    let location = format!("{}/upload/{}/{}", ctx.request.base_url, ctx.request.partition, upload_id);

    Response::builder()
        .status(StatusCode::CREATED)
        .header(header::LOCATION, location)
        .body(Body::empty())
        .map_err(|e| LdpError::Internal(e.to_string()))
}

/// `GET /upload/<partition>/<uploadId>` — list committed parts.
pub async fn list_parts(
    resolver: &dyn crate::services::BinaryResolver,
    upload_id: &str,
) -> Result<Response, LdpError> {
    if !resolver.upload_session_exists(upload_id).await? {
        return Err(LdpError::NotFound);
    }
    let parts = resolver.list_parts(upload_id).await?;
    let map = PartsMap { parts: parts.into_iter().collect() };
    let body = serde_json::to_vec(&map).map_err(|e| LdpError::Internal(e.to_string()))?;
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .map_err(|e| LdpError::Internal(e.to_string()))
}

/// `PUT /upload/<partition>/<uploadId>/<n>` — upload one part.
pub async fn upload_part(
    resolver: &dyn crate::services::BinaryResolver,
    upload_id: &str,
    part_number: u32,
    stream: BoxStream<'static, std::io::Result<Bytes>>,
) -> Result<Response, LdpError> {
    if !resolver.upload_session_exists(upload_id).await? {
        return Err(LdpError::NotFound);
    }
    let digest = resolver.upload_part(upload_id, part_number, stream).await?;
    let body = serde_json::json!({ "digest": digest });
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .map_err(|e| LdpError::Internal(e.to_string()))
}

/// `POST /upload/<partition>/<uploadId>` with `{n: digest}` — finalize.
pub async fn complete(
    ctx: &HandlerContext<'_>,
    upload_id: &str,
    target_internal: &str,
    parts_body: Bytes,
    now: crate::model::Instant,
) -> Result<Response, LdpError> {
    let resolver = ctx
        .binaries
        .resolver_for(&ctx.request.partition)
        .ok_or_else(|| LdpError::Internal("no binary resolver for partition".to_string()))?;
    if !resolver.upload_session_exists(upload_id).await? {
        return Err(LdpError::NotFound);
    }

    let map: PartsMap = serde_json::from_slice(&parts_body).map_err(|e| LdpError::BadRequest(e.to_string()))?;
    let parts: Vec<(u32, String)> = map.parts.into_iter().collect();

    let (binary_identifier, size) = resolver.complete_upload(upload_id, parts).await?;

    let content_type = ctx.request.content_type.clone().unwrap_or_else(|| "application/octet-stream".to_string());
    let dataset = binary_metadata_quads(target_internal, &binary_identifier, &content_type, size, now);
    ctx.resources.put(target_internal, dataset).await.map_err(|_| LdpError::Internal("commit failed".to_string()))?;

    Response::builder()
        .status(StatusCode::CREATED)
        .body(Body::empty())
        .map_err(|e| LdpError::Internal(e.to_string()))
}

/// `DELETE /upload/<partition>/<uploadId>` — §4.8 `abort`.
pub async fn abort(resolver: &dyn crate::services::BinaryResolver, upload_id: &str) -> Result<Response, LdpError> {
    if !resolver.upload_session_exists(upload_id).await? {
        return Err(LdpError::NotFound);
    }
    resolver.abort_upload(upload_id).await?;
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(Body::empty())
        .map_err(|e| LdpError::Internal(e.to_string()))
}

fn binary_metadata_quads(
    target_internal: &str,
    binary_identifier: &str,
    content_type: &str,
    size: u64,
    now: crate::model::Instant,
) -> Vec<oxrdf::Quad> {
    use oxrdf::{GraphName, Literal, NamedNode, Quad, Subject, Term};
    let graph = GraphName::NamedNode(NamedNode::new_unchecked(crate::model::PreferGraph::ServerManaged.iri()));
    let subject = Subject::NamedNode(NamedNode::new_unchecked(target_internal));
    vec![
        crate::handlers::audit_quad(target_internal, "Creation", now),
        Quad::new(
            subject.clone(),
            NamedNode::new_unchecked("http://www.w3.org/ns/posix/stat#hasPart"),
            Term::NamedNode(NamedNode::new_unchecked(binary_identifier)),
            graph.clone(),
        ),
        Quad::new(
            subject.clone(),
            NamedNode::new_unchecked("http://purl.org/dc/terms/format"),
            Term::Literal(Literal::new_simple_literal(content_type)),
            graph.clone(),
        ),
        Quad::new(
            subject,
            NamedNode::new_unchecked("http://purl.org/dc/terms/extent"),
            Term::Literal(Literal::new_typed_literal(size.to_string(), NamedNode::new_unchecked("http://www.w3.org/2001/XMLSchema#long"))),
            graph,
        ),
    ]
}
