//! §4.5 steps (3)-(4) and §9 "Router": the piece `filters.rs` deferred.
//! Builds the axum [`Router`], attaches a [`Session`](crate::model::Session)
//! and runs the WebAC filter, resolves the target [`Resource`], and
//! dispatches into the per-method handler in `crate::handlers`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::any;
use axum::Router;
use base64::Engine;
use bytes::Bytes;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::LdpError;
use crate::handlers::HandlerContext;
use crate::memento::{closest_memento, timegate_location, timemap_link_format_body, timemap_quads};
use crate::model::{Extension, LdpRequest, MementoResource};
use crate::negotiation::{negotiate, Negotiated};
use crate::root::RootMetadata;
use crate::services::{AccessControlService, AgentService, BinaryService, ConstraintService, IOService, ResourceService};
use crate::webac::AuthContext;

/// Everything the router needs to serve a request, behind `Arc` so clones
/// handed to each axum task are cheap (the teacher's `GoatState` pattern).
pub struct AppStateInner {
    pub config: ServerConfig,
    pub resources: Arc<dyn ResourceService>,
    pub binaries: Arc<dyn BinaryService>,
    pub io: Arc<dyn IOService>,
    pub constraints: Arc<dyn ConstraintService>,
    pub agents: Arc<dyn AgentService>,
    pub access_control: Arc<dyn AccessControlService>,
    pub root_metadata: RootMetadata,
}

#[derive(Clone)]
pub struct AppState(Arc<AppStateInner>);

/// Assemble the service, layered with request tracing and gzip
/// compression the way the teacher's `web::build` does.
pub fn build(state: AppStateInner) -> Router {
    let state = AppState(Arc::new(state));
    Router::new()
        .route("/", any(root))
        .route("/upload/{partition}/{upload_id}", any(upload_session))
        .route("/upload/{partition}/{upload_id}/{part_number}", any(upload_part))
        .route("/{partition}", any(resource))
        .route("/{partition}/{*path}", any(resource))
        .layer(axum::middleware::from_fn(trailing_slash_middleware))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CompressionLayer::new()))
        .with_state(state)
}

/// Step (1) of §4.5, applied ahead of route matching since it has to see
/// the raw, still-slash-terminated path.
async fn trailing_slash_middleware(request: axum::extract::Request, next: axum::middleware::Next) -> Response {
    let path = request.uri().path().to_string();
    if let Some(redirected) = crate::filters::trailing_slash_redirect(&path) {
        let target = match request.uri().query() {
            Some(query) => format!("{redirected}?{query}"),
            None => redirected,
        };
        return Redirect::to(&target).into_response();
    }
    next.run(request).await
}

/// `Authorization: Basic <base64(principal:password)>` - only the
/// principal name is extracted (§4.4); verifying the password is a
/// deployment concern this crate does not take on.
fn extract_principal(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = raw.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD.decode(encoded).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (principal, _password) = text.split_once(':')?;
    Some(principal.to_string())
}

fn accept_list(headers: &HeaderMap) -> Vec<String> {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|raw| raw.split(',').map(|s| s.trim().to_string()).collect())
        .unwrap_or_default()
}

fn blank_request(base_url: &str, partition: &str) -> LdpRequest {
    LdpRequest {
        partition: partition.to_string(),
        path: String::new(),
        extension: None,
        version: None,
        accept_datetime: None,
        prefer: None,
        range: None,
        want_digest: None,
        digest: None,
        content_type: None,
        slug: None,
        link: Vec::new(),
        accept: Vec::new(),
        if_none_match: None,
        if_modified_since: None,
        base_url: base_url.to_string(),
    }
}

/// §4.7.3's "target name unused" precondition, resolved here since only
/// the router has both the parent's internal identifier and a live
/// [`ResourceService`] before `post::handle` ever runs.
pub async fn resolve_child_slug(resources: &dyn ResourceService, parent_internal: &str, requested_slug: Option<&str>) -> Result<String, LdpError> {
    let slug = requested_slug.map(str::to_string).unwrap_or_else(|| resources.next_identifier());
    let child_internal = format!("{}/{}", parent_internal.trim_end_matches('/'), slug);
    if resources.get(&child_internal).await?.is_some() {
        return Err(LdpError::conflict("a child resource with this name already exists"));
    }
    Ok(slug)
}

async fn root(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let accept = accept_list(&headers);
    match crate::root::handle(state.0.io.as_ref(), &state.0.config.base_url, &state.0.config.partitions, &state.0.root_metadata, &accept) {
        Ok(response) => response,
        Err(error) => error.into_response(),
    }
}

#[derive(serde::Deserialize, Default)]
struct ResourceQuery {
    ext: Option<String>,
    version: Option<String>,
}

async fn resource(
    State(state): State<AppState>,
    method: Method,
    Path(path_params): Path<HashMap<String, String>>,
    Query(query): Query<ResourceQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let partition = path_params.get("partition").cloned().unwrap_or_default();
    let path = path_params.get("path").map(|p| format!("/{p}")).unwrap_or_default();
    match handle_resource(&state, method, &partition, &path, &query, &headers, body).await {
        Ok(response) => response,
        Err(error) => error.into_response(),
    }
}

async fn handle_resource(
    state: &AppState,
    method: Method,
    partition: &str,
    path: &str,
    query: &ResourceQuery,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, LdpError> {
    let inner = &*state.0;

    if !inner.config.partitions.iter().any(|p| p == partition) {
        return Err(LdpError::NotFound);
    }

    let mut request = crate::filters::build_request(headers, partition.to_string(), path.to_string(), query.ext.as_deref(), query.version.as_deref(), inner.config.base_url.clone())?;

    let now = chrono::Utc::now();
    let principal = extract_principal(headers);
    let session = crate::session::attach_session(principal.as_deref(), inner.agents.as_ref(), &inner.config.admin_role, now);

    let permission = crate::webac::required_permission(&method, request.extension)?;
    let identifier = request.external_identifier();
    let internal_identifier = request.internal_identifier();
    let auth = AuthContext { session: &session, identifier: &identifier, challenges: &inner.config.www_authenticate_challenges, access_control: inner.access_control.as_ref() };

    if method == Method::POST {
        auth.authorize_post().await?;
    } else {
        trellis_macros::require_permission!(auth, permission);
    }

    if request.extension == Some(Extension::TimeMap) {
        return handle_timemap(inner, &request, &method).await;
    }

    let existing = inner.resources.get(&internal_identifier).await?;

    if let Some(accept_datetime) = request.accept_datetime {
        if request.version.is_none() {
            let resource = existing.ok_or(LdpError::NotFound)?;
            crate::handlers::reject_tombstone(&resource)?;
            let location = match closest_memento(&resource.mementos, accept_datetime) {
                Some(range) => timegate_location(&identifier, range.from),
                None => identifier.clone(),
            };
            return Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response());
        }
    }

    let versioned = match request.version {
        Some(version) => inner
            .resources
            .get_at(&internal_identifier, version)
            .await?
            .map(|resource| MementoResource { resource, datetime: version }),
        None => None,
    };

    let parent_for_post = if method == Method::POST {
        let parent = existing.clone().ok_or(LdpError::NotFound)?;
        if !parent.interaction_model.is_container() {
            return Err(LdpError::MethodNotAllowed { allow: crate::response::allow_for(parent.interaction_model, false, request.extension == Some(Extension::Acl)) });
        }
        if request.extension != Some(Extension::Uploads) {
            let slug = resolve_child_slug(inner.resources.as_ref(), &internal_identifier, request.slug.as_deref()).await?;
            request.slug = Some(slug);
        }
        Some(parent)
    } else {
        None
    };

    let ctx = HandlerContext {
        request: &request,
        session: &session,
        resources: inner.resources.as_ref(),
        binaries: inner.binaries.as_ref(),
        io: inner.io.as_ref(),
        constraints: inner.constraints.as_ref(),
        access_control: inner.access_control.as_ref(),
        challenges: &inner.config.www_authenticate_challenges,
    };

    match method {
        Method::GET | Method::HEAD => {
            let (memento, resource) = match versioned {
                Some(memento) => (Some(memento.clone()), memento.resource),
                None => (None, existing.ok_or(LdpError::NotFound)?),
            };
            crate::handlers::get::handle(&ctx, memento, resource, method == Method::GET).await
        }
        Method::OPTIONS => {
            let resource = match &versioned {
                Some(memento) => &memento.resource,
                None => existing.as_ref().ok_or(LdpError::NotFound)?,
            };
            crate::handlers::options::handle(resource, versioned.is_some(), request.extension)
        }
        Method::POST => crate::handlers::post::handle(&ctx, parent_for_post.expect("resolved above"), body, now).await,
        Method::PUT => {
            let is_rdf = request.content_type.as_deref().map(crate::handlers::post_is_rdf_media_type).unwrap_or(false);
            let desired_model = crate::handlers::post::resolve_interaction_model(&request.link, request.content_type.as_deref(), is_rdf);
            crate::handlers::put::handle(&ctx, existing, desired_model, body, now).await
        }
        Method::PATCH => {
            let resource = existing.ok_or(LdpError::NotFound)?;
            let sparql = String::from_utf8(body.to_vec()).ok();
            crate::handlers::patch::handle(&ctx, resource, sparql, now).await
        }
        Method::DELETE => {
            let resource = existing.ok_or(LdpError::NotFound)?;
            crate::handlers::delete::handle(&ctx, resource, now).await
        }
        _ => Err(LdpError::MethodNotAllowed { allow: vec!["GET", "HEAD", "OPTIONS", "POST", "PUT", "PATCH", "DELETE"] }),
    }
}

/// `?ext=timemap` (§4.6): a link-format body by default, or an RDF
/// representation when the `Accept` header asks for one.
async fn handle_timemap(inner: &AppStateInner, request: &LdpRequest, method: &Method) -> Result<Response, LdpError> {
    let internal_identifier = request.internal_identifier();
    let identifier = request.external_identifier();
    let resource = inner.resources.get(&internal_identifier).await?.ok_or(LdpError::NotFound)?;
    crate::handlers::reject_tombstone(&resource)?;

    if *method == Method::OPTIONS {
        return crate::handlers::options::handle(&resource, false, Some(Extension::TimeMap));
    }
    if resource.mementos.is_empty() {
        return Err(LdpError::NotFound);
    }

    let wants_link_format = request.accept.is_empty() || request.accept.iter().any(|a| a.split(';').next().unwrap_or(a).trim() == "application/link-format");
    if wants_link_format {
        let body = timemap_link_format_body(&identifier, &resource.mementos);
        return axum::response::Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/link-format")
            .body(axum::body::Body::from(body))
            .map_err(|e| LdpError::Internal(e.to_string()));
    }

    let (negotiated, profile) = negotiate(&request.accept, None, &identifier)?;
    let syntax = match negotiated {
        Negotiated::Rdf(syntax) => syntax,
        Negotiated::Binary => return Err(LdpError::NotAcceptable),
    };
    let quads = timemap_quads(&identifier, &resource.mementos);
    let triples: Vec<oxrdf::Triple> = quads.into_iter().map(|q| oxrdf::Triple::new(q.subject, q.predicate, q.object)).collect();
    let body = inner.io.write(&triples, syntax, &profile)?;
    axum::response::Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, syntax.media_type())
        .body(axum::body::Body::from(body))
        .map_err(|e| LdpError::Internal(e.to_string()))
}

async fn upload_session(State(state): State<AppState>, method: Method, Path((partition, upload_id)): Path<(String, String)>, headers: HeaderMap, body: Bytes) -> Response {
    match handle_upload_session(&state, method, &partition, &upload_id, &headers, body).await {
        Ok(response) => response,
        Err(error) => error.into_response(),
    }
}

async fn handle_upload_session(state: &AppState, method: Method, partition: &str, upload_id: &str, headers: &HeaderMap, body: Bytes) -> Result<Response, LdpError> {
    let inner = &*state.0;
    let now = chrono::Utc::now();
    let principal = extract_principal(headers);
    let session = crate::session::attach_session(principal.as_deref(), inner.agents.as_ref(), &inner.config.admin_role, now);

    let resolver = inner.binaries.resolver_for(partition).ok_or(LdpError::NotFound)?;
    let target = resolver.target_for(upload_id).await?.ok_or(LdpError::NotFound)?;

    let auth = AuthContext { session: &session, identifier: &target, challenges: &inner.config.www_authenticate_challenges, access_control: inner.access_control.as_ref() };
    let permission = if method == Method::GET { crate::webac::Permission::Read } else { crate::webac::Permission::Write };
    trellis_macros::require_permission!(auth, permission);

    match method {
        Method::GET => crate::multipart::list_parts(resolver, upload_id).await,
        Method::POST => {
            let target_internal = crate::identifiers::to_internal(&target, &inner.config.base_url);
            let content_type = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).map(str::to_string);
            let mut request = blank_request(&inner.config.base_url, partition);
            request.content_type = content_type;
            let ctx = HandlerContext {
                request: &request,
                session: &session,
                resources: inner.resources.as_ref(),
                binaries: inner.binaries.as_ref(),
                io: inner.io.as_ref(),
                constraints: inner.constraints.as_ref(),
                access_control: inner.access_control.as_ref(),
                challenges: &inner.config.www_authenticate_challenges,
            };
            crate::multipart::complete(&ctx, upload_id, &target_internal, body, now).await
        }
        Method::DELETE => crate::multipart::abort(resolver, upload_id).await,
        _ => Err(LdpError::MethodNotAllowed { allow: vec!["GET", "POST", "DELETE"] }),
    }
}

async fn upload_part(State(state): State<AppState>, method: Method, Path((partition, upload_id, part_number)): Path<(String, String, u32)>, headers: HeaderMap, body: Bytes) -> Response {
    match handle_upload_part(&state, method, &partition, &upload_id, part_number, &headers, body).await {
        Ok(response) => response,
        Err(error) => error.into_response(),
    }
}

async fn handle_upload_part(
    state: &AppState,
    method: Method,
    partition: &str,
    upload_id: &str,
    part_number: u32,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, LdpError> {
    if method != Method::PUT {
        return Err(LdpError::MethodNotAllowed { allow: vec!["PUT"] });
    }
    let inner = &*state.0;
    let now = chrono::Utc::now();
    let principal = extract_principal(headers);
    let session = crate::session::attach_session(principal.as_deref(), inner.agents.as_ref(), &inner.config.admin_role, now);

    let resolver = inner.binaries.resolver_for(partition).ok_or(LdpError::NotFound)?;
    let target = resolver.target_for(upload_id).await?.ok_or(LdpError::NotFound)?;

    let auth = AuthContext { session: &session, identifier: &target, challenges: &inner.config.www_authenticate_challenges, access_control: inner.access_control.as_ref() };
    trellis_macros::require_permission!(auth, crate::webac::Permission::Write);

    let stream: futures::stream::BoxStream<'static, std::io::Result<Bytes>> = Box::pin(futures::stream::once(async move { Ok(body) }));
    crate::multipart::upload_part(resolver, upload_id, part_number, stream).await
}
