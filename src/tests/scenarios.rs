use axum::http::StatusCode;
use bytes::Bytes;
use oxrdf::{GraphName, Literal, NamedNode, Quad, Subject, Term};

use crate::handlers::{audit_quad, HandlerContext};
use crate::memory::{
    InMemoryAccessControlService, InMemoryBinaryService, InMemoryConstraintService, InMemoryIOService, InMemoryResourceService,
};
use crate::model::{InteractionModel, LdpRequest, PreferGraph, Session};
use crate::services::{AccessControlService, BinaryResolver, BinaryService, ResourceService};

fn type_quad(identifier: &str, model: InteractionModel) -> Quad {
    Quad::new(
        Subject::NamedNode(NamedNode::new_unchecked(identifier)),
        NamedNode::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#type"),
        Term::NamedNode(NamedNode::new_unchecked(model.iri())),
        GraphName::NamedNode(NamedNode::new_unchecked(PreferGraph::ServerManaged.iri())),
    )
}

fn user_triple(identifier: &str, predicate: &str, value: &str) -> Quad {
    Quad::new(
        Subject::NamedNode(NamedNode::new_unchecked(identifier)),
        NamedNode::new_unchecked(predicate),
        Term::Literal(Literal::new_simple_literal(value)),
        GraphName::NamedNode(NamedNode::new_unchecked(PreferGraph::UserManaged.iri())),
    )
}

/// Wires up one instance of every collaborator trait's reference
/// implementation, the way `src/web/mod.rs`'s `AppStateInner` does for a
/// real deployment, minus the HTTP plumbing.
struct Fixture {
    resources: InMemoryResourceService,
    binaries: InMemoryBinaryService,
    io: InMemoryIOService,
    constraints: InMemoryConstraintService,
    access_control: InMemoryAccessControlService,
    challenges: Vec<String>,
    base_url: String,
}

impl Fixture {
    fn new() -> Self {
        Self {
            resources: InMemoryResourceService::default(),
            binaries: InMemoryBinaryService::new(&["default".to_string()]),
            io: InMemoryIOService::default(),
            constraints: InMemoryConstraintService::default(),
            access_control: InMemoryAccessControlService::default(),
            challenges: vec!["Basic".to_string()],
            base_url: "http://example.test".to_string(),
        }
    }

    fn request(&self, path: &str) -> LdpRequest {
        LdpRequest {
            partition: "default".to_string(),
            path: path.to_string(),
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
            base_url: self.base_url.clone(),
        }
    }

    fn ctx<'a>(&'a self, request: &'a LdpRequest, session: &'a Session) -> HandlerContext<'a> {
        HandlerContext {
            request,
            session,
            resources: &self.resources,
            binaries: &self.binaries,
            io: &self.io,
            constraints: &self.constraints,
            access_control: &self.access_control,
            challenges: &self.challenges,
        }
    }
}

#[tokio::test]
async fn basic_container_get_returns_turtle_with_the_stored_triple() {
    let fixture = Fixture::new();
    let now = chrono::Utc::now();
    let internal = "trellis:default/a";

    fixture
        .resources
        .put(
            internal,
            vec![
                audit_quad(internal, "Creation", now),
                type_quad(internal, InteractionModel::BasicContainer),
                user_triple(internal, "http://purl.org/dc/terms/title", "Scenario One"),
            ],
        )
        .await
        .unwrap();
    let resource = fixture.resources.get(internal).await.unwrap().unwrap();

    let mut request = fixture.request("/a");
    request.accept = vec!["text/turtle".to_string()];
    let session = Session::admin(now);
    let ctx = fixture.ctx(&request, &session);

    let response = crate::handlers::get::handle(&ctx, None, resource, true).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "text/turtle");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("Scenario One"), "body was: {text}");
}

#[tokio::test]
async fn matching_if_none_match_is_a_cache_hit() {
    let fixture = Fixture::new();
    let now = chrono::Utc::now();
    let internal = "trellis:default/b";

    fixture
        .resources
        .put(internal, vec![audit_quad(internal, "Creation", now), type_quad(internal, InteractionModel::RDFSource)])
        .await
        .unwrap();
    let resource = fixture.resources.get(internal).await.unwrap().unwrap();
    let etag = crate::response::ETag::for_rdf(resource.modified, "http://example.test/default/b");

    let mut request = fixture.request("/b");
    request.if_none_match = Some(etag.header_value());
    let session = Session::admin(now);
    let ctx = fixture.ctx(&request, &session);

    let resource_again = fixture.resources.get(internal).await.unwrap().unwrap();
    let result = crate::handlers::get::handle(&ctx, None, resource_again, true).await;
    assert!(matches!(result, Err(crate::error::LdpError::NotModified)));
}

#[tokio::test]
async fn put_twice_builds_a_memento_the_timemap_lists() {
    let fixture = Fixture::new();
    let t0 = chrono::Utc::now();
    let t1 = t0 + chrono::Duration::seconds(5);
    let internal = "trellis:default/c";
    let external = "http://example.test/default/c";

    fixture
        .resources
        .put(internal, vec![audit_quad(internal, "Creation", t0), type_quad(internal, InteractionModel::RDFSource)])
        .await
        .unwrap();
    fixture
        .resources
        .put(internal, vec![audit_quad(internal, "Update", t1), type_quad(internal, InteractionModel::RDFSource)])
        .await
        .unwrap();

    let current = fixture.resources.get(internal).await.unwrap().unwrap();
    assert_eq!(current.mementos.len(), 1);
    assert_eq!(current.mementos[0].from, t0);

    let body = crate::memento::timemap_link_format_body(external, &current.mementos);
    assert!(body.contains("rel=\"memento\""));
    assert!(body.contains("rel=\"timemap\""));

    let historical = fixture.resources.get_at(internal, t0 + chrono::Duration::seconds(1)).await.unwrap().unwrap();
    assert_eq!(historical.modified, t0);
}

#[tokio::test]
async fn range_past_the_end_of_a_binary_is_clamped_not_416() {
    let fixture = Fixture::new();
    let now = chrono::Utc::now();
    let internal = "trellis:default/d";
    let content = Bytes::from_static(b"hello world");

    let resolver = fixture.binaries.resolver_for("default").unwrap();
    resolver.set_content(internal, "text/plain", Box::pin(futures::stream::once(async move { Ok(content.clone()) }))).await.unwrap();

    fixture
        .resources
        .put(
            internal,
            vec![
                audit_quad(internal, "Creation", now),
                type_quad(internal, InteractionModel::NonRDFSource),
                Quad::new(
                    Subject::NamedNode(NamedNode::new_unchecked(internal)),
                    NamedNode::new_unchecked("http://www.w3.org/ns/posix/stat#hasPart"),
                    Term::NamedNode(NamedNode::new_unchecked(internal)),
                    GraphName::NamedNode(NamedNode::new_unchecked(PreferGraph::ServerManaged.iri())),
                ),
                Quad::new(
                    Subject::NamedNode(NamedNode::new_unchecked(internal)),
                    NamedNode::new_unchecked("http://purl.org/dc/terms/extent"),
                    Term::Literal(Literal::new_typed_literal("11", NamedNode::new_unchecked("http://www.w3.org/2001/XMLSchema#long"))),
                    GraphName::NamedNode(NamedNode::new_unchecked(PreferGraph::ServerManaged.iri())),
                ),
                Quad::new(
                    Subject::NamedNode(NamedNode::new_unchecked(internal)),
                    NamedNode::new_unchecked("http://purl.org/dc/terms/format"),
                    Term::Literal(Literal::new_simple_literal("text/plain")),
                    GraphName::NamedNode(NamedNode::new_unchecked(PreferGraph::ServerManaged.iri())),
                ),
            ],
        )
        .await
        .unwrap();

    let resource = fixture.resources.get(internal).await.unwrap().unwrap();
    assert!(resource.binary.is_some());

    let mut request = fixture.request("/d");
    request.range = Some(crate::headers::range::Range::parse("bytes=5-999").unwrap());
    let session = Session::admin(now);
    let ctx = fixture.ctx(&request, &session);

    let response = crate::handlers::get::handle(&ctx, None, resource, true).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b" world");
}

#[tokio::test]
async fn putting_binary_content_populates_metadata_for_a_later_range_get() {
    let fixture = Fixture::new();
    let now = chrono::Utc::now();
    let internal = "trellis:default/g";

    let mut request = fixture.request("/g");
    request.content_type = Some("text/plain".to_string());
    let session = Session::admin(now);
    let ctx = fixture.ctx(&request, &session);

    let response = crate::handlers::put::handle(&ctx, None, InteractionModel::NonRDFSource, Bytes::from_static(b"hello world"), now)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let resource = fixture.resources.get(internal).await.unwrap().unwrap();
    let binary = resource.binary.expect("PUT should have recorded binary metadata");
    assert_eq!(binary.size, 11);
    assert_eq!(binary.mime_type, "text/plain");

    let mut range_request = fixture.request("/g");
    range_request.range = Some(crate::headers::range::Range::parse("bytes=5-999").unwrap());
    let range_ctx = fixture.ctx(&range_request, &session);
    let get_response = crate::handlers::get::handle(&range_ctx, None, resource, true).await.unwrap();
    assert_eq!(get_response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(get_response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b" world");
}

#[tokio::test]
async fn posting_a_second_child_with_the_same_slug_conflicts() {
    let fixture = Fixture::new();
    let now = chrono::Utc::now();
    let parent_internal = "trellis:default/container";

    fixture
        .resources
        .put(parent_internal, vec![audit_quad(parent_internal, "Creation", now), type_quad(parent_internal, InteractionModel::BasicContainer)])
        .await
        .unwrap();
    let child_internal = format!("{parent_internal}/taken");
    fixture
        .resources
        .put(&child_internal, vec![audit_quad(&child_internal, "Creation", now), type_quad(&child_internal, InteractionModel::RDFSource)])
        .await
        .unwrap();

    let result = crate::web::resolve_child_slug(&fixture.resources, parent_internal, Some("taken")).await;
    assert!(matches!(result, Err(crate::error::LdpError::Conflict(..))));

    let ok = crate::web::resolve_child_slug(&fixture.resources, parent_internal, Some("free")).await;
    assert_eq!(ok.unwrap(), "free");
}

#[tokio::test]
async fn anonymous_session_denied_read_gets_401_with_configured_challenges() {
    let fixture = Fixture::new();
    let now = chrono::Utc::now();
    let identifier = "http://example.test/default/e";
    fixture.access_control.denied_for_anonymous.lock().unwrap().insert(identifier.to_string());

    let session = Session::anonymous(now);
    let auth = crate::webac::AuthContext {
        session: &session,
        identifier,
        challenges: &fixture.challenges,
        access_control: &fixture.access_control,
    };

    let result = auth.authorize(crate::webac::Permission::Read).await;
    match result {
        Err(crate::error::LdpError::Unauthorized { challenges }) => assert_eq!(challenges, vec!["Basic".to_string()]),
        other => panic!("expected Unauthorized, got {other:?}"),
    }
}

#[tokio::test]
async fn deleting_a_resource_tombstones_it_and_subsequent_gets_are_gone() {
    let fixture = Fixture::new();
    let now = chrono::Utc::now();
    let internal = "trellis:default/f";

    fixture
        .resources
        .put(internal, vec![audit_quad(internal, "Creation", now), type_quad(internal, InteractionModel::RDFSource)])
        .await
        .unwrap();
    let resource = fixture.resources.get(internal).await.unwrap().unwrap();

    let request = fixture.request("/f");
    let session = Session::admin(now);
    let ctx = fixture.ctx(&request, &session);

    let response = crate::handlers::delete::handle(&ctx, resource, now + chrono::Duration::seconds(1)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let tombstoned = fixture.resources.get(internal).await.unwrap().unwrap();
    assert!(tombstoned.is_deleted());

    let get_result = crate::handlers::get::handle(&ctx, None, tombstoned, true).await;
    assert!(matches!(get_result, Err(crate::error::LdpError::Gone)));
}
