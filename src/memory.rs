//! Reference in-memory implementations of the six §6 collaborator traits.
//! These are the only concrete trait implementations this crate ships: the
//! `serve` command falls back to them when no other backend is wired in, and
//! the scenario tests under `src/tests/` use them to exercise the method
//! handlers end to end. A real deployment brings its own, backed by a
//! database, a binary store, a SHACL engine and so on — nothing here
//! persists across a process restart.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::TimeZone;
use futures::stream::BoxStream;
use futures_util::StreamExt;
use rand::{Rng, SeedableRng};
use sha2::{Digest as _, Sha256};
use tokio::sync::RwLock;

use crate::error::LdpError;
use crate::model::{BinaryMetadata, Instant, InteractionModel, Resource, Session, VersionRange};
use crate::negotiation::RdfSyntax;
use crate::services::{AccessControlService, AgentService, BinaryResolver, BinaryService, ConstraintService, IOService, ResourceService};

fn subject_is(subject: &oxrdf::Subject, identifier: &str) -> bool {
    matches!(subject, oxrdf::Subject::NamedNode(n) if n.as_str() == identifier)
}

fn extract_types(identifier: &str, dataset: &[oxrdf::Quad]) -> HashSet<String> {
    dataset
        .iter()
        .filter_map(|q| {
            if subject_is(&q.subject, identifier) && q.predicate.as_str() == "http://www.w3.org/1999/02/22-rdf-syntax-ns#type" {
                match &q.object {
                    oxrdf::Term::NamedNode(n) => Some(n.as_str().to_string()),
                    _ => None,
                }
            } else {
                None
            }
        })
        .collect()
}

fn types_to_model(types: &HashSet<String>) -> Option<InteractionModel> {
    types.iter().filter_map(|t| InteractionModel::from_iri(t)).max_by_key(|m| m.ldp_resource_types().len())
}

/// The audit quad's literal is `"{activity}@{millis}"` (see
/// `handlers::audit_quad`); this is the one place that timestamp is read
/// back out, standing in for a real store's own clock/transaction log.
fn extract_modified(dataset: &[oxrdf::Quad]) -> Option<Instant> {
    dataset.iter().find_map(|q| {
        if q.predicate.as_str() != "http://www.w3.org/ns/prov#activity" {
            return None;
        }
        let oxrdf::Term::Literal(literal) = &q.object else { return None };
        let (_, millis) = literal.value().rsplit_once('@')?;
        chrono::Utc.timestamp_millis_opt(millis.parse().ok()?).single()
    })
}

fn extract_binary(identifier: &str, dataset: &[oxrdf::Quad], modified: Instant) -> Option<BinaryMetadata> {
    let binary_identifier = dataset.iter().find_map(|q| {
        if subject_is(&q.subject, identifier) && q.predicate.as_str() == "http://www.w3.org/ns/posix/stat#hasPart" {
            match &q.object {
                oxrdf::Term::NamedNode(n) => Some(n.as_str().to_string()),
                _ => None,
            }
        } else {
            None
        }
    })?;
    let mime_type = dataset
        .iter()
        .find_map(|q| {
            if subject_is(&q.subject, identifier) && q.predicate.as_str() == "http://purl.org/dc/terms/format" {
                match &q.object {
                    oxrdf::Term::Literal(l) => Some(l.value().to_string()),
                    _ => None,
                }
            } else {
                None
            }
        })
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let size = dataset
        .iter()
        .find_map(|q| {
            if subject_is(&q.subject, identifier) && q.predicate.as_str() == "http://purl.org/dc/terms/extent" {
                match &q.object {
                    oxrdf::Term::Literal(l) => l.value().parse::<u64>().ok(),
                    _ => None,
                }
            } else {
                None
            }
        })
        .unwrap_or(0);
    Some(BinaryMetadata { identifier: binary_identifier, mime_type, size, modified })
}

/// A random base62 slug, the harness's stand-in for whatever identifier
/// minting scheme a real `ResourceService` uses for `next_identifier`.
fn random_slug(rng: &mut impl rand_core::RngCore, len: usize) -> String {
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    (0..len).map(|_| CHARS[rng.random_range(0..CHARS.len())] as char).collect()
}

/// In-memory resource store. `put` derives every `Resource` field a real
/// backend would persist by inspecting the dataset the handlers build,
/// and chains the previous snapshot into `history` so `get_at` can answer
/// versioned reads (§4.6).
#[derive(Default)]
pub struct InMemoryResourceService {
    resources: RwLock<HashMap<String, Resource>>,
    history: RwLock<HashMap<String, Vec<Resource>>>,
    skolems: StdMutex<HashMap<String, String>>,
}

#[async_trait]
impl ResourceService for InMemoryResourceService {
    async fn get(&self, identifier: &str) -> Result<Option<Resource>, LdpError> {
        Ok(self.resources.read().await.get(identifier).cloned())
    }

    async fn get_at(&self, identifier: &str, when: Instant) -> Result<Option<Resource>, LdpError> {
        let mut timeline = self.history.read().await.get(identifier).cloned().unwrap_or_default();
        if let Some(current) = self.resources.read().await.get(identifier).cloned() {
            timeline.push(current);
        }
        timeline.sort_by_key(|r| r.modified);
        for (index, snapshot) in timeline.iter().enumerate() {
            let still_active = match timeline.get(index + 1) {
                Some(next) => snapshot.modified <= when && when < next.modified,
                None => snapshot.modified <= when,
            };
            if still_active {
                return Ok(Some(snapshot.clone()));
            }
        }
        Ok(None)
    }

    async fn put(&self, identifier: &str, dataset: Vec<oxrdf::Quad>) -> Result<(), LdpError> {
        let mut resources = self.resources.write().await;
        let mut history = self.history.write().await;

        let previous = resources.get(identifier).cloned();
        let modified = extract_modified(&dataset).unwrap_or_else(chrono::Utc::now);
        let types = extract_types(identifier, &dataset);
        let binary = extract_binary(identifier, &dataset, modified);

        let mut mementos = previous.as_ref().map(|p| p.mementos.clone()).unwrap_or_default();
        if let Some(previous) = &previous {
            mementos.push(VersionRange::new(previous.modified, modified));
        }

        let resource = Resource {
            identifier: identifier.to_string(),
            interaction_model: types_to_model(&types).unwrap_or(InteractionModel::Resource),
            modified,
            types,
            inbox: None,
            annotation_service: None,
            mementos,
            binary,
            quads: dataset,
        };

        if let Some(previous) = previous {
            history.entry(identifier.to_string()).or_default().push(previous);
        }
        resources.insert(identifier.to_string(), resource);
        Ok(())
    }

    fn skolemize(&self, bnode_id: &str) -> String {
        let mut skolems = self.skolems.lock().unwrap();
        if let Some(existing) = skolems.get(bnode_id) {
            return existing.clone();
        }
        let iri = format!("trellis:bnode/{}", uuid::Uuid::now_v7());
        skolems.insert(bnode_id.to_string(), iri.clone());
        iri
    }

    fn unskolemize(&self, iri: &str) -> Option<String> {
        self.skolems.lock().unwrap().iter().find(|(_, v)| v.as_str() == iri).map(|(k, _)| k.clone())
    }

    fn next_identifier(&self) -> String {
        let mut rng = rand::rngs::StdRng::from_os_rng();
        random_slug(&mut rng, 8)
    }
}

struct UploadSession {
    target: String,
    parts: std::collections::BTreeMap<u32, (String, Bytes)>,
}

/// One resolver per configured partition, sharing nothing across partitions
/// - matching the real deployment's per-partition binary store boundary.
#[derive(Default)]
pub struct InMemoryBinaryResolver {
    content: RwLock<HashMap<String, Bytes>>,
    uploads: RwLock<HashMap<String, UploadSession>>,
}

async fn collect(mut stream: BoxStream<'static, std::io::Result<Bytes>>) -> Result<Bytes, LdpError> {
    let mut buf = bytes::BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

fn digest_of(algorithm: &str, content: &[u8]) -> Result<String, LdpError> {
    match algorithm {
        "MD5" => Ok(format!("{:x}", md5::compute(content))),
        "SHA-256" => Ok(hex::encode(Sha256::digest(content))),
        other => Err(LdpError::BadRequest(format!("unsupported digest algorithm {other}"))),
    }
}

#[async_trait]
impl BinaryResolver for InMemoryBinaryResolver {
    async fn get_content(&self, identifier: &str) -> Result<BoxStream<'static, std::io::Result<Bytes>>, LdpError> {
        let bytes = self.content.read().await.get(identifier).cloned().ok_or(LdpError::NotFound)?;
        Ok(Box::pin(futures::stream::once(async move { Ok(bytes) })))
    }

    async fn set_content(&self, identifier: &str, _content_type: &str, stream: BoxStream<'static, std::io::Result<Bytes>>) -> Result<u64, LdpError> {
        let bytes = collect(stream).await?;
        let size = bytes.len() as u64;
        self.content.write().await.insert(identifier.to_string(), bytes);
        Ok(size)
    }

    async fn purge_content(&self, identifier: &str) -> Result<(), LdpError> {
        self.content.write().await.remove(identifier);
        Ok(())
    }

    async fn digest(&self, identifier: &str, algorithm: &str) -> Result<String, LdpError> {
        let content = self.content.read().await;
        let bytes = content.get(identifier).ok_or(LdpError::NotFound)?;
        digest_of(algorithm, bytes)
    }

    fn supported_algorithms(&self) -> Vec<String> {
        vec!["MD5".to_string(), "SHA-256".to_string()]
    }

    fn supports_multipart_upload(&self) -> bool {
        true
    }

    async fn initiate_upload(&self, target_iri: &str, _content_type: &str) -> Result<String, LdpError> {
        let upload_id = uuid::Uuid::now_v7().to_string();
        self.uploads.write().await.insert(
            upload_id.clone(),
            UploadSession { target: target_iri.to_string(), parts: Default::default() },
        );
        Ok(upload_id)
    }

    async fn upload_part(&self, upload_id: &str, part_number: u32, stream: BoxStream<'static, std::io::Result<Bytes>>) -> Result<String, LdpError> {
        let bytes = collect(stream).await?;
        let digest = digest_of("SHA-256", &bytes)?;
        let mut uploads = self.uploads.write().await;
        let session = uploads.get_mut(upload_id).ok_or(LdpError::NotFound)?;
        session.parts.insert(part_number, (digest.clone(), bytes));
        Ok(digest)
    }

    async fn list_parts(&self, upload_id: &str) -> Result<Vec<(u32, String)>, LdpError> {
        let uploads = self.uploads.read().await;
        let session = uploads.get(upload_id).ok_or(LdpError::NotFound)?;
        Ok(session.parts.iter().map(|(n, (digest, _))| (*n, digest.clone())).collect())
    }

    async fn complete_upload(&self, upload_id: &str, parts: Vec<(u32, String)>) -> Result<(String, u64), LdpError> {
        let mut uploads = self.uploads.write().await;
        let session = uploads.remove(upload_id).ok_or(LdpError::NotFound)?;

        let mut assembled = bytes::BytesMut::new();
        for (number, expected_digest) in &parts {
            let (digest, bytes) = session.parts.get(number).ok_or_else(|| LdpError::BadRequest(format!("missing part {number}")))?;
            if digest != expected_digest {
                return Err(LdpError::BadRequest(format!("digest mismatch for part {number}")));
            }
            assembled.extend_from_slice(bytes);
        }

        let binary_identifier = format!("trellis:binary/{}", uuid::Uuid::now_v7());
        let content = assembled.freeze();
        let size = content.len() as u64;
        self.content.write().await.insert(binary_identifier.clone(), content);
        Ok((binary_identifier, size))
    }

    async fn abort_upload(&self, upload_id: &str) -> Result<(), LdpError> {
        self.uploads.write().await.remove(upload_id);
        Ok(())
    }

    async fn upload_session_exists(&self, upload_id: &str) -> Result<bool, LdpError> {
        Ok(self.uploads.read().await.contains_key(upload_id))
    }

    async fn target_for(&self, upload_id: &str) -> Result<Option<String>, LdpError> {
        Ok(self.uploads.read().await.get(upload_id).map(|s| s.target.clone()))
    }
}

/// Dispatches to one [`InMemoryBinaryResolver`] per configured partition.
#[derive(Default)]
pub struct InMemoryBinaryService {
    resolvers: HashMap<String, InMemoryBinaryResolver>,
}

impl InMemoryBinaryService {
    pub fn new(partitions: &[String]) -> Self {
        Self { resolvers: partitions.iter().map(|p| (p.clone(), InMemoryBinaryResolver::default())).collect() }
    }
}

impl BinaryService for InMemoryBinaryService {
    fn resolver_for(&self, partition: &str) -> Option<&dyn BinaryResolver> {
        self.resolvers.get(partition).map(|r| r as &dyn BinaryResolver)
    }
}

fn rio_term(term: &oxrdf::Term) -> rio_api::model::Term<'_> {
    match term {
        oxrdf::Term::NamedNode(n) => rio_api::model::Term::NamedNode(rio_api::model::NamedNode { iri: n.as_str() }),
        oxrdf::Term::BlankNode(b) => rio_api::model::Term::BlankNode(rio_api::model::BlankNode { id: b.as_str() }),
        oxrdf::Term::Literal(l) => {
            if let Some(language) = l.language() {
                rio_api::model::Term::Literal(rio_api::model::Literal::LanguageTaggedString { value: l.value(), language })
            } else if l.datatype().as_str() == "http://www.w3.org/2001/XMLSchema#string" {
                rio_api::model::Term::Literal(rio_api::model::Literal::Simple { value: l.value() })
            } else {
                rio_api::model::Term::Literal(rio_api::model::Literal::Typed { value: l.value(), datatype: rio_api::model::NamedNode { iri: l.datatype().as_str() } })
            }
        }
        oxrdf::Term::Triple(_) => unreachable!("RDF-star is not part of this model"),
    }
}

fn rio_subject(subject: &oxrdf::Subject) -> rio_api::model::Subject<'_> {
    match subject {
        oxrdf::Subject::NamedNode(n) => rio_api::model::Subject::NamedNode(rio_api::model::NamedNode { iri: n.as_str() }),
        oxrdf::Subject::BlankNode(b) => rio_api::model::Subject::BlankNode(rio_api::model::BlankNode { id: b.as_str() }),
        oxrdf::Subject::Triple(_) => unreachable!("RDF-star is not part of this model"),
    }
}

fn to_oxrdf_term(term: rio_api::model::Term<'_>) -> oxrdf::Term {
    match term {
        rio_api::model::Term::NamedNode(n) => oxrdf::Term::NamedNode(oxrdf::NamedNode::new_unchecked(n.iri)),
        rio_api::model::Term::BlankNode(b) => oxrdf::Term::BlankNode(oxrdf::BlankNode::new_unchecked(b.id)),
        rio_api::model::Term::Literal(l) => oxrdf::Term::Literal(match l {
            rio_api::model::Literal::Simple { value } => oxrdf::Literal::new_simple_literal(value),
            rio_api::model::Literal::LanguageTaggedString { value, language } => {
                oxrdf::Literal::new_language_tagged_literal_unchecked(value, language)
            }
            rio_api::model::Literal::Typed { value, datatype } => oxrdf::Literal::new_typed_literal(value, oxrdf::NamedNode::new_unchecked(datatype.iri)),
        }),
        rio_api::model::Term::Triple(_) => unreachable!("RDF-star is not part of this model"),
    }
}

fn to_oxrdf_subject(subject: rio_api::model::Subject<'_>) -> oxrdf::Subject {
    match subject {
        rio_api::model::Subject::NamedNode(n) => oxrdf::Subject::NamedNode(oxrdf::NamedNode::new_unchecked(n.iri)),
        rio_api::model::Subject::BlankNode(b) => oxrdf::Subject::BlankNode(oxrdf::BlankNode::new_unchecked(b.id)),
        rio_api::model::Subject::Triple(_) => unreachable!("RDF-star is not part of this model"),
    }
}

fn parse_turtle(body: &[u8]) -> Result<Vec<oxrdf::Triple>, LdpError> {
    use rio_api::parser::TriplesParser;
    let mut triples = Vec::new();
    let mut parser = rio_turtle::TurtleParser::new(body, None);
    parser
        .parse_all(&mut |t| {
            triples.push(oxrdf::Triple::new(to_oxrdf_subject(t.subject), oxrdf::NamedNode::new_unchecked(t.predicate.iri), to_oxrdf_term(t.object)));
            Ok(())
        })
        .map_err(|e| LdpError::BadRequest(format!("Turtle parse error: {e}")))?;
    Ok(triples)
}

fn format_turtle(triples: &[oxrdf::Triple]) -> Result<Bytes, LdpError> {
    use rio_turtle::TurtleFormatter;
    let mut formatter = TurtleFormatter::new(Vec::new());
    for triple in triples {
        let rio_triple = rio_api::model::Triple {
            subject: rio_subject(&triple.subject),
            predicate: rio_api::model::NamedNode { iri: triple.predicate.as_str() },
            object: rio_term(&triple.object),
        };
        formatter.format(&rio_triple).map_err(|e| LdpError::Internal(e.to_string()))?;
    }
    let bytes = formatter.finish().map_err(|e| LdpError::Internal(e.to_string()))?;
    Ok(Bytes::from(bytes))
}

fn format_ntriples(triples: &[oxrdf::Triple]) -> Bytes {
    let mut out = String::new();
    for triple in triples {
        out.push_str(&format!("{} .\n", triple));
    }
    Bytes::from(out)
}

/// `INSERT DATA { .. }`/`DELETE DATA { .. }` block extraction, case
/// insensitive, spanning the first `{` to the last `}` - sufficient for
/// the single-block updates these tests issue.
fn extract_data_block(sparql: &str, keyword: &str) -> Option<String> {
    let pattern = regex::RegexBuilder::new(&format!(r"{keyword}\s*\{{(.*)\}}")).case_insensitive(true).dot_matches_new_line(true).build().ok()?;
    pattern.captures(sparql).map(|c| c[1].to_string())
}

fn triples_equal(a: &oxrdf::Triple, b: &oxrdf::Triple) -> bool {
    a.subject == b.subject && a.predicate == b.predicate && a.object == b.object
}

/// Validates general SPARQL-Update syntax via `spargebra`, then applies
/// the `INSERT DATA`/`DELETE DATA` forms by parsing their block contents
/// as Turtle. `DELETE WHERE`/`DELETE .. INSERT .. WHERE` forms are out of
/// scope for this harness - a real `IOService` would evaluate the full
/// SPARQL 1.1 Update grammar.
fn apply_sparql_update(graph: &[oxrdf::Triple], sparql: &str, base_iri: &str) -> Result<Vec<oxrdf::Triple>, LdpError> {
    spargebra::Update::parse(sparql, Some(base_iri)).map_err(|e| LdpError::BadRequest(format!("SPARQL-Update parse error: {e}")))?;

    let mut current = graph.to_vec();
    if let Some(block) = extract_data_block(sparql, "INSERT DATA") {
        current.extend(parse_turtle(block.as_bytes())?);
    }
    if let Some(block) = extract_data_block(sparql, "DELETE DATA") {
        let removed = parse_turtle(block.as_bytes())?;
        current.retain(|t| !removed.iter().any(|r| triples_equal(r, t)));
    }
    Ok(current)
}

#[derive(Default)]
pub struct InMemoryIOService;

#[async_trait]
impl IOService for InMemoryIOService {
    async fn read(&self, body: Bytes, _base_iri: &str, syntax: RdfSyntax) -> Result<Vec<oxrdf::Triple>, LdpError> {
        match syntax {
            RdfSyntax::Turtle => parse_turtle(&body),
            _ => Err(LdpError::UnsupportedMediaType),
        }
    }

    fn write(&self, triples: &[oxrdf::Triple], syntax: RdfSyntax, _profile: &str) -> Result<Bytes, LdpError> {
        match syntax {
            RdfSyntax::Turtle => format_turtle(triples),
            RdfSyntax::NTriples => Ok(format_ntriples(triples)),
            _ => Err(LdpError::NotAcceptable),
        }
    }

    fn update(&self, graph: &[oxrdf::Triple], sparql: &str, base_iri: &str) -> Result<Vec<oxrdf::Triple>, LdpError> {
        apply_sparql_update(graph, sparql, base_iri)
    }
}

/// No real shape validation - every graph is accepted, except a graph
/// tagged with the sentinel predicate below (a fixture for exercising the
/// 409 constraint-violation path).
#[derive(Default)]
pub struct InMemoryConstraintService;

const FORBIDDEN_PREDICATE: &str = "http://example.test/ns#forbidden";
const CONSTRAINT_IRI: &str = "http://example.test/ns#ForbiddenPredicateConstraint";

impl ConstraintService for InMemoryConstraintService {
    fn constrained_by(&self, _interaction_model: InteractionModel, _base_url: &str, graph: &[oxrdf::Quad]) -> Option<String> {
        graph.iter().any(|q| q.predicate.as_str() == FORBIDDEN_PREDICATE).then(|| CONSTRAINT_IRI.to_string())
    }
}

#[derive(Default)]
pub struct InMemoryAgentService;

impl AgentService for InMemoryAgentService {
    fn as_agent(&self, principal_name: &str) -> String {
        format!("http://example.test/agents/{principal_name}")
    }
}

/// Every session may read and write everything except identifiers listed
/// in `denied_for_anonymous`, which anonymous sessions may not read -
/// enough to exercise the 401/403 paths (P scenarios 6 and the WebAC
/// permission matrix) without a real ACL graph evaluator.
#[derive(Default)]
pub struct InMemoryAccessControlService {
    pub denied_for_anonymous: StdMutex<HashSet<String>>,
    pub acl_present: StdMutex<HashSet<String>>,
}

#[async_trait]
impl AccessControlService for InMemoryAccessControlService {
    async fn can_read(&self, session: &Session, identifier: &str) -> bool {
        !(session.is_anonymous() && self.denied_for_anonymous.lock().unwrap().contains(identifier))
    }

    async fn can_write(&self, session: &Session, _identifier: &str) -> bool {
        !session.is_anonymous()
    }

    async fn can_append(&self, session: &Session, _identifier: &str) -> bool {
        !session.is_anonymous()
    }

    async fn can_control(&self, session: &Session, _identifier: &str) -> bool {
        !session.is_anonymous()
    }

    async fn acl_for(&self, identifier: &str) -> Option<String> {
        self.acl_present.lock().unwrap().contains(identifier).then(|| format!("{identifier}?ext=acl"))
    }
}
