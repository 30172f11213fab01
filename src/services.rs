//! §6 External Interfaces: the collaborator traits this crate consumes.
//! A production deployment wires its own types behind these traits,
//! backed by a real store, binary service and SHACL/ShEx engine;
//! [`crate::memory`] ships the one concrete implementation this crate
//! carries itself, used as the `serve` command's zero-config fallback
//! and as the scenario tests' fixture.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::LdpError;
use crate::model::{Instant, Resource};

/// Persistent resource store.
#[async_trait]
pub trait ResourceService: Send + Sync {
    async fn get(&self, identifier: &str) -> Result<Option<Resource>, LdpError>;

    /// The closest memento at or before `when` (§4.6 TimeGate/versioned GET).
    async fn get_at(&self, identifier: &str, when: Instant) -> Result<Option<Resource>, LdpError>;

    async fn put(&self, identifier: &str, dataset: Vec<oxrdf::Quad>) -> Result<(), LdpError>;

    /// Replace a blank node with a stable IRI, stable across the
    /// resource's lifetime.
    fn skolemize(&self, bnode_id: &str) -> String;

    /// Inverse of [`ResourceService::skolemize`]; `None` if `iri` is not a
    /// skolemized blank node this service minted.
    fn unskolemize(&self, iri: &str) -> Option<String>;

    /// Mint a new, as-yet-unused resource identifier suffix, used by
    /// `PostHandler` when no `Slug` is given.
    fn next_identifier(&self) -> String;
}

/// Binary content store, including the multipart upload sub-protocol
/// (§4.8), reached through a per-partition [`BinaryResolver`].
#[async_trait]
pub trait BinaryService: Send + Sync {
    fn resolver_for(&self, partition: &str) -> Option<&dyn BinaryResolver>;
}

#[async_trait]
pub trait BinaryResolver: Send + Sync {
    async fn get_content(&self, identifier: &str) -> Result<BoxStream<'static, std::io::Result<Bytes>>, LdpError>;

    async fn set_content(
        &self,
        identifier: &str,
        content_type: &str,
        stream: BoxStream<'static, std::io::Result<Bytes>>,
    ) -> Result<u64, LdpError>;

    async fn purge_content(&self, identifier: &str) -> Result<(), LdpError>;

    /// Digest the named algorithm over the binary's stored content.
    async fn digest(&self, identifier: &str, algorithm: &str) -> Result<String, LdpError>;

    fn supported_algorithms(&self) -> Vec<String>;

    fn supports_multipart_upload(&self) -> bool;

    async fn initiate_upload(&self, target_iri: &str, content_type: &str) -> Result<String, LdpError>;

    async fn upload_part(
        &self,
        upload_id: &str,
        part_number: u32,
        stream: BoxStream<'static, std::io::Result<Bytes>>,
    ) -> Result<String, LdpError>;

    /// `{partNumber: digest, ...}` committed so far.
    async fn list_parts(&self, upload_id: &str) -> Result<Vec<(u32, String)>, LdpError>;

    /// Finalize the upload; returns the binary identifier and total size.
    async fn complete_upload(&self, upload_id: &str, parts: Vec<(u32, String)>) -> Result<(String, u64), LdpError>;

    async fn abort_upload(&self, upload_id: &str) -> Result<(), LdpError>;

    async fn upload_session_exists(&self, upload_id: &str) -> Result<bool, LdpError>;

    /// The target IRI `initiate_upload` was called with, so `completeUpload`
    /// (§4.8) knows where to persist the resulting `NonRDFSource`.
    async fn target_for(&self, upload_id: &str) -> Result<Option<String>, LdpError>;
}

/// RDF parsing/serialization — the RDF model library itself is out of
/// scope; this crate only depends on the trait.
#[async_trait]
pub trait IOService: Send + Sync {
    async fn read(
        &self,
        body: Bytes,
        base_iri: &str,
        syntax: crate::negotiation::RdfSyntax,
    ) -> Result<Vec<oxrdf::Triple>, LdpError>;

    fn write(
        &self,
        triples: &[oxrdf::Triple],
        syntax: crate::negotiation::RdfSyntax,
        profile: &str,
    ) -> Result<Bytes, LdpError>;

    /// Apply a SPARQL-Update body to `graph`, returning the resulting
    /// triples. A SPARQL syntax or evaluation failure is the caller's
    /// responsibility to map to 400 `Invalid RDF` (§4.7.5 step 3).
    fn update(&self, graph: &[oxrdf::Triple], sparql: &str, base_iri: &str) -> Result<Vec<oxrdf::Triple>, LdpError>;
}

/// RDF constraint validation (e.g. SHACL/ShEx shapes over a resource
/// type's graph).
#[async_trait]
pub trait ConstraintService: Send + Sync {
    /// `Some(iri)` names the violated constraint when `graph` is invalid
    /// for `interaction_model` at `base_url`.
    fn constrained_by(
        &self,
        interaction_model: crate::model::InteractionModel,
        base_url: &str,
        graph: &[oxrdf::Quad],
    ) -> Option<String>;
}

/// Resolves an authenticated principal name to an agent IRI.
pub trait AgentService: Send + Sync {
    fn as_agent(&self, principal_name: &str) -> String;

    fn is_admin(&self, _agent: &str) -> bool {
        false
    }
}

/// Access control decisions, driven by WebAC ACL graphs (§4.4).
#[async_trait]
pub trait AccessControlService: Send + Sync {
    async fn can_read(&self, session: &crate::model::Session, identifier: &str) -> bool;
    async fn can_write(&self, session: &crate::model::Session, identifier: &str) -> bool;
    async fn can_append(&self, session: &crate::model::Session, identifier: &str) -> bool;
    async fn can_control(&self, session: &crate::model::Session, identifier: &str) -> bool;

    /// Does an ACL graph exist that governs `identifier`? Drives the
    /// `Link; rel="acl"` response-filter advertisement (§4.5 (b)).
    async fn acl_for(&self, identifier: &str) -> Option<String>;
}
