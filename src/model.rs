//! Core data model: §3 of the spec.
//!
//! Types here are plain data — no I/O, no backend awareness. `Resource` is
//! what a [`crate::services::ResourceService`] hands back; everything else
//! is built up while handling a single request and never shared across
//! requests (see §5, Concurrency & Resource Model).

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use oxrdf::{GraphName, Quad};
use serde::{Deserialize, Serialize};

/// An instant in time. All mementos, `Last-Modified` and `Memento-Datetime`
/// values are built from this.
pub type Instant = DateTime<Utc>;

/// The well-known named graphs a [`Resource`] partitions its quads into.
/// Matches the IRIs LDP/Trellis use for `Prefer` inclusion/omission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, enum_iterator::Sequence)]
pub enum PreferGraph {
    UserManaged,
    ServerManaged,
    Audit,
    AccessControl,
    Containment,
    Membership,
}

impl PreferGraph {
    /// The IRI this graph is addressed by, used both as the quad's
    /// `GraphName` and as a `Prefer: include=".."`/`omit=".."` token.
    pub fn iri(&self) -> &'static str {
        match self {
            Self::UserManaged => "http://www.trellisldp.org/ns/trellis#PreferUserManaged",
            Self::ServerManaged => "http://www.trellisldp.org/ns/trellis#PreferServerManaged",
            Self::Audit => "http://www.trellisldp.org/ns/trellis#PreferAudit",
            Self::AccessControl => "http://www.trellisldp.org/ns/trellis#PreferAccessControl",
            Self::Containment => "http://www.w3.org/ns/ldp#PreferContainment",
            Self::Membership => "http://www.w3.org/ns/ldp#PreferMembership",
        }
    }

    /// The three graphs included by default when no `Prefer` header is sent.
    pub fn defaults() -> [Self; 3] {
        [Self::UserManaged, Self::Containment, Self::Membership]
    }

    pub fn from_iri(iri: &str) -> Option<Self> {
        enum_iterator::all::<Self>().find(|g| g.iri() == iri)
    }

    pub fn matches_graph_name(&self, name: &GraphName) -> bool {
        matches!(name, GraphName::NamedNode(n) if n.as_str() == self.iri())
    }
}

/// The LDP interaction model of a resource. Ordering here is the sub-class
/// chain referenced by invariant I4 and `ldpResourceTypes`: `Resource` is
/// the root; `RDFSource`/`NonRDFSource` are its direct children;
/// `Container`/`BasicContainer`/`DirectContainer`/`IndirectContainer` are
/// `RDFSource`'s descendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, enum_iterator::Sequence)]
pub enum InteractionModel {
    Resource,
    RDFSource,
    NonRDFSource,
    Container,
    BasicContainer,
    DirectContainer,
    IndirectContainer,
}

impl InteractionModel {
    pub const LDP_NS: &'static str = "http://www.w3.org/ns/ldp#";

    pub fn iri(&self) -> String {
        format!("{}{:?}", Self::LDP_NS, self)
    }

    pub fn from_iri(iri: &str) -> Option<Self> {
        let name = iri.strip_prefix(Self::LDP_NS)?;
        enum_iterator::all::<Self>().find(|m| format!("{m:?}") == name)
    }

    /// True if this model is a container of any flavour.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Self::Container | Self::BasicContainer | Self::DirectContainer | Self::IndirectContainer
        )
    }

    /// The super-class chain from this model up to `Resource`, e.g.
    /// `BasicContainer` -> `[BasicContainer, Container, RDFSource, Resource]`.
    /// Used both to build the `Link; rel="type"` headers (§4.7.1) and to
    /// check invariant I4 (`PutHandler`, §4.7.4).
    pub fn ldp_resource_types(&self) -> Vec<Self> {
        let mut chain = vec![*self];
        match self {
            Self::Resource => {}
            Self::NonRDFSource => chain.push(Self::Resource),
            Self::RDFSource => chain.push(Self::Resource),
            Self::Container => {
                chain.push(Self::RDFSource);
                chain.push(Self::Resource);
            }
            Self::BasicContainer | Self::DirectContainer | Self::IndirectContainer => {
                chain.push(Self::Container);
                chain.push(Self::RDFSource);
                chain.push(Self::Resource);
            }
        }
        chain
    }

    /// Invariant I4: a PUT may only move a resource's interaction model
    /// along the sub-class chain. `other` must appear in `self`'s chain or
    /// vice versa for the transition to be legal.
    pub fn compatible_with(&self, other: &Self) -> bool {
        self.ldp_resource_types().contains(other) || other.ldp_resource_types().contains(self)
    }
}

/// Binary metadata attached to a `NonRDFSource` resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryMetadata {
    /// Opaque identifier the `BinaryService` uses to locate content.
    pub identifier: String,
    pub mime_type: String,
    pub size: u64,
    pub modified: Instant,
}

/// One Memento: the half-open interval `[from, until)` during which a
/// specific representation was current. `from` is the memento's own
/// datetime; `until` is either the next memento's `from` or "now" for the
/// most recent one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRange {
    pub from: Instant,
    pub until: Instant,
}

impl VersionRange {
    pub fn new(from: Instant, until: Instant) -> Self {
        debug_assert!(from < until, "VersionRange requires from < until");
        Self { from, until }
    }

    pub fn contains(&self, when: Instant) -> bool {
        self.from <= when && when < self.until
    }
}

/// The marker type used to tombstone a deleted resource (invariant I3).
pub const DELETED_RESOURCE_TYPE: &str = "http://www.trellisldp.org/ns/trellis#DeletedResource";

/// A logical LDP resource as resolved by a [`crate::services::ResourceService`].
#[derive(Debug, Clone)]
pub struct Resource {
    /// `trellis:<partition>/<path>`
    pub identifier: String,
    pub interaction_model: InteractionModel,
    pub modified: Instant,
    pub types: HashSet<String>,
    pub inbox: Option<String>,
    pub annotation_service: Option<String>,
    pub mementos: Vec<VersionRange>,
    pub binary: Option<BinaryMetadata>,
    /// Every quad this resource carries, across all named graphs. Handlers
    /// select a subset with [`PreferGraph`] filtering (§4.7.7) before
    /// streaming a representation.
    pub quads: Vec<Quad>,
}

impl Resource {
    /// Invariant I3: a tombstoned resource carries `Trellis:DeletedResource`
    /// among its types.
    pub fn is_deleted(&self) -> bool {
        self.types.contains(DELETED_RESOURCE_TYPE)
    }

    pub fn quads_in(&self, graphs: &HashSet<String>) -> Vec<&Quad> {
        self.quads
            .iter()
            .filter(|q| match &q.graph_name {
                GraphName::NamedNode(n) => graphs.contains(n.as_str()),
                _ => false,
            })
            .collect()
    }

    pub fn has_quads_in(&self, graph: PreferGraph) -> bool {
        self.quads.iter().any(|q| graph.matches_graph_name(&q.graph_name))
    }
}

/// A resolved memento: a `Resource` as it existed at a specific instant,
/// paired with the instant it was requested at (for `Memento-Datetime`).
#[derive(Debug, Clone)]
pub struct MementoResource {
    pub resource: Resource,
    pub datetime: Instant,
}

/// Per-request session (§3, §4.4). `agent` is an IRI: either the two
/// well-known agents below, or whatever `AgentService::as_agent` resolved
/// the authenticated principal to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub agent: String,
    pub created_at: Instant,
}

pub const ANONYMOUS_AGENT: &str = "http://www.trellisldp.org/ns/trellis#AnonymousUser";
pub const ADMIN_AGENT: &str = "http://www.trellisldp.org/ns/trellis#RepositoryAdministrator";

impl Session {
    pub fn anonymous(now: Instant) -> Self {
        Self { agent: ANONYMOUS_AGENT.to_string(), created_at: now }
    }

    pub fn admin(now: Instant) -> Self {
        Self { agent: ADMIN_AGENT.to_string(), created_at: now }
    }

    pub fn is_anonymous(&self) -> bool {
        self.agent == ANONYMOUS_AGENT
    }
}

/// `?ext=` query parameter recognised on resource routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    Acl,
    TimeMap,
    Uploads,
}

impl Extension {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "acl" => Some(Self::Acl),
            "timemap" => Some(Self::TimeMap),
            "uploads" => Some(Self::Uploads),
            _ => None,
        }
    }
}

/// An immutable projection of a parsed HTTP request (§3). Built once by the
/// pre-matching filters and passed by reference into whichever
/// [`crate::handlers`] handler the router selects — see §9, "Request
/// context".
#[derive(Debug, Clone)]
pub struct LdpRequest {
    pub partition: String,
    pub path: String,
    pub extension: Option<Extension>,
    pub version: Option<Instant>,
    pub accept_datetime: Option<Instant>,
    pub prefer: Option<crate::headers::prefer::Prefer>,
    pub range: Option<crate::headers::range::Range>,
    pub want_digest: Option<crate::headers::want_digest::WantDigest>,
    pub digest: Option<crate::headers::digest::Digest>,
    pub content_type: Option<String>,
    pub slug: Option<String>,
    pub link: Vec<crate::headers::link::Link>,
    pub accept: Vec<String>,
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<Instant>,
    pub base_url: String,
}

impl LdpRequest {
    /// `trellis:<partition>/<path>` — the internal identifier this request
    /// targets, per invariant I1.
    pub fn internal_identifier(&self) -> String {
        format!("trellis:{}{}", self.partition, self.path)
    }

    /// `<baseUrl>/<partition>/<path>` — the identifier clients see.
    pub fn external_identifier(&self) -> String {
        format!("{}/{}{}", self.base_url, self.partition, self.path)
    }
}
