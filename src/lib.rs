//! Request-handling core for a Linked Data Platform server: LDP
//! (containers, RDF/non-RDF resources), Memento versioning, WebAC
//! authorization and a multipart binary upload protocol, all served over
//! HTTP. See each module's doc comment for the section of the design this
//! crate implements.
//!
//! This crate owns the request lifecycle (§4) and the data model (§3); it
//! consumes, but never implements in production code, the six collaborator
//! traits in [`services`] — a deployment supplies its own store, binary
//! service and constraint engine. [`memory`] is the one exception: a
//! reference, non-persistent implementation used as the `serve` command's
//! zero-config fallback and as the scenario tests' fixture.

pub mod cli;
pub mod config;
pub mod error;
pub mod filters;
pub mod handlers;
pub mod headers;
pub mod identifiers;
pub mod logging;
pub mod memento;
pub mod memory;
pub mod model;
pub mod multipart;
pub mod negotiation;
pub mod response;
pub mod root;
pub mod services;
pub mod session;
pub mod web;
pub mod webac;

#[cfg(test)]
mod tests;
