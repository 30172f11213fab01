//! §4.1 Header Grammars — one parser per header, each a pure function from
//! the header's raw string value to a strongly-typed object. Every parser
//! fails with [`crate::error::LdpError::BadRequest`] except [`version`],
//! which fails with `NotFound` per the spec's explicit carve-out.

pub mod accept_datetime;
pub mod digest;
pub mod link;
pub mod prefer;
pub mod range;
pub mod version;
pub mod want_digest;
