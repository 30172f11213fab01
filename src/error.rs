//! The §7 error taxonomy, given a concrete shape.
//!
//! Every fallible path in this crate returns `Result<_, LdpError>`. Header
//! parsers (§4.1) and handlers alike construct a variant directly rather
//! than throwing — there's no exception-for-control-flow here, matching
//! §9's "Error propagation" design note. `LdpError` is the single place
//! that know how a taxonomy entry maps onto an HTTP status.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Link header value pointing at a constraint, attached to 409/400
/// responses per §7's "Conflict" and "Malformed header / body" rows.
#[derive(Debug, Clone)]
pub struct ConstrainedBy(pub String);

#[derive(Debug, Error)]
pub enum LdpError {
    /// Malformed header or body (§4.1 grammars, except `Version`).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A PATCH constraint violation (§4.7.5 step 5 — unlike POST/PUT, whose
    /// constraint check is a 409, PATCH's is a 400), carrying the same
    /// `rel="constrainedBy"` Link as the 409 case.
    #[error("bad request: {0}")]
    BadRequestWithLink(String, ConstrainedBy),

    /// Missing/invalid `Version` query parameter, or no such resource.
    #[error("not found")]
    NotFound,

    /// No security principal and the resource requires one. Carries the
    /// `WWW-Authenticate` challenges configured for the deployment (§4.4).
    #[error("authentication required")]
    Unauthorized { challenges: Vec<String> },

    /// Authenticated, but WebAC denies the operation.
    #[error("forbidden")]
    Forbidden,

    /// The method is not valid for this resource's current state.
    #[error("method not allowed")]
    MethodNotAllowed { allow: Vec<&'static str> },

    /// Content negotiation (§4.2) could not satisfy the `Accept` header.
    #[error("not acceptable")]
    NotAcceptable,

    /// The resource is a tombstone (invariant I3).
    #[error("gone")]
    Gone,

    /// Constraint violation, non-empty container delete, type downgrade,
    /// or name collision.
    #[error("conflict: {0}")]
    Conflict(String, Option<ConstrainedBy>),

    /// PUT/POST with a content-type the target resource cannot accept.
    #[error("unsupported media type")]
    UnsupportedMediaType,

    /// Conditional request failed (`If-Match`-style semantics).
    #[error("precondition failed")]
    PreconditionFailed,

    /// Conditional GET cache hit.
    #[error("not modified")]
    NotModified,

    /// A collaborator (`ResourceService`, `BinaryService`, `IOService`, ...)
    /// failed, or an I/O error occurred while streaming.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LdpError {
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into(), None)
    }

    pub fn conflict_with_link(message: impl Into<String>, constrained_by: impl Into<String>) -> Self {
        Self::Conflict(message.into(), Some(ConstrainedBy(constrained_by.into())))
    }

    pub fn bad_request_with_link(message: impl Into<String>, constrained_by: impl Into<String>) -> Self {
        Self::BadRequestWithLink(message.into(), ConstrainedBy(constrained_by.into()))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::BadRequestWithLink(..) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            Self::Gone => StatusCode::GONE,
            Self::Conflict(..) => StatusCode::CONFLICT,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
            Self::NotModified => StatusCode::NOT_MODIFIED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for LdpError {
    fn from(error: std::io::Error) -> Self {
        Self::Internal(error.to_string())
    }
}

impl IntoResponse for LdpError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let Self::Internal(ref msg) = self {
            tracing::error!(error = %msg, "backend failure");
        }
        let mut response = match &self {
            Self::Conflict(message, constrained_by) => {
                let mut r = (status, message.clone()).into_response();
                if let Some(ConstrainedBy(iri)) = constrained_by {
                    if let Ok(value) = HeaderValue::from_str(&format!("<{iri}>; rel=\"constrainedBy\"")) {
                        r.headers_mut().insert("Link", value);
                    }
                }
                r
            }
            Self::BadRequestWithLink(message, ConstrainedBy(iri)) => {
                let mut r = (status, message.clone()).into_response();
                if let Ok(value) = HeaderValue::from_str(&format!("<{iri}>; rel=\"constrainedBy\"")) {
                    r.headers_mut().insert("Link", value);
                }
                r
            }
            Self::MethodNotAllowed { allow } => {
                let mut r = (status, self.to_string()).into_response();
                if let Ok(value) = HeaderValue::from_str(&allow.join(", ")) {
                    r.headers_mut().insert("Allow", value);
                }
                r
            }
            Self::Unauthorized { challenges } => {
                let mut r = (status, self.to_string()).into_response();
                if let Ok(value) = HeaderValue::from_str(&challenges.join(", ")) {
                    r.headers_mut().insert("WWW-Authenticate", value);
                }
                r
            }
            _ => (status, self.to_string()).into_response(),
        };
        *response.status_mut() = status;
        response
    }
}
