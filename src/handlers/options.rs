//! §4.7.2 OptionsHandler: a 204 whose only job is to advertise `Allow`
//! (and `Accept-Post`/`Accept-Patch` where relevant) for the resource's
//! current state.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;

use crate::error::LdpError;
use crate::handlers::reject_tombstone;
use crate::model::{Extension, InteractionModel, Resource};
use crate::response::rdf_media_types_for_post;

#[tracing::instrument(skip_all)]
pub fn handle(resource: &Resource, is_memento: bool, extension: Option<Extension>) -> Result<Response, LdpError> {
    reject_tombstone(resource)?;

    let mut builder = Response::builder().status(StatusCode::NO_CONTENT);

    let allow = if is_memento || extension == Some(Extension::TimeMap) {
        "GET, HEAD, OPTIONS".to_string()
    } else if extension == Some(Extension::Uploads) {
        "POST, OPTIONS".to_string()
    } else if extension == Some(Extension::Acl) {
        builder = builder.header("Accept-Patch", "application/sparql-update");
        "GET, HEAD, OPTIONS, PATCH".to_string()
    } else if resource.interaction_model.is_container() {
        builder = builder
            .header("Accept-Patch", "application/sparql-update")
            .header("Accept-Post", rdf_media_types_for_post().join(", "));
        "GET, HEAD, OPTIONS, PATCH, PUT, DELETE, POST".to_string()
    } else {
        match resource.interaction_model {
            InteractionModel::RDFSource => {
                builder = builder.header("Accept-Patch", "application/sparql-update");
            }
            _ => {}
        }
        "GET, HEAD, OPTIONS, PATCH, PUT, DELETE".to_string()
    };

    builder = builder.header(header::ALLOW, allow);
    builder.body(Body::empty()).map_err(|e| LdpError::Internal(e.to_string()))
}
