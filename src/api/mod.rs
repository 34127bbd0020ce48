use rocket::{Catcher, Request, Route};

use mongodb::bson::oid;

use crate::error::{Error, Result};
use crate::model::mongodb::Id;

mod elections;
mod results;
mod sessions;
mod staff;
mod voting;

#[cfg(test)]
pub(crate) mod testing;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(voting::routes());
    routes.extend(results::routes());
    routes.extend(elections::routes());
    routes.extend(sessions::routes());
    routes.extend(staff::routes());
    #[cfg(test)]
    routes.extend(testing::routes());
    routes
}

/// Id path segment, kept fallible so a malformed id is reported as a
/// validation failure instead of falling through to the 404 catcher.
pub(crate) type IdParam = std::result::Result<Id, oid::Error>;

pub(crate) fn path_id(param: IdParam) -> Result<Id> {
    param.map_err(|err| Error::Validation(format!("Invalid ID: {err}")))
}

/// Catchers rendering the standard error body for failures that never
/// reach a handler.
pub fn catchers() -> Vec<Catcher> {
    catchers![
        bad_request,
        unauthorized,
        forbidden,
        not_found,
        unprocessable,
        internal_error
    ]
}

#[catch(400)]
fn bad_request() -> Error {
    Error::Validation("Malformed request".to_string())
}

#[catch(401)]
fn unauthorized() -> Error {
    Error::Unauthorized("Missing, invalid or expired authentication token".to_string())
}

#[catch(403)]
fn forbidden() -> Error {
    Error::Forbidden("Access denied".to_string())
}

#[catch(404)]
fn not_found(req: &Request<'_>) -> Error {
    Error::not_found(format!("Resource '{}'", req.uri().path()))
}

#[catch(422)]
fn unprocessable() -> Error {
    Error::Validation("Request body could not be parsed".to_string())
}

#[catch(500)]
fn internal_error() -> Error {
    Error::Store(crate::store::StoreError::Malformed(
        "unhandled server error".to_string(),
    ))
}
