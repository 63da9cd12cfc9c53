//! Request pipeline stages.
//!
//! Outermost first: correlation, authentication, then per route the role or
//! permission gate, the ownership gate and the audit recorder.

pub mod audit;
pub mod auth;
pub mod authz;
pub mod correlation;
pub mod ownership;

use axum::{
    body::Body,
    extract::{FromRequestParts, Path},
    http::Request,
};
use std::collections::HashMap;

/// Path parameter naming the resource instance on single-resource routes.
pub(crate) const ID_PARAM: &str = "id";

/// Read a matched path parameter from inside a layer, handing the request
/// back intact.
pub(crate) async fn path_param(req: Request<Body>, name: &str) -> (Request<Body>, Option<String>) {
    let (mut parts, body) = req.into_parts();
    let value = Path::<HashMap<String, String>>::from_request_parts(&mut parts, &())
        .await
        .ok()
        .and_then(|Path(mut params)| params.remove(name));
    (Request::from_parts(parts, body), value)
}
