//! Mapping of symbolic HTTP status constants to numeric codes.

use crate::ast::TypeNode;
use crate::error::{Error, Result};

/// The symbolic status constants accepted in response annotations. The
/// misspelled 203 entry is kept for compatibility with existing annotations.
const STATUS_CODES: [(&str, u16); 57] = [
    ("STATUS_CONTINUE", 100),
    ("STATUS_SWITCHING_PROTOCOLS", 101),
    ("STATUS_PROCESSING", 102),
    ("STATUS_OK", 200),
    ("STATUS_CREATED", 201),
    ("STATUS_ACCEPTED", 202),
    ("STATUS_NON_AUTHORATIVE_INFORMATION", 203),
    ("STATUS_NO_CONTENT", 204),
    ("STATUS_RESET_CONTENT", 205),
    ("STATUS_PARTIAL_CONTENT", 206),
    ("STATUS_MULTI_STATUS", 207),
    ("STATUS_ALREADY_REPORTED", 208),
    ("STATUS_IM_USED", 226),
    ("STATUS_MULTIPLE_CHOICES", 300),
    ("STATUS_MOVED_PERMANENTLY", 301),
    ("STATUS_FOUND", 302),
    ("STATUS_SEE_OTHER", 303),
    ("STATUS_NOT_MODIFIED", 304),
    ("STATUS_USE_PROXY", 305),
    ("STATUS_RESERVED", 306),
    ("STATUS_TEMPORARY_REDIRECT", 307),
    ("STATUS_PERMANENT_REDIRECT", 308),
    ("STATUS_BAD_REQUEST", 400),
    ("STATUS_UNAUTHORIZED", 401),
    ("STATUS_PAYMENT_REQUIRED", 402),
    ("STATUS_FORBIDDEN", 403),
    ("STATUS_NOT_FOUND", 404),
    ("STATUS_METHOD_NOT_ALLOWED", 405),
    ("STATUS_NOT_ACCEPTABLE", 406),
    ("STATUS_PROXY_AUTHENTICATION_REQUIRED", 407),
    ("STATUS_REQUEST_TIMEOUT", 408),
    ("STATUS_CONFLICT", 409),
    ("STATUS_GONE", 410),
    ("STATUS_LENGTH_REQUIRED", 411),
    ("STATUS_PRECONDITION_FAILED", 412),
    ("STATUS_REQUEST_ENTITY_TOO_LARGE", 413),
    ("STATUS_REQUEST_URI_TOO_LONG", 414),
    ("STATUS_UNSUPPORTED_MEDIA_TYPE", 415),
    ("STATUS_REQUEST_RANGE_NOT_SATISFIABLE", 416),
    ("STATUS_EXPECTATION_FAILED", 417),
    ("STATUS_IM_A_TEAPOT", 418),
    ("STATUS_UNPROCESSABLE_ENTITY", 422),
    ("STATUS_LOCKED", 423),
    ("STATUS_FAILED_DEPENDENCY", 424),
    ("STATUS_UPGRADE_REQUIRED", 426),
    ("STATUS_PRECONDITION_REQUIRED", 428),
    ("STATUS_TOO_MANY_REQUESTS", 429),
    ("STATUS_REQUEST_HEADER_FIELDS_TOO_LARGE", 431),
    ("STATUS_INTERNAL_SERVER_ERROR", 500),
    ("STATUS_NOT_IMPLEMENTED", 501),
    ("STATUS_BAD_GATEWAY", 502),
    ("STATUS_SERVICE_UNAVAILABLE", 503),
    ("STATUS_GATEWAY_TIMEOUT", 504),
    ("STATUS_HTTP_VERSION_NOT_SUPPORTED", 505),
    ("STATUS_INSUFFICIENT_STORAGE", 507),
    ("STATUS_LOOP_DETECTED", 508),
    ("STATUS_NETWORK_AUTHENTICATION_REQUIRED", 511),
];

fn lookup(context: &str, name: &str) -> Result<u16> {
    STATUS_CODES
        .iter()
        .find(|(constant, _)| *constant == name)
        .map(|(_, code)| *code)
        .ok_or_else(|| {
            Error::resolution(context, format!("Unknown status code constant '{}'", name))
        })
}

/// Resolves a status annotation (a single constant or a union of constants)
/// into the list of numeric status codes, in annotation order.
pub fn resolve_status_codes(context: &str, node: &TypeNode) -> Result<Vec<u16>> {
    match node {
        TypeNode::Identifier(name) => Ok(vec![lookup(context, name)?]),
        TypeNode::Union(members) => members
            .iter()
            .map(|member| match member {
                TypeNode::Identifier(name) => lookup(context, name),
                _ => Err(Error::resolution(
                    context,
                    format!("Status code unions may only contain constants, got {:?}", member),
                )),
            })
            .collect(),
        _ => Err(Error::resolution(
            context,
            format!("Unable to resolve status code from {:?}", node),
        )),
    }
}
