//! Resolution of response wrapper annotations into concrete descriptors.
//!
//! A return annotation names one or more response wrappers, each parameterized
//! by status code, optional content type, optional body type and a header
//! shape. Resolution expands these into one descriptor per (status code,
//! content type) combination.

use crate::ast::{Definitions, TypeNode};
use crate::error::{Error, Result};
use crate::reporter::Reporter;
use crate::resolver;
use crate::schema::{SchemaKind, SchemaNode};
use crate::status::resolve_status_codes;
use indexmap::IndexMap;
use log::debug;

/// Built-in default body of a wrapper without a body template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DefaultBody {
    None,
    Text,
    Binary,
}

impl DefaultBody {
    fn schema(self, context: &str) -> Option<SchemaNode> {
        match self {
            DefaultBody::None => None,
            DefaultBody::Text => Some(SchemaNode::primitive(context, SchemaKind::String)),
            DefaultBody::Binary => Some(SchemaNode {
                format: Some("binary".to_string()),
                ..SchemaNode::primitive(context, SchemaKind::String)
            }),
        }
    }
}

/// One entry of the fixed wrapper registry.
struct ResponseWrapper {
    name: &'static str,
    has_content_type_template: bool,
    has_body_template: bool,
    default_content_type: Option<&'static str>,
    default_body: DefaultBody,
    /// Header names with a built-in string schema, merged under explicit ones.
    default_headers: &'static [&'static str],
}

impl ResponseWrapper {
    /// Argument count: status code and headers are always present, plus one
    /// slot per template the wrapper declares.
    fn expected_args(&self) -> usize {
        2 + usize::from(self.has_content_type_template) + usize::from(self.has_body_template)
    }
}

const WRAPPERS: [ResponseWrapper; 16] = [
    ResponseWrapper {
        name: "DataDisplayResponse",
        has_content_type_template: false,
        has_body_template: false,
        default_content_type: None,
        default_body: DefaultBody::Binary,
        default_headers: &[],
    },
    ResponseWrapper {
        name: "DataDownloadResponse",
        has_content_type_template: true,
        has_body_template: false,
        default_content_type: None,
        default_body: DefaultBody::Binary,
        default_headers: &[],
    },
    ResponseWrapper {
        name: "DataResponse",
        has_content_type_template: false,
        has_body_template: true,
        default_content_type: Some("application/json"),
        default_body: DefaultBody::Text,
        default_headers: &[],
    },
    ResponseWrapper {
        name: "DownloadResponse",
        has_content_type_template: true,
        has_body_template: false,
        default_content_type: None,
        default_body: DefaultBody::Binary,
        default_headers: &[],
    },
    ResponseWrapper {
        name: "FileDisplayResponse",
        has_content_type_template: false,
        has_body_template: false,
        default_content_type: None,
        default_body: DefaultBody::Binary,
        default_headers: &[],
    },
    ResponseWrapper {
        name: "JSONResponse",
        has_content_type_template: false,
        has_body_template: true,
        default_content_type: Some("application/json"),
        default_body: DefaultBody::Text,
        default_headers: &[],
    },
    ResponseWrapper {
        name: "NotFoundResponse",
        has_content_type_template: false,
        has_body_template: false,
        default_content_type: Some("text/html"),
        default_body: DefaultBody::Text,
        default_headers: &[],
    },
    ResponseWrapper {
        name: "RedirectResponse",
        has_content_type_template: false,
        has_body_template: false,
        default_content_type: None,
        default_body: DefaultBody::None,
        default_headers: &["Location"],
    },
    ResponseWrapper {
        name: "RedirectToDefaultAppResponse",
        has_content_type_template: false,
        has_body_template: false,
        default_content_type: None,
        default_body: DefaultBody::None,
        default_headers: &["Location"],
    },
    ResponseWrapper {
        name: "Response",
        has_content_type_template: false,
        has_body_template: false,
        default_content_type: None,
        default_body: DefaultBody::None,
        default_headers: &[],
    },
    ResponseWrapper {
        name: "StandaloneTemplateResponse",
        has_content_type_template: false,
        has_body_template: false,
        default_content_type: Some("text/html"),
        default_body: DefaultBody::Text,
        default_headers: &[],
    },
    ResponseWrapper {
        name: "StreamResponse",
        has_content_type_template: false,
        has_body_template: false,
        default_content_type: None,
        default_body: DefaultBody::Binary,
        default_headers: &[],
    },
    ResponseWrapper {
        name: "TemplateResponse",
        has_content_type_template: false,
        has_body_template: false,
        default_content_type: Some("text/html"),
        default_body: DefaultBody::Text,
        default_headers: &[],
    },
    ResponseWrapper {
        name: "TextPlainResponse",
        has_content_type_template: false,
        has_body_template: false,
        default_content_type: Some("text/plain"),
        default_body: DefaultBody::Text,
        default_headers: &[],
    },
    ResponseWrapper {
        name: "TooManyRequestsResponse",
        has_content_type_template: false,
        has_body_template: false,
        default_content_type: Some("text/html"),
        default_body: DefaultBody::Text,
        default_headers: &[],
    },
    ResponseWrapper {
        name: "ZipResponse",
        has_content_type_template: false,
        has_body_template: false,
        default_content_type: None,
        default_body: DefaultBody::Binary,
        default_headers: &[],
    },
];

/// A single concrete response: one status code with one content type.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDescriptor {
    pub wrapper: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub body: Option<SchemaNode>,
    pub headers: IndexMap<String, SchemaNode>,
}

/// Resolves a return annotation into descriptors.
///
/// `None` entries stand for `void` response paths: nothing to document, but
/// their presence tells the caller the method has an undocumented branch.
pub fn resolve_responses(
    context: &str,
    definitions: &Definitions,
    node: &TypeNode,
    reporter: &Reporter,
) -> Result<Vec<Option<ResponseDescriptor>>> {
    if let TypeNode::Union(members) = node {
        let mut responses = Vec::new();
        for member in members {
            responses.extend(resolve_responses(context, definitions, member, reporter)?);
        }
        return Ok(responses);
    }

    let (name, args): (&str, &[TypeNode]) = match node {
        TypeNode::Identifier(name) => (name, &[]),
        TypeNode::Generic { name, args } => (name, args),
        _ => {
            return Err(Error::resolution(
                context,
                format!("Failed to get response wrapper name for {:?}", node),
            ))
        }
    };

    if name == "void" {
        return Ok(vec![None]);
    }

    let Some(wrapper) = WRAPPERS.iter().find(|wrapper| wrapper.name == name) else {
        reporter.error(context, &format!("Invalid return type '{}'", name))?;
        return Ok(vec![]);
    };

    if args.len() != wrapper.expected_args() {
        reporter.error(
            context,
            &format!("'{}' needs {} parameters", name, wrapper.expected_args()),
        )?;
        return Ok(vec![]);
    }
    debug!("Resolving {} response at {}", name, context);

    let status_codes = resolve_status_codes(context, &args[0])?;
    let mut next = 1;

    let mut content_types: Vec<String> = if wrapper.has_content_type_template {
        let arg = &args[next];
        next += 1;
        resolve_content_types(context, arg)?
    } else {
        wrapper
            .default_content_type
            .map(|ct| vec![ct.to_string()])
            .unwrap_or_default()
    };

    let body = if wrapper.has_body_template {
        let arg = &args[next];
        next += 1;
        Some(resolver::resolve(context, definitions, arg, reporter)?)
    } else {
        wrapper.default_body.schema(context)
    };

    let headers_schema = resolver::resolve(context, definitions, &args[next], reporter)?;
    if headers_schema.additional_properties.is_some() {
        reporter.error(
            context,
            "Use array{} instead of array<string, mixed> for empty headers",
        )?;
    }
    let explicit_headers = headers_schema.properties.unwrap_or_default();
    let mut headers = IndexMap::new();
    for default in wrapper.default_headers {
        headers.insert(
            default.to_string(),
            SchemaNode::primitive(context, SchemaKind::String),
        );
    }
    headers.extend(explicit_headers);

    // Declaring Content-Type as a literal header is illegal; its enum values
    // feed the content-type list instead.
    if let Some(header) = headers.shift_remove("Content-Type") {
        let values = match &header.one_of {
            Some(members) => members.clone(),
            None => vec![header],
        };
        for value in values {
            if value.kind == Some(SchemaKind::String) {
                if let Some(enum_values) = &value.enum_values {
                    content_types.extend(
                        enum_values
                            .iter()
                            .filter_map(|v| v.as_str().map(String::from)),
                    );
                }
            }
        }
    }

    let content_types: Vec<Option<String>> = if content_types.is_empty() {
        vec![body.as_ref().map(|_| "*/*".to_string())]
    } else {
        content_types.into_iter().map(Some).collect()
    };

    let mut responses = Vec::new();
    for status_code in status_codes {
        if status_code == 204 || status_code == 304 {
            if status_code == 304 {
                let custom_headers: Vec<&str> = headers
                    .keys()
                    .filter(|header| header.to_ascii_lowercase().starts_with("x-"))
                    .map(String::as_str)
                    .collect();
                if !custom_headers.is_empty() {
                    reporter.error(
                        context,
                        &format!(
                            "Custom headers are not allowed for responses with status code 304. Found: {}",
                            custom_headers.join(", ")
                        ),
                    )?;
                }
            }
            responses.push(Some(ResponseDescriptor {
                wrapper: name.to_string(),
                status_code,
                content_type: None,
                body: None,
                headers: headers.clone(),
            }));
        } else {
            for content_type in &content_types {
                responses.push(Some(ResponseDescriptor {
                    wrapper: name.to_string(),
                    status_code,
                    content_type: content_type.clone(),
                    body: body.clone(),
                    headers: headers.clone(),
                }));
            }
        }
    }

    Ok(responses)
}

fn resolve_content_types(context: &str, node: &TypeNode) -> Result<Vec<String>> {
    match node {
        TypeNode::ConstString(value) => Ok(vec![value.clone()]),
        TypeNode::Identifier(name) if name == "string" => Ok(vec!["*/*".to_string()]),
        TypeNode::Union(members) => members
            .iter()
            .map(|member| match member {
                TypeNode::ConstString(value) => Ok(value.clone()),
                _ => Err(Error::resolution(
                    context,
                    format!("Unable to parse content type from {:?}", member),
                )),
            })
            .collect(),
        _ => Err(Error::resolution(
            context,
            format!("Unable to parse content type from {:?}", node),
        )),
    }
}
