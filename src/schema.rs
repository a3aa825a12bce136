//! Normalized schema nodes and their wire encoding.
//!
//! A [`SchemaNode`] is the output of type resolution: a wire-format-agnostic
//! description of a JSON value. [`SchemaNode::to_value`] turns it into the
//! JSON map that ends up in the OpenAPI document. Field emission is strictly
//! conditional; absence of a field (not `null`) signals absence of the
//! constraint, and the emission order is part of the output contract.

use crate::reporter::Reporter;
use indexmap::IndexMap;
use serde_json::{json, Map, Value};

/// Primitive schema kinds. `None` on [`SchemaNode::kind`] means "no type
/// constraint".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    Null,
}

impl SchemaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaKind::String => "string",
            SchemaKind::Integer => "integer",
            SchemaKind::Number => "number",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Object => "object",
            SchemaKind::Array => "array",
            SchemaKind::Null => "null",
        }
    }
}

/// The `additionalProperties` constraint of an object schema.
#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalProperties {
    /// `true` (open object) or `false` (closed object)
    Flag(bool),
    /// Value schema of a string-indexed map
    Schema(Box<SchemaNode>),
}

/// A resolved, normalized schema.
///
/// Built once per resolution call and immutable afterwards, except for
/// `description`, `deprecated` and the default fields which the caller may
/// back-fill after construction (parameter description injection).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaNode {
    /// Diagnostics breadcrumb pointing at the annotated source location.
    /// Never serialized.
    pub context: String,
    pub reference: Option<String>,
    pub kind: Option<SchemaKind>,
    pub format: Option<String>,
    pub nullable: bool,
    pub has_default: bool,
    pub default_value: Option<Value>,
    pub items: Option<Box<SchemaNode>>,
    pub properties: Option<IndexMap<String, SchemaNode>>,
    pub required: Option<Vec<String>>,
    pub additional_properties: Option<AdditionalProperties>,
    pub one_of: Option<Vec<SchemaNode>>,
    pub any_of: Option<Vec<SchemaNode>>,
    pub all_of: Option<Vec<SchemaNode>>,
    pub enum_values: Option<Vec<Value>>,
    pub min_length: Option<i64>,
    pub max_length: Option<i64>,
    pub minimum: Option<i64>,
    pub maximum: Option<i64>,
    pub min_items: Option<i64>,
    pub max_items: Option<i64>,
    pub description: Option<String>,
    pub deprecated: bool,
}

/// Collapses runs of whitespace in a doc comment into single spaces.
pub fn clean_doc(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl SchemaNode {
    /// An empty node: "any value". Serializes as an open object marker.
    pub fn new(context: &str) -> Self {
        SchemaNode {
            context: context.to_string(),
            ..SchemaNode::default()
        }
    }

    pub fn primitive(context: &str, kind: SchemaKind) -> Self {
        SchemaNode {
            kind: Some(kind),
            ..SchemaNode::new(context)
        }
    }

    /// `integer` with the wire format used for all integers.
    pub fn int64(context: &str) -> Self {
        SchemaNode {
            kind: Some(SchemaKind::Integer),
            format: Some("int64".to_string()),
            ..SchemaNode::new(context)
        }
    }

    pub fn reference(context: &str, reference: String) -> Self {
        SchemaNode {
            reference: Some(reference),
            ..SchemaNode::new(context)
        }
    }

    /// Serializes the node into its JSON representation.
    ///
    /// In parameter position (`is_parameter`) booleans are re-encoded as
    /// `0`/`1` integers, complex shapes fall back to `string` with a warning,
    /// and descriptions are suppressed (they live on the enclosing parameter
    /// object instead).
    pub fn to_value(&self, is_parameter: bool, reporter: &Reporter) -> Value {
        if is_parameter {
            if self.kind == Some(SchemaKind::Boolean) {
                let default_value = if self.has_default {
                    Some(json!(
                        if self.default_value == Some(Value::Bool(true)) {
                            1
                        } else {
                            0
                        }
                    ))
                } else {
                    None
                };
                return SchemaNode {
                    kind: Some(SchemaKind::Integer),
                    nullable: self.nullable,
                    has_default: self.has_default,
                    default_value,
                    description: self.description.clone(),
                    enum_values: Some(vec![json!(0), json!(1)]),
                    ..SchemaNode::new(&self.context)
                }
                .to_value(is_parameter, reporter);
            }

            if self.kind == Some(SchemaKind::Object)
                || self.reference.is_some()
                || self.any_of.is_some()
                || self.all_of.is_some()
            {
                reporter.warning(
                    &self.context,
                    "Complex types can not be part of query or URL parameters. \
                     Falling back to string due to undefined serialization!",
                );
                return SchemaNode {
                    kind: Some(SchemaKind::String),
                    nullable: self.nullable,
                    description: self.description.clone(),
                    ..SchemaNode::new(&self.context)
                }
                .to_value(is_parameter, reporter);
            }
        }

        let mut values = Map::new();
        if let Some(reference) = &self.reference {
            values.insert("$ref".to_string(), json!(reference));
        }
        if let Some(kind) = self.kind {
            values.insert("type".to_string(), json!(kind.as_str()));
        }
        if let Some(format) = &self.format {
            values.insert("format".to_string(), json!(format));
        }
        if self.nullable {
            values.insert("nullable".to_string(), json!(true));
        }
        if self.has_default {
            if let Some(default) = &self.default_value {
                if !default.is_null() {
                    let default = if self.kind == Some(SchemaKind::Object) && is_empty(default) {
                        json!({})
                    } else {
                        default.clone()
                    };
                    values.insert("default".to_string(), default);
                }
            }
        }
        if let Some(enum_values) = &self.enum_values {
            values.insert("enum".to_string(), json!(enum_values));
        }
        if let Some(description) = &self.description {
            if !description.is_empty() && !is_parameter {
                values.insert("description".to_string(), json!(clean_doc(description)));
            }
        }
        if let Some(items) = &self.items {
            values.insert("items".to_string(), items.to_value(false, reporter));
        }
        if let Some(min_length) = self.min_length {
            values.insert("minLength".to_string(), json!(min_length));
        }
        if let Some(max_length) = self.max_length {
            values.insert("maxLength".to_string(), json!(max_length));
        }
        if let Some(minimum) = self.minimum {
            values.insert("minimum".to_string(), json!(minimum));
        }
        if let Some(maximum) = self.maximum {
            values.insert("maximum".to_string(), json!(maximum));
        }
        if let Some(min_items) = self.min_items {
            values.insert("minItems".to_string(), json!(min_items));
        }
        if let Some(max_items) = self.max_items {
            values.insert("maxItems".to_string(), json!(max_items));
        }
        if let Some(required) = &self.required {
            values.insert("required".to_string(), json!(required));
        }
        if let Some(properties) = &self.properties {
            if !properties.is_empty() {
                let map: Map<String, Value> = properties
                    .iter()
                    .map(|(name, property)| (name.clone(), property.to_value(false, reporter)))
                    .collect();
                values.insert("properties".to_string(), Value::Object(map));
            }
        }
        if let Some(additional) = &self.additional_properties {
            let value = match additional {
                AdditionalProperties::Flag(flag) => json!(flag),
                AdditionalProperties::Schema(schema) => schema.to_value(false, reporter),
            };
            values.insert("additionalProperties".to_string(), value);
        }
        if let Some(one_of) = &self.one_of {
            values.insert(
                "oneOf".to_string(),
                Value::Array(one_of.iter().map(|t| t.to_value(false, reporter)).collect()),
            );
        }
        if let Some(any_of) = &self.any_of {
            values.insert(
                "anyOf".to_string(),
                Value::Array(any_of.iter().map(|t| t.to_value(false, reporter)).collect()),
            );
        }
        if let Some(all_of) = &self.all_of {
            values.insert(
                "allOf".to_string(),
                Value::Array(all_of.iter().map(|t| t.to_value(false, reporter)).collect()),
            );
        }

        Value::Object(values)
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Number(n) => n.as_i64() == Some(0),
    }
}
