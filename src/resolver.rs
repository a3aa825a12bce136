//! The type resolver: converts parsed annotation nodes into schema nodes.
//!
//! Resolution is pure and deterministic: the same node and alias table always
//! produce the same schema tree. Unsupported constructs never fall through
//! silently; every rejection carries the context breadcrumb so the CLI can
//! point at the offending annotation.

use crate::ast::{Definitions, TypeNode};
use crate::error::{Error, Result};
use crate::reporter::Reporter;
use crate::schema::{AdditionalProperties, SchemaKind, SchemaNode};
use indexmap::IndexMap;
use log::debug;
use serde_json::{json, Value};

/// Maximum annotation nesting depth before resolution fails. Guards against
/// runaway recursion which the grammar itself does not bound.
pub const MAX_DEPTH: usize = 100;

const MAP_KEY_TYPES: [&str; 4] = [
    "string",
    "lowercase-string",
    "non-empty-string",
    "non-empty-lowercase-string",
];

/// Resolves an annotation node against the alias table.
pub fn resolve(
    context: &str,
    definitions: &Definitions,
    node: &TypeNode,
    reporter: &Reporter,
) -> Result<SchemaNode> {
    resolve_node(context, definitions, node, reporter, false, 0)
}

/// Like [`resolve`], but for the body of a response definition itself. The
/// enum-extraction hint is suppressed because the annotation already is one.
pub fn resolve_definition(
    context: &str,
    definitions: &Definitions,
    node: &TypeNode,
    reporter: &Reporter,
) -> Result<SchemaNode> {
    resolve_node(context, definitions, node, reporter, true, 0)
}

fn resolve_node(
    context: &str,
    definitions: &Definitions,
    node: &TypeNode,
    reporter: &Reporter,
    in_definition: bool,
    depth: usize,
) -> Result<SchemaNode> {
    if depth > MAX_DEPTH {
        return Err(Error::resolution(
            context,
            format!("Type annotation nesting exceeds {} levels", MAX_DEPTH),
        ));
    }
    debug!("Resolving node at {}: {:?}", context, node);

    match node {
        TypeNode::Nullable(inner) => {
            let mut schema =
                resolve_node(context, definitions, inner, reporter, in_definition, depth + 1)?;
            schema.nullable = true;
            Ok(schema)
        }

        TypeNode::Identifier(name) => resolve_identifier(context, definitions, name, reporter),

        TypeNode::ArrayOf(inner) => {
            reporter.error(
                context,
                "The 'TYPE[]' syntax for arrays is forbidden due to ambiguities. \
                 Use 'list<TYPE>' for JSON arrays or 'array<string, TYPE>' for JSON objects instead.",
            )?;
            Ok(SchemaNode {
                kind: Some(SchemaKind::Array),
                items: Some(Box::new(resolve_node(
                    &format!("{}: items", context),
                    definitions,
                    inner,
                    reporter,
                    in_definition,
                    depth + 1,
                )?)),
                ..SchemaNode::new(context)
            })
        }

        TypeNode::Generic { name, args }
            if (name == "array" || name == "list" || name == "non-empty-list")
                && args.len() == 1 =>
        {
            if name == "array" {
                reporter.error(
                    context,
                    "The 'array<TYPE>' syntax for arrays is forbidden due to ambiguities. \
                     Use 'list<TYPE>' for JSON arrays or 'array<string, TYPE>' for JSON objects instead.",
                )?;
            }

            if args[0].is_identifier("empty") {
                return Ok(SchemaNode {
                    kind: Some(SchemaKind::Array),
                    max_items: Some(0),
                    ..SchemaNode::new(context)
                });
            }
            Ok(SchemaNode {
                kind: Some(SchemaKind::Array),
                items: Some(Box::new(resolve_node(
                    context,
                    definitions,
                    &args[0],
                    reporter,
                    in_definition,
                    depth + 1,
                )?)),
                min_items: (name == "non-empty-list").then_some(1),
                ..SchemaNode::new(context)
            })
        }

        TypeNode::Generic { name, .. } if name == "value-of" => {
            Err(Error::resolution(context, "'value-of' is not supported"))
        }

        TypeNode::Generic { name, args }
            if name == "array"
                && args.len() == 2
                && matches!(args[0], TypeNode::Identifier(_)) =>
        {
            let TypeNode::Identifier(key_type) = &args[0] else {
                unreachable!()
            };
            if !MAP_KEY_TYPES.contains(&key_type.as_str()) {
                return Err(Error::resolution(
                    context,
                    format!(
                        "JSON objects can only be indexed by '{}' but got '{}'",
                        MAP_KEY_TYPES.join("', '"),
                        key_type
                    ),
                ));
            }
            Ok(SchemaNode {
                kind: Some(SchemaKind::Object),
                additional_properties: Some(AdditionalProperties::Schema(Box::new(
                    resolve_node(
                        &format!("{}: additionalProperties", context),
                        definitions,
                        &args[1],
                        reporter,
                        in_definition,
                        depth + 1,
                    )?,
                ))),
                ..SchemaNode::new(context)
            })
        }

        TypeNode::Generic { name, args } if name == "int" && args.len() == 2 => {
            let minimum = match &args[0] {
                TypeNode::ConstInt(min) => Some(*min),
                _ => None,
            };
            let maximum = match &args[1] {
                TypeNode::ConstInt(max) => Some(*max),
                _ => None,
            };
            Ok(SchemaNode {
                minimum,
                maximum,
                ..SchemaNode::int64(context)
            })
        }

        TypeNode::ArrayShape(items) => {
            let mut properties = IndexMap::new();
            let mut required = Vec::new();
            for item in items {
                let schema = resolve_node(
                    &format!("{}: {}", context, item.key),
                    definitions,
                    &item.value,
                    reporter,
                    in_definition,
                    depth + 1,
                )?;
                if !item.optional {
                    required.push(item.key.clone());
                } else if schema.nullable {
                    reporter.warning(
                        context,
                        &format!(
                            "Property \"{}\" is both nullable and not required. \
                             Please consider only using one of these at once.",
                            item.key
                        ),
                    );
                }
                properties.insert(item.key.clone(), schema);
            }
            Ok(SchemaNode {
                kind: Some(SchemaKind::Object),
                properties: Some(properties),
                required: (!required.is_empty()).then_some(required),
                ..SchemaNode::new(context)
            })
        }

        TypeNode::Union(members)
            if members
                .iter()
                .all(|m| matches!(m, TypeNode::ConstString(_))) =>
        {
            let values: Vec<&String> = members
                .iter()
                .map(|m| match m {
                    TypeNode::ConstString(value) => value,
                    _ => unreachable!(),
                })
                .collect();

            if values.iter().any(|value| value.is_empty()) {
                // An empty-string literal would make the enum match anything
                // the consumer sends, so it disqualifies the collapse.
                return Ok(SchemaNode::primitive(context, SchemaKind::String));
            }

            if !in_definition {
                reporter.warning(
                    context,
                    "Consider using a Response definition for this enum \
                     to improve readability and reusability.",
                );
            }

            Ok(SchemaNode {
                enum_values: Some(values.iter().map(|v| json!(v)).collect()),
                ..SchemaNode::primitive(context, SchemaKind::String)
            })
        }

        TypeNode::Union(members)
            if members.iter().all(|m| matches!(m, TypeNode::ConstInt(_))) =>
        {
            let values: Vec<Value> = members
                .iter()
                .map(|m| match m {
                    TypeNode::ConstInt(value) => json!(value),
                    _ => unreachable!(),
                })
                .collect();

            if !in_definition {
                reporter.warning(
                    context,
                    "Consider using a Response definition for this enum \
                     to improve readability and reusability.",
                );
            }

            Ok(SchemaNode {
                enum_values: Some(values),
                ..SchemaNode::int64(context)
            })
        }

        TypeNode::Union(members) => compose(
            context,
            definitions,
            members,
            reporter,
            in_definition,
            depth,
            false,
        ),

        TypeNode::Intersection(members) => compose(
            context,
            definitions,
            members,
            reporter,
            in_definition,
            depth,
            true,
        ),

        TypeNode::ConstString(value) => {
            if value.is_empty() {
                // Same empty-string guard as for literal unions.
                return Ok(SchemaNode::primitive(context, SchemaKind::String));
            }
            Ok(SchemaNode {
                enum_values: Some(vec![json!(value)]),
                ..SchemaNode::primitive(context, SchemaKind::String)
            })
        }

        TypeNode::ConstInt(value) => Ok(SchemaNode {
            enum_values: Some(vec![json!(value)]),
            ..SchemaNode::int64(context)
        }),

        TypeNode::Generic { .. } => Err(Error::resolution(
            context,
            format!("Unable to resolve type: {:?}", node),
        )),
    }
}

/// Resolves a union or intersection that is not a pure literal enum.
#[allow(clippy::too_many_arguments)]
fn compose(
    context: &str,
    definitions: &Definitions,
    members: &[TypeNode],
    reporter: &Reporter,
    in_definition: bool,
    depth: usize,
    is_intersection: bool,
) -> Result<SchemaNode> {
    let mut nullable = false;
    let mut items: Vec<SchemaNode> = Vec::new();

    for member in members {
        if member.is_identifier("null") {
            nullable = true;
            continue;
        }
        if member.is_identifier("mixed") {
            reporter.error(context, "Unions and intersections should not contain 'mixed'")?;
        }
        let schema = resolve_node(context, definitions, member, reporter, in_definition, depth + 1)?;
        // Deduplicate by structural equality, preserving source order.
        if !items.contains(&schema) {
            items.push(schema);
        }
    }

    let mut items = merge_enums(context, items);

    if items.len() == 1 {
        let mut schema = items.pop().unwrap();
        schema.nullable = nullable;
        return Ok(schema);
    }

    if is_intersection {
        return Ok(SchemaNode {
            nullable,
            all_of: Some(items),
            ..SchemaNode::new(context)
        });
    }

    // oneOf requires that a consumer can discriminate the members: every
    // member needs a determinate kind and no two kinds may overlap (integer
    // and number count as the same kind here).
    let kinds: Vec<Option<SchemaKind>> = items
        .iter()
        .map(|item| match item.kind {
            Some(SchemaKind::Integer) => Some(SchemaKind::Number),
            other => other,
        })
        .collect();
    let indeterminate = kinds.iter().any(|kind| kind.is_none());
    let overlapping = kinds
        .iter()
        .enumerate()
        .any(|(i, kind)| kinds[..i].contains(kind));

    if indeterminate || overlapping {
        Ok(SchemaNode {
            nullable,
            any_of: Some(items),
            ..SchemaNode::new(context)
        })
    } else {
        Ok(SchemaNode {
            nullable,
            one_of: Some(items),
            ..SchemaNode::new(context)
        })
    }
}

/// Merges adjacent same-kind enum members of a union into a single enum.
///
/// If a non-enum member shares its kind with an accumulated enum group, the
/// group is dropped entirely because the broader member subsumes it. This
/// mirrors the original extractor and can silently widen mixed unions such as
/// `string|'literal'`.
fn merge_enums(context: &str, types: Vec<SchemaNode>) -> Vec<SchemaNode> {
    let mut enums: Vec<(SchemaKind, Vec<Value>)> = Vec::new();
    let mut non_enums: Vec<SchemaNode> = Vec::new();

    for schema in types {
        match (&schema.enum_values, schema.kind) {
            (Some(values), Some(kind)) => {
                if let Some((_, group)) = enums.iter_mut().find(|(k, _)| *k == kind) {
                    group.extend(values.clone());
                } else {
                    enums.push((kind, values.clone()));
                }
            }
            _ => non_enums.push(schema),
        }
    }

    for kind in non_enums.iter().filter_map(|schema| schema.kind) {
        enums.retain(|(k, _)| *k != kind);
    }

    non_enums.extend(enums.into_iter().map(|(kind, values)| SchemaNode {
        enum_values: Some(values),
        ..SchemaNode::primitive(context, kind)
    }));
    non_enums
}

fn resolve_identifier(
    context: &str,
    definitions: &Definitions,
    name: &str,
    reporter: &Reporter,
) -> Result<SchemaNode> {
    if name == "array" {
        reporter.error(
            context,
            "Instead of 'array' use:\n\
             'object' for empty objects\n\
             'array<string, mixed>' for non-empty objects\n\
             'list<empty>' for empty lists\n\
             'list<TYPE>' for lists",
        )?;
    }

    match name {
        "string" | "non-falsy-string" | "numeric-string" => {
            Ok(SchemaNode::primitive(context, SchemaKind::String))
        }
        "non-empty-string" => Ok(SchemaNode {
            min_length: Some(1),
            ..SchemaNode::primitive(context, SchemaKind::String)
        }),
        "int" | "integer" => Ok(SchemaNode::int64(context)),
        "non-negative-int" => Ok(SchemaNode {
            minimum: Some(0),
            ..SchemaNode::int64(context)
        }),
        "positive-int" => Ok(SchemaNode {
            minimum: Some(1),
            ..SchemaNode::int64(context)
        }),
        "negative-int" => Ok(SchemaNode {
            maximum: Some(-1),
            ..SchemaNode::int64(context)
        }),
        "non-positive-int" => Ok(SchemaNode {
            maximum: Some(0),
            ..SchemaNode::int64(context)
        }),
        "bool" | "boolean" => Ok(SchemaNode::primitive(context, SchemaKind::Boolean)),
        "true" => Ok(SchemaNode {
            enum_values: Some(vec![json!(true)]),
            ..SchemaNode::primitive(context, SchemaKind::Boolean)
        }),
        "false" => Ok(SchemaNode {
            enum_values: Some(vec![json!(false)]),
            ..SchemaNode::primitive(context, SchemaKind::Boolean)
        }),
        "numeric" => Ok(SchemaNode::primitive(context, SchemaKind::Number)),
        // float and double are both double precision on the wire
        "float" | "double" => Ok(SchemaNode {
            format: Some("double".to_string()),
            ..SchemaNode::primitive(context, SchemaKind::Number)
        }),
        "mixed" | "empty" | "array" => Ok(SchemaNode::primitive(context, SchemaKind::Object)),
        "object" => Ok(SchemaNode {
            additional_properties: Some(AdditionalProperties::Flag(true)),
            ..SchemaNode::primitive(context, SchemaKind::Object)
        }),
        "null" => Ok(SchemaNode {
            nullable: true,
            ..SchemaNode::new(context)
        }),
        _ => {
            if definitions.contains(name) {
                // The alias body is resolved lazily when the table is
                // flattened into named schemas; referencing it here only
                // produces the pointer. This keeps self-referential aliases
                // from recursing at the point of use.
                return Ok(SchemaNode::reference(
                    context,
                    format!("#/components/schemas/{}", definitions.schema_name(name)),
                ));
            }
            Err(Error::resolution(
                context,
                format!("Unable to resolve type for identifier '{}'", name),
            ))
        }
    }
}
