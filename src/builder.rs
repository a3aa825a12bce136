//! Assembly of the per-scope OpenAPI documents.
//!
//! The builder turns a loaded [`ApiManifest`] into one JSON document per
//! scope: it flattens the definitions into named schemas, merges capability
//! declarations, expands every route into an operation and finally partitions
//! everything by scope, filtering each scope's schema registry down to the
//! `$ref`s it actually reaches.

use crate::ast::Definitions;
use crate::error::{Error, Result};
use crate::grammar::parse_type;
use crate::manifest::{ApiManifest, ParameterManifest, RouteManifest};
use crate::merge::merge_schemas;
use crate::reporter::Reporter;
use crate::resolver;
use crate::response::{resolve_responses, ResponseDescriptor};
use crate::schema::{clean_doc, SchemaKind, SchemaNode};
use indexmap::IndexMap;
use log::{debug, info};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";
const DEPRECATED_MARKER: &str = "@deprecated";

/// Knobs of the assembly step, set by the CLI.
pub struct BuildOptions {
    pub openapi_version: String,
    /// Only keep the first documented status code per operation.
    pub first_status_code: bool,
    /// Only keep the first content type per response.
    pub first_content_type: bool,
    pub use_tags: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            openapi_version: "3.0.3".to_string(),
            first_status_code: false,
            first_content_type: false,
            use_tags: true,
        }
    }
}

/// One finished document.
#[derive(Debug, Clone)]
pub struct ScopeDocument {
    pub scope: String,
    /// File name suffix, empty for the default or only scope.
    pub suffix: String,
    pub document: Value,
}

/// Builds all scope documents for the manifest.
pub fn build(
    manifest: &ApiManifest,
    options: &BuildOptions,
    reporter: &Reporter,
) -> Result<Vec<ScopeDocument>> {
    info!(
        "Building OpenAPI spec for {} {}",
        manifest.module.id, manifest.module.version
    );

    let readable_id = Definitions::readable_id(&manifest.module.id);
    let mut definitions = Definitions::new(&readable_id);
    for (alias, annotation) in &manifest.definitions {
        let context = format!("Response definitions: {}", alias);
        if !alias.starts_with(&readable_id) {
            reporter.error(
                "Response definitions",
                &format!("Type alias '{}' has to start with '{}'", alias, readable_id),
            )?;
        }
        definitions.insert(alias.clone(), parse_type(&context, annotation)?);
    }

    // Ordered alphabetically, matching the emitted registry order.
    let mut schemas: BTreeMap<String, Value> = BTreeMap::new();
    for (alias, node) in definitions.iter() {
        let context = format!("Response definitions: {}", alias);
        let schema = resolver::resolve_definition(&context, &definitions, node, reporter)?;
        schemas.insert(
            definitions.schema_name(alias).to_string(),
            schema.to_value(false, reporter),
        );
    }

    let mut capabilities: Vec<Value> = Vec::new();
    let mut public_capabilities: Vec<Value> = Vec::new();
    for capability in &manifest.capabilities {
        let node = parse_type(&capability.name, &capability.schema)?;
        let schema = resolver::resolve(&capability.name, &definitions, &node, reporter)?
            .to_value(false, reporter);
        if capability.public {
            public_capabilities.push(schema);
        } else {
            capabilities.push(schema);
        }
    }
    if !capabilities.is_empty() {
        schemas.insert(
            "Capabilities".to_string(),
            merge_schemas("Capabilities", &capabilities)?,
        );
    }
    if !public_capabilities.is_empty() {
        schemas.insert(
            "PublicCapabilities".to_string(),
            merge_schemas("PublicCapabilities", &public_capabilities)?,
        );
    }
    if capabilities.is_empty() && public_capabilities.is_empty() {
        debug!("No capabilities were loaded");
    }

    let mut operation_ids: Vec<String> = Vec::new();
    let mut tag_names: Vec<String> = Vec::new();
    // scope -> url -> verb -> operation
    let mut scope_paths: IndexMap<String, IndexMap<String, IndexMap<String, Value>>> =
        IndexMap::new();

    for route in &manifest.routes {
        let Some(operation) = build_operation(route, &definitions, options, reporter)? else {
            continue;
        };

        let operation_id = operation["operationId"].as_str().unwrap_or_default().to_string();
        if operation_ids.contains(&operation_id) {
            return Err(Error::resolution(
                &route.name,
                "Route is not unique! If you want two routes pointing to the same method \
                 you must specify a postfix on at least one of them.",
            ));
        }
        operation_ids.push(operation_id);

        if options.use_tags {
            for tag in route_tags(route) {
                if !tag_names.contains(&tag) {
                    tag_names.push(tag);
                }
            }
        }

        let scope = route.scope.clone().unwrap_or_else(|| "default".to_string());
        let verb = route.verb.to_ascii_lowercase();
        let paths = scope_paths.entry(scope).or_default();
        let operations = paths.entry(route.url.clone()).or_default();
        if operations.contains_key(&verb) {
            reporter.error(
                &route.name,
                &format!(
                    "Operation '{}' already set for path '{}'",
                    route.verb, route.url
                ),
            )?;
        }
        operations.insert(verb, operation);
        debug!("Route {} generated", route.name);
    }

    if schemas.is_empty() && scope_paths.is_empty() {
        reporter.error("app", "No spec generated")?;
    }

    let has_single_scope = scope_paths.len() <= 1;
    if !has_single_scope {
        scope_paths.insert("full".to_string(), IndexMap::new());
    } else if scope_paths.is_empty() {
        if schemas.contains_key("Capabilities") || schemas.contains_key("PublicCapabilities") {
            debug!("Generating default scope without routes to populate capabilities");
            scope_paths.insert("default".to_string(), IndexMap::new());
        } else {
            return Err(Error::resolution("app", "No routes or capabilities defined"));
        }
    }

    let mut used_schemas: Vec<String> =
        vec!["Capabilities".to_string(), "PublicCapabilities".to_string()];
    let mut full_paths: IndexMap<String, IndexMap<String, Value>> = IndexMap::new();
    let mut documents = Vec::new();

    for (scope, paths) in &scope_paths {
        let suffix = if has_single_scope || scope == "default" {
            String::new()
        } else {
            format!("-{}", scope)
        };

        let (scope_paths_value, scope_schemas) = if scope == "full" {
            (paths_to_value(&full_paths), schemas.clone())
        } else {
            if !has_single_scope {
                for (url, operations) in paths {
                    full_paths
                        .entry(url.clone())
                        .or_default()
                        .extend(operations.clone());
                }
            }
            let scoped =
                collect_scope_schemas(scope, paths, &schemas, &mut used_schemas, reporter)?;
            (paths_to_value(paths), scoped)
        };

        let mut document = Map::new();
        document.insert("openapi".to_string(), json!(options.openapi_version));
        document.insert(
            "info".to_string(),
            module_info(manifest, &suffix, &options.openapi_version)?,
        );
        document.insert(
            "components".to_string(),
            json!({
                "securitySchemes": {
                    "basic_auth": {"type": "http", "scheme": "basic"},
                    "bearer_auth": {"type": "http", "scheme": "bearer"},
                },
                "schemas": scope_schemas,
            }),
        );
        document.insert("paths".to_string(), scope_paths_value);
        if options.use_tags {
            document.insert(
                "tags".to_string(),
                json!(tag_names
                    .iter()
                    .map(|name| json!({"name": name}))
                    .collect::<Vec<_>>()),
            );
        }

        info!("Generated scope {} with {} paths", scope, paths.len());
        documents.push(ScopeDocument {
            scope: scope.clone(),
            suffix,
            document: Value::Object(document),
        });
    }

    let unused: Vec<&str> = schemas
        .keys()
        .filter(|name| !used_schemas.contains(name))
        .map(String::as_str)
        .collect();
    if !unused.is_empty() {
        reporter.error("app", &format!("Unused schemas: {}", unused.join(", ")))?;
    }

    Ok(documents)
}

fn module_info(manifest: &ApiManifest, suffix: &str, openapi_version: &str) -> Result<Value> {
    let mut info = Map::new();
    info.insert(
        "title".to_string(),
        json!(format!("{}{}", manifest.module.id, suffix)),
    );
    // Document version, not the module version
    info.insert("version".to_string(), json!("0.0.1"));
    if let Some(summary) = &manifest.module.summary {
        info.insert("description".to_string(), json!(summary));
    }
    if let Some(license) = &manifest.module.license {
        let identifier = match license.as_str() {
            "agpl" => "AGPL-3.0-only",
            other => {
                return Err(Error::resolution(
                    "license",
                    format!("Unable to convert {} to SPDX identifier", other),
                ))
            }
        };
        let mut value = json!({"name": license});
        if version_at_least(openapi_version, (3, 1, 0)) {
            value["identifier"] = json!(identifier);
        }
        info.insert("license".to_string(), value);
    }
    Ok(Value::Object(info))
}

fn version_at_least(version: &str, (major, minor, patch): (u32, u32, u32)) -> bool {
    let mut parts = version.split('.').map(|p| p.parse::<u32>().unwrap_or(0));
    let actual = (
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    );
    actual >= (major, minor, patch)
}

fn route_tags(route: &RouteManifest) -> Vec<String> {
    if route.tags.is_empty() {
        let controller = route.name.split('.').next().unwrap_or(&route.name);
        vec![controller.to_string()]
    } else {
        route.tags.clone()
    }
}

/// A route parameter with its resolved schema.
struct ResolvedParameter {
    name: String,
    schema: SchemaNode,
    description: Option<String>,
}

impl ResolvedParameter {
    fn required(&self) -> bool {
        !self.schema.nullable && !self.schema.has_default
    }
}

fn resolve_parameter(
    route: &RouteManifest,
    parameter: &ParameterManifest,
    definitions: &Definitions,
    reporter: &Reporter,
) -> Result<ResolvedParameter> {
    let context = format!("{}: ${}", route.name, parameter.name);
    let node = parse_type(&context, &parameter.annotation)?;
    let mut schema = resolver::resolve(&context, definitions, &node, reporter)?;

    if let Some(default) = &parameter.default {
        schema.has_default = true;
        schema.default_value = Some(default.clone());
    }

    let description = parameter.description.as_ref().map(|text| {
        let mut text = text.clone();
        if text.contains(DEPRECATED_MARKER) {
            schema.deprecated = true;
            text = text.replace(DEPRECATED_MARKER, "");
        }
        clean_doc(&text)
    });

    Ok(ResolvedParameter {
        name: parameter.name.clone(),
        schema,
        description: description.filter(|text| !text.is_empty()),
    })
}

/// Extracts `{param}` placeholders from the URL template, in order.
fn url_parameters(url: &str) -> Vec<String> {
    let mut parameters = Vec::new();
    let mut rest = url;
    while let Some(start) = rest.find('{') {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        parameters.push(rest[start + 1..start + end].to_string());
        rest = &rest[start + end + 1..];
    }
    parameters
}

fn anchor_requirement(requirement: &str) -> String {
    let mut pattern = requirement.to_string();
    if !pattern.starts_with('^') {
        pattern = format!("^{}", pattern);
    }
    if !pattern.ends_with('$') {
        pattern.push('$');
    }
    pattern
}

/// Builds the operation object for one route, or `None` when the route has
/// nothing documentable and assembly should skip it.
fn build_operation(
    route: &RouteManifest,
    definitions: &Definitions,
    options: &BuildOptions,
    reporter: &Reporter,
) -> Result<Option<Value>> {
    let returns = parse_type(&route.name, &route.returns)?;
    let responses = resolve_responses(&route.name, definitions, &returns, reporter)?;
    if responses.is_empty() {
        reporter.error(&route.name, "Returns no responses")?;
        return Ok(None);
    }

    let parameters: Vec<ResolvedParameter> = route
        .parameters
        .iter()
        .map(|parameter| resolve_parameter(route, parameter, definitions, reporter))
        .collect::<Result<_>>()?;

    let url_parameters = url_parameters(&route.url);
    let unused: Vec<&str> = route
        .requirements
        .keys()
        .filter(|name| !url_parameters.contains(name))
        .map(String::as_str)
        .collect();
    if !unused.is_empty() {
        reporter.error(
            &route.name,
            &format!("Unused requirements: {}", unused.join(",")),
        )?;
    }

    let mut path_parameters: Vec<Value> = Vec::new();
    for url_parameter in &url_parameters {
        let matching = parameters
            .iter()
            .find(|parameter| parameter.name == *url_parameter);
        let (mut schema, description) = match matching {
            Some(parameter) => (
                parameter.schema.to_value(true, reporter),
                parameter.description.clone(),
            ),
            None => {
                if !route.requirements.contains_key(url_parameter) {
                    reporter.error(
                        &route.name,
                        &format!("Unable to find parameter for '{}'", url_parameter),
                    )?;
                }
                (json!({"type": "string"}), None)
            }
        };

        if schema["type"] == json!("string") {
            if let Some(requirement) = route.requirements.get(url_parameter) {
                schema["pattern"] = json!(anchor_requirement(requirement));
            }
        }
        if let Some(default) = route.defaults.get(url_parameter) {
            schema["default"] = default.clone();
        }

        let mut value = Map::new();
        value.insert("name".to_string(), json!(url_parameter));
        value.insert("in".to_string(), json!("path"));
        if let Some(description) = description {
            value.insert("description".to_string(), json!(description));
        }
        value.insert("required".to_string(), json!(true));
        value.insert("schema".to_string(), schema);
        path_parameters.push(Value::Object(value));
    }

    let body_verb = matches!(
        route.verb.to_ascii_lowercase().as_str(),
        "put" | "post" | "patch"
    );
    let mut query_parameters: Vec<&ResolvedParameter> = Vec::new();
    let mut body_parameters: Vec<&ResolvedParameter> = Vec::new();
    for parameter in &parameters {
        if url_parameters.contains(&parameter.name) {
            continue;
        }
        if body_verb {
            body_parameters.push(parameter);
        } else {
            query_parameters.push(parameter);
        }
    }

    let merged_responses = merge_responses(route, &responses, options, reporter)?;

    let mut operation = Map::new();
    operation.insert(
        "operationId".to_string(),
        json!(route.name.replace('.', "-").to_ascii_lowercase()),
    );
    if let Some(summary) = &route.summary {
        operation.insert("summary".to_string(), json!(clean_doc(summary)));
    }
    if let Some(description) = &route.description {
        operation.insert("description".to_string(), json!(clean_doc(description)));
    }
    if route.deprecated {
        operation.insert("deprecated".to_string(), json!(true));
    }
    if options.use_tags {
        operation.insert("tags".to_string(), json!(route_tags(route)));
    }

    let mut security: Vec<Value> = Vec::new();
    if route.public {
        // Empty requirement: authentication is optional on public routes.
        security.push(json!({}));
    }
    security.push(json!({"bearer_auth": []}));
    // Basic auth last, only a fallback when bearer is available
    security.push(json!({"basic_auth": []}));
    operation.insert("security".to_string(), json!(security));

    if !body_parameters.is_empty() {
        let required: Vec<&str> = body_parameters
            .iter()
            .filter(|parameter| parameter.required())
            .map(|parameter| parameter.name.as_str())
            .collect();

        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("object"));
        if !required.is_empty() {
            schema.insert("required".to_string(), json!(required));
        }
        let mut properties = Map::new();
        for parameter in &body_parameters {
            let mut value = parameter.schema.to_value(false, reporter);
            if let Some(description) = &parameter.description {
                value["description"] = json!(description);
            }
            properties.insert(parameter.name.clone(), value);
        }
        schema.insert("properties".to_string(), Value::Object(properties));

        operation.insert(
            "requestBody".to_string(),
            json!({
                "required": !required.is_empty(),
                "content": {"application/json": {"schema": schema}},
            }),
        );
    }

    let mut operation_parameters = path_parameters;
    for parameter in &query_parameters {
        let suffix = if parameter.schema.kind == Some(SchemaKind::Array) {
            "[]"
        } else {
            ""
        };
        let mut value = Map::new();
        value.insert(
            "name".to_string(),
            json!(format!("{}{}", parameter.name, suffix)),
        );
        value.insert("in".to_string(), json!("query"));
        if let Some(description) = &parameter.description {
            value.insert("description".to_string(), json!(description));
        }
        if parameter.required() {
            value.insert("required".to_string(), json!(true));
        }
        if parameter.schema.deprecated {
            value.insert("deprecated".to_string(), json!(true));
        }
        value.insert("schema".to_string(), parameter.schema.to_value(true, reporter));
        operation_parameters.push(Value::Object(value));
    }
    if !operation_parameters.is_empty() {
        operation.insert("parameters".to_string(), json!(operation_parameters));
    }

    operation.insert("responses".to_string(), merged_responses);

    Ok(Some(Value::Object(operation)))
}

/// Groups descriptors by status code, then by content type, collapsing
/// duplicate schemas and choosing `oneOf`/`anyOf` for the remainder.
fn merge_responses(
    route: &RouteManifest,
    responses: &[Option<ResponseDescriptor>],
    options: &BuildOptions,
    reporter: &Reporter,
) -> Result<Value> {
    let descriptors: Vec<&ResponseDescriptor> =
        responses.iter().filter_map(Option::as_ref).collect();

    let mut status_codes: Vec<u16> = Vec::new();
    for descriptor in &descriptors {
        if !status_codes.contains(&descriptor.status_code) {
            status_codes.push(descriptor.status_code);
        }
    }

    let mut merged = Map::new();
    for status_code in status_codes {
        if options.first_status_code && !merged.is_empty() {
            break;
        }

        let of_status: Vec<&&ResponseDescriptor> = descriptors
            .iter()
            .filter(|descriptor| descriptor.status_code == status_code)
            .collect();

        let mut headers: IndexMap<&str, &SchemaNode> = IndexMap::new();
        for descriptor in &of_status {
            for (name, schema) in &descriptor.headers {
                headers.insert(name, schema);
            }
        }

        let mut content_types: Vec<&str> = Vec::new();
        for descriptor in &of_status {
            if let Some(content_type) = &descriptor.content_type {
                if !content_types.contains(&content_type.as_str()) {
                    content_types.push(content_type);
                }
            }
        }

        let mut content = Map::new();
        for content_type in content_types {
            if options.first_content_type && !content.is_empty() {
                break;
            }

            let of_content_type: Vec<&&&ResponseDescriptor> = of_status
                .iter()
                .filter(|descriptor| descriptor.content_type.as_deref() == Some(content_type))
                .collect();
            let has_empty = of_content_type
                .iter()
                .any(|descriptor| descriptor.body.is_none());

            let mut unique: Vec<Value> = Vec::new();
            for descriptor in &of_content_type {
                if let Some(body) = &descriptor.body {
                    let schema = clean_empty_response_array(body.to_value(false, reporter));
                    if !unique.contains(&schema) {
                        unique.push(schema);
                    }
                }
            }

            let entry = if unique.len() == 1 {
                if has_empty {
                    json!({})
                } else {
                    json!({"schema": unique.remove(0)})
                }
            } else {
                let key = if has_empty { "anyOf" } else { "oneOf" };
                let mut composition = Map::new();
                composition.insert(key.to_string(), json!(unique));
                json!({"schema": composition})
            };
            content.insert(content_type.to_string(), entry);
        }

        let description = match route.response_descriptions.get(&status_code) {
            Some(description) => clean_doc(description),
            None => {
                reporter.error(
                    &route.name,
                    &format!("Missing description for the {} response", status_code),
                )?;
                String::new()
            }
        };

        let mut response = Map::new();
        response.insert("description".to_string(), json!(description));
        if !headers.is_empty() {
            let map: Map<String, Value> = headers
                .iter()
                .map(|(name, schema)| {
                    (
                        name.to_string(),
                        json!({"schema": schema.to_value(false, reporter)}),
                    )
                })
                .collect();
            response.insert("headers".to_string(), Value::Object(map));
        }
        if !content.is_empty() {
            response.insert("content".to_string(), Value::Object(content));
        }
        merged.insert(status_code.to_string(), Value::Object(response));
    }

    Ok(Value::Object(merged))
}

/// A structurally-empty list body carries no information in response
/// position; it collapses to the open object marker.
fn clean_empty_response_array(schema: Value) -> Value {
    if schema["type"] == json!("array") && schema["maxItems"] == json!(0) {
        json!({})
    } else {
        schema
    }
}

fn collect_used_refs(value: &Value) -> Vec<String> {
    let mut refs = Vec::new();
    if let Some(reference) = value.get("$ref").and_then(Value::as_str) {
        refs.push(reference.to_string());
    }
    if let Some(properties) = value.get("properties").and_then(Value::as_object) {
        for property in properties.values() {
            refs.extend(collect_used_refs(property));
        }
    }
    if let Some(items) = value.get("items") {
        refs.extend(collect_used_refs(items));
    }
    refs
}

/// Filters the schema registry down to what the scope's operations reach via
/// `$ref`, transitively. Capability schemas are always kept.
fn collect_scope_schemas(
    scope: &str,
    paths: &IndexMap<String, IndexMap<String, Value>>,
    schemas: &BTreeMap<String, Value>,
    used_schemas: &mut Vec<String>,
    reporter: &Reporter,
) -> Result<BTreeMap<String, Value>> {
    let mut queue: Vec<String> = Vec::new();
    for operations in paths.values() {
        for operation in operations.values() {
            if let Some(responses) = operation.get("responses").and_then(Value::as_object) {
                for response in responses.values() {
                    if let Some(content) = response.get("content") {
                        queue.extend(collect_used_refs(content));
                    }
                }
            }
            if let Some(content) = operation.pointer("/requestBody/content") {
                queue.extend(collect_used_refs(content));
            }
        }
    }

    let mut scoped: BTreeMap<String, Value> = BTreeMap::new();
    while let Some(reference) = queue.pop() {
        let Some(name) = reference.strip_prefix(SCHEMA_REF_PREFIX) else {
            continue;
        };
        if scoped.contains_key(name) {
            continue;
        }

        let Some(schema) = schemas.get(name) else {
            reporter.error(
                "app",
                &format!("Schema {} used by scope {} is not defined", name, scope),
            )?;
            continue;
        };

        queue.extend(collect_used_refs(schema));
        scoped.insert(name.to_string(), schema.clone());
        used_schemas.push(name.to_string());
    }

    for capability in ["Capabilities", "PublicCapabilities"] {
        if let Some(schema) = schemas.get(capability) {
            scoped.insert(capability.to_string(), schema.clone());
        }
    }

    Ok(scoped)
}

fn paths_to_value(paths: &IndexMap<String, IndexMap<String, Value>>) -> Value {
    let map: Map<String, Value> = paths
        .iter()
        .map(|(url, operations)| {
            let operations: Map<String, Value> = operations
                .iter()
                .map(|(verb, operation)| (verb.clone(), operation.clone()))
                .collect();
            (url.clone(), Value::Object(operations))
        })
        .collect();
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ModuleInfo;
    use pretty_assertions::assert_eq;

    fn module() -> ModuleInfo {
        serde_json::from_value(json!({
            "id": "notes",
            "name": "Notes",
            "summary": "A note taking module",
            "version": "1.0.0",
            "license": "agpl",
        }))
        .unwrap()
    }

    fn manifest(routes: Value) -> ApiManifest {
        ApiManifest {
            module: module(),
            definitions: serde_json::from_value(json!({
                "NotesNote": "array{id: int, title: string}",
            }))
            .unwrap(),
            capabilities: vec![],
            routes: serde_json::from_value(routes).unwrap(),
        }
    }

    fn index_route() -> Value {
        json!({
            "name": "notes.index",
            "verb": "get",
            "url": "/notes",
            "summary": "List all notes",
            "returns": "DataResponse<STATUS_OK, list<NotesNote>, array{}>",
            "response_descriptions": {"200": "Notes returned"},
        })
    }

    fn build_single(routes: Value) -> Value {
        let reporter = Reporter::lenient();
        let documents = build(&manifest(routes), &BuildOptions::default(), &reporter).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(reporter.error_count(), 0, "unexpected diagnostics");
        documents.into_iter().next().unwrap().document
    }

    #[test]
    fn test_definitions_become_named_schemas() {
        let document = build_single(json!([index_route()]));

        assert_eq!(
            document["components"]["schemas"]["Note"],
            json!({
                "type": "object",
                "required": ["id", "title"],
                "properties": {
                    "id": {"type": "integer", "format": "int64"},
                    "title": {"type": "string"},
                },
            })
        );
    }

    #[test]
    fn test_info_and_security_schemes() {
        let document = build_single(json!([index_route()]));

        assert_eq!(
            document["info"],
            json!({
                "title": "notes",
                "version": "0.0.1",
                "description": "A note taking module",
                "license": {"name": "agpl"},
            })
        );
        assert_eq!(
            document["components"]["securitySchemes"],
            json!({
                "basic_auth": {"type": "http", "scheme": "basic"},
                "bearer_auth": {"type": "http", "scheme": "bearer"},
            })
        );
    }

    #[test]
    fn test_operation_shape() {
        let document = build_single(json!([index_route()]));
        let operation = &document["paths"]["/notes"]["get"];

        assert_eq!(operation["operationId"], json!("notes-index"));
        assert_eq!(operation["summary"], json!("List all notes"));
        assert_eq!(operation["tags"], json!(["notes"]));
        assert_eq!(
            operation["security"],
            json!([{"bearer_auth": []}, {"basic_auth": []}])
        );
        assert_eq!(
            operation["responses"]["200"]["content"]["application/json"]["schema"],
            json!({
                "type": "array",
                "items": {"$ref": "#/components/schemas/Note"},
            })
        );
    }

    #[test]
    fn test_body_vs_query_split() {
        let get = build_single(json!([{
            "name": "notes.search",
            "verb": "get",
            "url": "/search",
            "parameters": [{"name": "query", "type": "string"}],
            "returns": "DataResponse<STATUS_OK, list<NotesNote>, array{}>",
            "response_descriptions": {"200": "Matches returned"},
        }]));
        let operation = &get["paths"]["/search"]["get"];
        assert_eq!(
            operation["parameters"],
            json!([{
                "name": "query",
                "in": "query",
                "required": true,
                "schema": {"type": "string"},
            }])
        );
        assert!(operation.get("requestBody").is_none());

        let post = build_single(json!([{
            "name": "notes.create",
            "verb": "post",
            "url": "/notes",
            "parameters": [
                {"name": "title", "type": "string", "description": "The note title"},
                {"name": "favorite", "type": "bool", "default": false},
            ],
            "returns": "DataResponse<STATUS_OK, NotesNote, array{}>",
            "response_descriptions": {"200": "Note created"},
        }]));
        let operation = &post["paths"]["/notes"]["post"];
        assert!(operation.get("parameters").is_none());
        assert_eq!(
            operation["requestBody"],
            json!({
                "required": true,
                "content": {"application/json": {"schema": {
                    "type": "object",
                    "required": ["title"],
                    "properties": {
                        "title": {"type": "string", "description": "The note title"},
                        "favorite": {"type": "boolean", "default": false},
                    },
                }}},
            })
        );
    }

    #[test]
    fn test_path_parameter_with_requirement_and_default() {
        let document = build_single(json!([{
            "name": "notes.get",
            "verb": "get",
            "url": "/notes/{id}/{format}",
            "parameters": [
                {"name": "id", "type": "int"},
                {"name": "format", "type": "string"},
            ],
            "requirements": {"format": "json|md"},
            "defaults": {"format": "json"},
            "returns": "DataResponse<STATUS_OK, NotesNote, array{}>",
            "response_descriptions": {"200": "Note returned"},
        }]));
        let parameters = document["paths"]["/notes/{id}/{format}"]["get"]["parameters"]
            .as_array()
            .unwrap();

        assert_eq!(
            parameters[0],
            json!({
                "name": "id",
                "in": "path",
                "required": true,
                "schema": {"type": "integer", "format": "int64"},
            })
        );
        assert_eq!(
            parameters[1],
            json!({
                "name": "format",
                "in": "path",
                "required": true,
                "schema": {"type": "string", "pattern": "^json|md$", "default": "json"},
            })
        );
    }

    #[test]
    fn test_array_query_parameter_gets_bracket_suffix() {
        let document = build_single(json!([{
            "name": "notes.bulk",
            "verb": "get",
            "url": "/bulk",
            "parameters": [{"name": "ids", "type": "list<int>"}],
            "returns": "DataResponse<STATUS_OK, list<NotesNote>, array{}>",
            "response_descriptions": {"200": "Notes returned"},
        }]));
        let parameters = document["paths"]["/bulk"]["get"]["parameters"]
            .as_array()
            .unwrap();

        assert_eq!(parameters[0]["name"], json!("ids[]"));
    }

    #[test]
    fn test_deprecated_marker_flips_parameter() {
        let document = build_single(json!([{
            "name": "notes.old",
            "verb": "get",
            "url": "/old",
            "parameters": [
                {"name": "legacy", "type": "?string", "description": "@deprecated use /notes"},
            ],
            "returns": "DataResponse<STATUS_OK, list<NotesNote>, array{}>",
            "response_descriptions": {"200": "Notes returned"},
        }]));
        let parameter = &document["paths"]["/old"]["get"]["parameters"][0];

        assert_eq!(parameter["deprecated"], json!(true));
        assert_eq!(parameter["description"], json!("use /notes"));
        assert!(parameter.get("required").is_none());
    }

    #[test]
    fn test_duplicate_response_schemas_collapse() {
        let document = build_single(json!([{
            "name": "notes.get",
            "verb": "get",
            "url": "/note",
            "returns": "DataResponse<STATUS_OK, NotesNote, array{}>|DataResponse<STATUS_OK, NotesNote, array{}>",
            "response_descriptions": {"200": "Note returned"},
        }]));
        let schema =
            &document["paths"]["/note"]["get"]["responses"]["200"]["content"]["application/json"];

        assert_eq!(
            schema,
            &json!({"schema": {"$ref": "#/components/schemas/Note"}})
        );
    }

    #[test]
    fn test_distinct_response_schemas_become_one_of() {
        let document = build_single(json!([{
            "name": "notes.get",
            "verb": "get",
            "url": "/note",
            "returns": "DataResponse<STATUS_OK, NotesNote, array{}>|DataResponse<STATUS_OK, string, array{}>",
            "response_descriptions": {"200": "Note returned"},
        }]));
        let schema = &document["paths"]["/note"]["get"]["responses"]["200"]["content"]
            ["application/json"]["schema"];

        assert_eq!(
            schema,
            &json!({"oneOf": [
                {"$ref": "#/components/schemas/Note"},
                {"type": "string"},
            ]})
        );
    }

    #[test]
    fn test_empty_list_body_collapses_to_open_object() {
        let reporter = Reporter::lenient();
        let mut manifest = manifest(json!([{
            "name": "notes.clear",
            "verb": "post",
            "url": "/clear",
            "returns": "DataResponse<STATUS_OK, list<empty>, array{}>",
            "response_descriptions": {"200": "Notes cleared"},
        }]));
        manifest.definitions.clear();

        let documents = build(&manifest, &BuildOptions::default(), &reporter).unwrap();
        let document = &documents[0].document;
        let schema = &document["paths"]["/clear"]["post"]["responses"]["200"]["content"]
            ["application/json"]["schema"];

        assert_eq!(schema, &json!({}));
    }

    #[test]
    fn test_public_route_gets_optional_security() {
        let reporter = Reporter::lenient();
        let mut manifest = manifest(json!([{
            "name": "notes.status",
            "verb": "get",
            "url": "/status",
            "public": true,
            "returns": "DataResponse<STATUS_OK, array{online: bool}, array{}>",
            "response_descriptions": {"200": "Status returned"},
        }]));
        manifest.definitions.clear();

        let documents = build(&manifest, &BuildOptions::default(), &reporter).unwrap();
        let document = &documents[0].document;

        assert_eq!(
            document["paths"]["/status"]["get"]["security"],
            json!([{}, {"bearer_auth": []}, {"basic_auth": []}])
        );
    }

    #[test]
    fn test_scope_splitting_filters_refs() {
        let reporter = Reporter::lenient();
        let mut manifest = manifest(json!([
            index_route(),
            {
                "name": "settings.update",
                "verb": "post",
                "url": "/settings",
                "scope": "administration",
                "parameters": [{"name": "value", "type": "NotesSettings"}],
                "returns": "DataResponse<STATUS_OK, NotesSettings, array{}>",
                "response_descriptions": {"200": "Settings updated"},
            },
        ]));
        manifest
            .definitions
            .insert("NotesSettings".to_string(), "array{mode: string}".to_string());

        let documents = build(&manifest, &BuildOptions::default(), &reporter).unwrap();
        assert_eq!(reporter.error_count(), 0);

        let scopes: Vec<(&str, &str)> = documents
            .iter()
            .map(|document| (document.scope.as_str(), document.suffix.as_str()))
            .collect();
        assert_eq!(
            scopes,
            vec![("default", ""), ("administration", "-administration"), ("full", "-full")]
        );

        let default = &documents[0].document["components"]["schemas"];
        assert!(default.get("Note").is_some());
        assert!(default.get("Settings").is_none());

        let administration = &documents[1].document["components"]["schemas"];
        assert!(administration.get("Settings").is_some());
        assert!(administration.get("Note").is_none());

        let full = &documents[2].document;
        assert!(full["components"]["schemas"].get("Note").is_some());
        assert!(full["components"]["schemas"].get("Settings").is_some());
        assert!(full["paths"].get("/notes").is_some());
        assert!(full["paths"].get("/settings").is_some());
        assert_eq!(documents[1].document["info"]["title"], json!("notes-administration"));
    }

    #[test]
    fn test_unused_schema_is_reported() {
        let reporter = Reporter::lenient();
        let mut manifest = manifest(json!([index_route()]));
        manifest
            .definitions
            .insert("NotesUnused".to_string(), "array{a: int}".to_string());

        build(&manifest, &BuildOptions::default(), &reporter).unwrap();
        assert_eq!(reporter.error_count(), 1);
    }

    #[test]
    fn test_definition_without_module_prefix_is_reported() {
        let reporter = Reporter::lenient();
        let mut manifest = manifest(json!([index_route()]));
        manifest
            .definitions
            .insert("Rogue".to_string(), "array{a: int}".to_string());

        build(&manifest, &BuildOptions::default(), &reporter).unwrap();
        assert!(reporter.error_count() >= 1);
    }

    #[test]
    fn test_duplicate_verb_per_path_is_reported() {
        let reporter = Reporter::lenient();
        let manifest = manifest(json!([
            index_route(),
            {
                "name": "notes.list",
                "verb": "GET",
                "url": "/notes",
                "returns": "DataResponse<STATUS_OK, list<NotesNote>, array{}>",
                "response_descriptions": {"200": "Notes returned"},
            },
        ]));

        build(&manifest, &BuildOptions::default(), &reporter).unwrap();
        assert_eq!(reporter.error_count(), 1);
    }

    #[test]
    fn test_duplicate_operation_id_is_fatal() {
        let reporter = Reporter::lenient();
        let manifest = manifest(json!([index_route(), index_route()]));

        assert!(build(&manifest, &BuildOptions::default(), &reporter).is_err());
    }

    #[test]
    fn test_missing_response_description_is_reported() {
        let reporter = Reporter::lenient();
        let mut route = index_route();
        route["response_descriptions"] = json!({});
        let manifest = manifest(json!([route]));

        build(&manifest, &BuildOptions::default(), &reporter).unwrap();
        assert_eq!(reporter.error_count(), 1);
    }

    #[test]
    fn test_first_status_code_truncates() {
        let reporter = Reporter::lenient();
        let manifest = manifest(json!([{
            "name": "notes.get",
            "verb": "get",
            "url": "/note",
            "returns": "DataResponse<STATUS_OK|STATUS_NOT_FOUND, NotesNote, array{}>",
            "response_descriptions": {"200": "Note returned", "404": "Note not found"},
        }]));

        let options = BuildOptions {
            first_status_code: true,
            ..BuildOptions::default()
        };
        let documents = build(&manifest, &options, &reporter).unwrap();
        let responses = documents[0].document["paths"]["/note"]["get"]["responses"]
            .as_object()
            .unwrap();

        assert_eq!(responses.keys().collect::<Vec<_>>(), vec!["200"]);
    }

    #[test]
    fn test_capabilities_are_merged_and_always_included() {
        let reporter = Reporter::lenient();
        let mut manifest = manifest(json!([index_route()]));
        manifest.capabilities = serde_json::from_value(json!([
            {"name": "Capabilities", "schema": "array{notes: array{version: string}}"},
            {"name": "Capabilities", "schema": "array{notes: array{apiLevels: list<string>}}"},
        ]))
        .unwrap();

        let documents = build(&manifest, &BuildOptions::default(), &reporter).unwrap();
        assert_eq!(
            documents[0].document["components"]["schemas"]["Capabilities"],
            json!({
                "type": "object",
                "required": ["notes"],
                "properties": {"notes": {
                    "type": "object",
                    "required": ["version", "apiLevels"],
                    "properties": {
                        "version": {"type": "string"},
                        "apiLevels": {"type": "array", "items": {"type": "string"}},
                    },
                }},
            })
        );
    }

    #[test]
    fn test_capabilities_only_manifest_builds_default_scope() {
        let reporter = Reporter::lenient();
        let mut manifest = manifest(json!([]));
        manifest.definitions.clear();
        manifest.capabilities = serde_json::from_value(json!([
            {"name": "Capabilities", "schema": "array{notes: array{version: string}}"},
        ]))
        .unwrap();

        let documents = build(&manifest, &BuildOptions::default(), &reporter).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].scope, "default");
        assert_eq!(documents[0].document["paths"], json!({}));
    }

    #[test]
    fn test_empty_manifest_is_fatal() {
        let reporter = Reporter::lenient();
        let mut manifest = manifest(json!([]));
        manifest.definitions.clear();

        assert!(build(&manifest, &BuildOptions::default(), &reporter).is_err());
    }
}
