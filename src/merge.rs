//! Deep merging of serialized schemas.
//!
//! Merging happens on the JSON values, after serialization, because the
//! inputs come from independently scanned files and only need to agree
//! structurally. `required` lists take the deduplicated union; every other
//! key present in any input is merged recursively across the inputs that
//! carry it; diverging non-object leaves are a hard error.

use crate::error::{Error, Result};
use serde_json::{json, Map, Value};

/// Merges schemas that are expected to be structurally compatible.
pub fn merge_schemas(context: &str, schemas: &[Value]) -> Result<Value> {
    let objects: Vec<&Map<String, Value>> =
        schemas.iter().filter_map(|schema| schema.as_object()).collect();
    if objects.len() != schemas.len() {
        // At least one non-object leaf. They all have to be identical.
        let mut distinct: Vec<&Value> = Vec::new();
        for schema in schemas {
            if !distinct.contains(&schema) {
                distinct.push(schema);
            }
        }
        return match distinct.len() {
            0 => Err(Error::Merge(format!("{}: Nothing to merge", context))),
            1 => Ok(distinct[0].clone()),
            _ => Err(Error::Merge(format!("{}: Incompatibles types", context))),
        };
    }

    let mut keys: Vec<&String> = Vec::new();
    for object in &objects {
        for key in object.keys() {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }

    let mut merged = Map::new();
    for key in keys {
        if key == "required" {
            let mut required: Vec<&Value> = Vec::new();
            for object in &objects {
                if let Some(Value::Array(names)) = object.get("required") {
                    for name in names {
                        if !required.contains(&name) {
                            required.push(name);
                        }
                    }
                }
            }
            merged.insert("required".to_string(), json!(required));
            continue;
        }

        let present: Vec<Value> = objects
            .iter()
            .filter_map(|object| object.get(key).cloned())
            .collect();
        merged.insert(
            key.clone(),
            merge_schemas(&format!("{}: {}", context, key), &present)?,
        );
    }

    Ok(Value::Object(merged))
}
