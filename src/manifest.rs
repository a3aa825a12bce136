//! Loading and merging of extraction manifests.
//!
//! The upstream extraction step leaves one `*.api.json` fragment per scanned
//! source file. Each fragment carries a slice of the module's API surface:
//! optionally the module info, named response definitions (as annotation
//! strings), capability declarations and routes. [`load_manifest`] merges all
//! fragments of a run into one [`ApiManifest`].

use crate::error::{Error, Result};
use indexmap::IndexMap;
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Module metadata, ends up in the `info` object of the output document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModuleInfo {
    /// Machine identifier, e.g. `notes`.
    pub id: String,
    /// Human readable name, e.g. `Notes`.
    pub name: String,
    #[serde(default)]
    pub summary: Option<String>,
    pub version: String,
    #[serde(default)]
    pub license: Option<String>,
}

/// One capability-producing declaration. Same-named declarations across
/// fragments are merged into a single schema later.
#[derive(Debug, Clone, Deserialize)]
pub struct CapabilityManifest {
    /// Context label of the declaring source, for diagnostics.
    pub name: String,
    /// Public capabilities are exposed without authentication.
    #[serde(default)]
    pub public: bool,
    /// Annotation string describing the capability shape.
    pub schema: String,
}

/// One method parameter of a route.
#[derive(Debug, Clone, Deserialize)]
pub struct ParameterManifest {
    pub name: String,
    /// Annotation type string.
    #[serde(rename = "type")]
    pub annotation: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: Option<Value>,
}

/// One routed controller method.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteManifest {
    /// Dotted controller.method label, e.g. `notes.index`.
    pub name: String,
    pub verb: String,
    pub url: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterManifest>,
    /// Return annotation naming response wrappers.
    pub returns: String,
    /// Path parameter patterns, unanchored.
    #[serde(default)]
    pub requirements: IndexMap<String, String>,
    /// Route-level parameter defaults.
    #[serde(default)]
    pub defaults: IndexMap<String, Value>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Maps status code to a human description of that response.
    #[serde(default)]
    pub response_descriptions: IndexMap<u16, String>,
    #[serde(default)]
    pub deprecated: bool,
    /// Public routes get optional authentication.
    #[serde(default)]
    pub public: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestFragment {
    #[serde(default)]
    module: Option<ModuleInfo>,
    #[serde(default)]
    definitions: IndexMap<String, String>,
    #[serde(default)]
    capabilities: Vec<CapabilityManifest>,
    #[serde(default)]
    routes: Vec<RouteManifest>,
}

/// The merged API surface of one module.
#[derive(Debug, Clone)]
pub struct ApiManifest {
    pub module: ModuleInfo,
    /// Alias name to its annotation string, in discovery order.
    pub definitions: IndexMap<String, String>,
    pub capabilities: Vec<CapabilityManifest>,
    pub routes: Vec<RouteManifest>,
}

/// Loads all fragments and merges them.
///
/// Exactly one fragment must carry the module info (more are accepted when
/// identical). Duplicate definition aliases and duplicate parameter names
/// within a route are rejected here so later stages can assume uniqueness.
pub fn load_manifest(files: &[PathBuf]) -> Result<ApiManifest> {
    let mut module: Option<(ModuleInfo, PathBuf)> = None;
    let mut definitions: IndexMap<String, String> = IndexMap::new();
    let mut capabilities = Vec::new();
    let mut routes = Vec::new();

    for file in files {
        debug!("Loading manifest fragment: {}", file.display());
        let fragment = read_fragment(file)?;

        if let Some(info) = fragment.module {
            match &module {
                Some((existing, first_file)) if *existing != info => {
                    return Err(Error::manifest(
                        file,
                        format!(
                            "Conflicting module info, already declared in {}",
                            first_file.display()
                        ),
                    ));
                }
                Some(_) => {}
                None => module = Some((info, file.clone())),
            }
        }

        for (alias, annotation) in fragment.definitions {
            if definitions.contains_key(&alias) {
                return Err(Error::manifest(
                    file,
                    format!("Duplicate definition '{}'", alias),
                ));
            }
            definitions.insert(alias, annotation);
        }

        capabilities.extend(fragment.capabilities);

        for route in fragment.routes {
            let mut seen: Vec<&str> = Vec::new();
            for parameter in &route.parameters {
                if seen.contains(&parameter.name.as_str()) {
                    return Err(Error::manifest(
                        file,
                        format!(
                            "Duplicate parameter '{}' in route '{}'",
                            parameter.name, route.name
                        ),
                    ));
                }
                seen.push(&parameter.name);
            }
            routes.push(route);
        }
    }

    let Some((module, _)) = module else {
        return Err(Error::Manifest {
            file: PathBuf::new(),
            message: "No fragment declares the module info".to_string(),
        });
    };

    info!(
        "Loaded manifest for module '{}': {} definitions, {} capabilities, {} routes",
        module.id,
        definitions.len(),
        capabilities.len(),
        routes.len()
    );

    Ok(ApiManifest {
        module,
        definitions,
        capabilities,
        routes,
    })
}

fn read_fragment(file: &Path) -> Result<ManifestFragment> {
    let reader = BufReader::new(File::open(file)?);
    serde_json::from_reader(reader)
        .map_err(|err| Error::manifest(file, format!("Invalid JSON: {}", err)))
}
