use openapi_from_annotations::{
    builder::{build, BuildOptions},
    manifest::load_manifest,
    reporter::Reporter,
    scanner::FileScanner,
    serializer::{write_documents, OutputFormat},
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;

/// Helper function to create a temporary project with manifest fragments
fn create_test_project(files: Vec<(&str, &str)>) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    for (path, content) in files {
        let file_path = temp_dir.path().join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(&file_path, content).expect("Failed to write test file");
    }

    temp_dir
}

fn notes_project() -> TempDir {
    create_test_project(vec![
        ("module.api.json", include_str!("fixtures/module.api.json")),
        (
            "lib/notes_controller.api.json",
            include_str!("fixtures/notes_controller.api.json"),
        ),
        (
            "lib/settings_controller.api.json",
            include_str!("fixtures/settings_controller.api.json"),
        ),
        (
            "lib/capabilities.api.json",
            include_str!("fixtures/capabilities.api.json"),
        ),
    ])
}

#[test]
fn test_end_to_end_generation() {
    let project = notes_project();

    let scanner = FileScanner::new(project.path().to_path_buf());
    let scan_result = scanner.scan().expect("Failed to scan directory");
    assert_eq!(scan_result.manifest_files.len(), 4);

    let manifest = load_manifest(&scan_result.manifest_files).expect("Failed to load manifests");
    assert_eq!(manifest.module.id, "notes");
    assert_eq!(manifest.definitions.len(), 2);
    assert_eq!(manifest.routes.len(), 5);

    let reporter = Reporter::strict();
    let documents =
        build(&manifest, &BuildOptions::default(), &reporter).expect("Failed to build documents");

    // default, administration and the combined full scope
    let scopes: Vec<&str> = documents.iter().map(|d| d.scope.as_str()).collect();
    assert_eq!(scopes, vec!["default", "administration", "full"]);

    let out_dir = TempDir::new().unwrap();
    let out = out_dir.path().join("openapi.json");
    let written =
        write_documents(&documents, &out, OutputFormat::Json).expect("Failed to write documents");

    assert_eq!(
        written,
        vec![
            out_dir.path().join("openapi.json"),
            out_dir.path().join("openapi-administration.json"),
            out_dir.path().join("openapi-full.json"),
        ]
    );

    let default: Value =
        serde_json::from_str(&std::fs::read_to_string(&written[0]).unwrap()).unwrap();

    assert_eq!(default["openapi"], json!("3.0.3"));
    assert_eq!(default["info"]["title"], json!("notes"));
    assert_eq!(default["info"]["license"], json!({"name": "agpl"}));

    // The default scope only carries the schemas its own routes reach,
    // plus the capabilities.
    let schemas = default["components"]["schemas"].as_object().unwrap();
    assert_eq!(
        schemas.keys().collect::<Vec<_>>(),
        vec!["Capabilities", "Note"]
    );

    let index = &default["paths"]["/notes"]["get"];
    assert_eq!(index["operationId"], json!("notes-index"));
    assert_eq!(
        index["responses"]["200"]["content"]["application/json"]["schema"],
        json!({"type": "array", "items": {"$ref": "#/components/schemas/Note"}})
    );
    assert_eq!(
        index["responses"]["200"]["headers"]["X-Notes-API-Versions"],
        json!({"schema": {"type": "string"}})
    );

    // Nullable query parameter is optional, defaulted one carries its default
    let parameters = index["parameters"].as_array().unwrap();
    assert_eq!(
        parameters[0],
        json!({
            "name": "category",
            "in": "query",
            "description": "Filter by category",
            "schema": {"type": "string", "nullable": true},
        })
    );
    assert_eq!(
        parameters[1],
        json!({
            "name": "pruneBefore",
            "in": "query",
            "description": "Remove notes modified before this timestamp",
            "schema": {"type": "integer", "format": "int64", "default": 0},
        })
    );

    // POST routes move their parameters into the request body
    let create = &default["paths"]["/notes"]["post"];
    assert_eq!(
        create["requestBody"]["content"]["application/json"]["schema"]["required"],
        json!(["title"])
    );
    assert_eq!(
        create["responses"]["403"]["content"]["application/json"]["schema"],
        json!({"type": "object"})
    );

    let administration: Value =
        serde_json::from_str(&std::fs::read_to_string(&written[1]).unwrap()).unwrap();
    assert_eq!(administration["info"]["title"], json!("notes-administration"));
    let schemas = administration["components"]["schemas"].as_object().unwrap();
    assert_eq!(
        schemas.keys().collect::<Vec<_>>(),
        vec!["Capabilities", "Settings"]
    );
    assert_eq!(
        schemas["Settings"]["properties"]["fileSuffix"],
        json!({"type": "string", "enum": [".md", ".txt"]})
    );

    let full: Value =
        serde_json::from_str(&std::fs::read_to_string(&written[2]).unwrap()).unwrap();
    assert!(full["paths"].get("/notes").is_some());
    assert!(full["paths"].get("/settings").is_some());
    let schemas = full["components"]["schemas"].as_object().unwrap();
    assert_eq!(
        schemas.keys().collect::<Vec<_>>(),
        vec!["Capabilities", "Note", "Settings"]
    );
}

#[test]
fn test_capabilities_schema_is_always_included() {
    let project = notes_project();

    let scanner = FileScanner::new(project.path().to_path_buf());
    let scan_result = scanner.scan().unwrap();
    let manifest = load_manifest(&scan_result.manifest_files).unwrap();

    let reporter = Reporter::strict();
    let documents = build(&manifest, &BuildOptions::default(), &reporter).unwrap();

    for document in &documents {
        assert_eq!(
            document.document["components"]["schemas"]["Capabilities"],
            json!({
                "type": "object",
                "required": ["notes"],
                "properties": {"notes": {
                    "type": "object",
                    "required": ["api_version", "version"],
                    "properties": {
                        "api_version": {"type": "array", "items": {"type": "string"}},
                        "version": {"type": "string"},
                    },
                }},
            }),
            "scope {}",
            document.scope
        );
    }
}

#[test]
fn test_yaml_output() {
    let project = notes_project();

    let scanner = FileScanner::new(project.path().to_path_buf());
    let scan_result = scanner.scan().unwrap();
    let manifest = load_manifest(&scan_result.manifest_files).unwrap();

    let reporter = Reporter::strict();
    let documents = build(&manifest, &BuildOptions::default(), &reporter).unwrap();

    let out_dir = TempDir::new().unwrap();
    let out = out_dir.path().join("openapi.yaml");
    let written = write_documents(&documents, &out, OutputFormat::Yaml).unwrap();

    let content = std::fs::read_to_string(&written[0]).unwrap();
    assert!(content.starts_with("openapi: 3.0.3\n"));
    let parsed: Value = serde_yaml::from_str(&content).unwrap();
    assert_eq!(parsed["info"]["title"], json!("notes"));
}

#[test]
fn test_broken_annotation_fails_in_strict_mode() {
    let project = create_test_project(vec![
        ("module.api.json", include_str!("fixtures/module.api.json")),
        (
            "broken.api.json",
            r#"{
                "routes": [{
                    "name": "broken.route",
                    "verb": "GET",
                    "url": "/broken",
                    "parameters": [{"name": "bad", "type": "array"}],
                    "returns": "DataResponse<STATUS_OK, string, array{}>",
                    "response_descriptions": {"200": "Never emitted"}
                }]
            }"#,
        ),
    ]);

    let scanner = FileScanner::new(project.path().to_path_buf());
    let scan_result = scanner.scan().unwrap();
    let manifest = load_manifest(&scan_result.manifest_files).unwrap();

    let reporter = Reporter::strict();
    assert!(build(&manifest, &BuildOptions::default(), &reporter).is_err());
}
