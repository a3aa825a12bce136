//! OpenAPI spec extraction from annotation manifests.
//!
//! This library turns the type annotations of a web module into per-scope
//! OpenAPI documents. The annotations arrive as `*.api.json` extraction
//! manifests: named response definitions, capability declarations and routes
//! whose parameters and return values carry a restricted doc-comment type
//! grammar (`list<string>`, `array{id: int, title?: string}`,
//! `DataResponse<STATUS_OK, NotesNote, array{}>`, ...).
//!
//! # Architecture
//!
//! The pipeline, in order:
//!
//! 1. [`scanner`] - Recursively scans a project directory for manifest
//!    fragments
//! 2. [`manifest`] - Loads and merges the fragments into one module manifest
//! 3. [`grammar`] - Parses annotation strings into [`ast::TypeNode`] trees
//! 4. [`resolver`] - Resolves type nodes into normalized [`schema::SchemaNode`]
//!    trees against the alias table
//! 5. [`response`] - Expands response wrapper annotations into concrete
//!    (status code, content type, body, headers) descriptors
//! 6. [`merge`] - Deep-merges schemas that must agree structurally
//! 7. [`builder`] - Assembles operations and partitions them into per-scope
//!    documents
//! 8. [`serializer`] - Writes the documents as JSON or YAML
//!
//! Diagnostics flow through an explicit [`reporter::Reporter`] so resolution
//! stays free of global state.
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_annotations::{
//!     builder::{build, BuildOptions},
//!     manifest::load_manifest,
//!     reporter::Reporter,
//!     scanner::FileScanner,
//!     serializer::{write_documents, OutputFormat},
//! };
//! use std::path::{Path, PathBuf};
//!
//! let scanner = FileScanner::new(PathBuf::from("./my-module"));
//! let scan_result = scanner.scan().unwrap();
//!
//! let manifest = load_manifest(&scan_result.manifest_files).unwrap();
//!
//! let reporter = Reporter::lenient();
//! let documents = build(&manifest, &BuildOptions::default(), &reporter).unwrap();
//!
//! write_documents(&documents, Path::new("openapi.json"), OutputFormat::Json).unwrap();
//! ```

pub mod ast;
pub mod builder;
pub mod cli;
pub mod error;
pub mod grammar;
pub mod manifest;
pub mod merge;
pub mod reporter;
pub mod resolver;
pub mod response;
pub mod scanner;
pub mod schema;
pub mod serializer;
pub mod status;
