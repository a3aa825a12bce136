//! Serialization module for writing the per-scope documents to disk.
//!
//! Each scope document is written next to the requested output path, with the
//! scope suffix inserted before the file extension (`openapi.json`,
//! `openapi-administration.json`, ...). Stale `openapi*.json` siblings from a
//! previous run are deleted first so removed scopes do not linger.

use crate::builder::ScopeDocument;
use anyhow::{Context, Result};
use log::{debug, info};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Output encodings supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
}

/// Serializes a document in the requested format.
///
/// JSON is pretty printed; both formats end with a trailing newline.
pub fn serialize(document: &Value, format: OutputFormat) -> Result<String> {
    debug!("Serializing OpenAPI document to {:?}", format);
    let mut content = match format {
        OutputFormat::Json => serde_json::to_string_pretty(document)
            .context("Failed to serialize OpenAPI document to JSON")?,
        OutputFormat::Yaml => serde_yaml::to_string(document)
            .context("Failed to serialize OpenAPI document to YAML")?,
    };
    if !content.ends_with('\n') {
        content.push('\n');
    }
    Ok(content)
}

/// Output path of one scope: the base path with the scope suffix inserted
/// before the extension.
pub fn scope_path(out: &Path, suffix: &str) -> PathBuf {
    if suffix.is_empty() {
        return out.to_path_buf();
    }
    match out.extension() {
        Some(extension) => {
            let stem = out.file_stem().unwrap_or_default().to_string_lossy();
            out.with_file_name(format!(
                "{}{}.{}",
                stem,
                suffix,
                extension.to_string_lossy()
            ))
        }
        None => {
            let name = out.file_name().unwrap_or_default().to_string_lossy();
            out.with_file_name(format!("{}{}", name, suffix))
        }
    }
}

/// Deletes leftover `openapi*.json` files next to the output path.
///
/// Scopes can disappear between runs; without this the old per-scope files
/// would keep serving outdated specs.
pub fn remove_stale_outputs(out: &Path) -> Result<()> {
    let dir = match out.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !dir.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to list output directory: {}", dir.display()))?
    {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("openapi") && name.ends_with(".json") && entry.path().is_file() {
            debug!("Removing stale output: {}", entry.path().display());
            fs::remove_file(entry.path())
                .with_context(|| format!("Failed to remove {}", entry.path().display()))?;
        }
    }
    Ok(())
}

/// Writes string content to a file, creating parent directories as needed.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!(
        "Successfully wrote {} bytes to {}",
        content.len(),
        path.display()
    );
    Ok(())
}

/// Writes all scope documents, returning the paths written.
pub fn write_documents(
    documents: &[ScopeDocument],
    out: &Path,
    format: OutputFormat,
) -> Result<Vec<PathBuf>> {
    remove_stale_outputs(out)?;

    let mut written = Vec::new();
    for document in documents {
        let path = scope_path(out, &document.suffix);
        let content = serialize(&document.document, format)?;
        write_to_file(&content, &path)?;
        info!("Wrote scope {} to {}", document.scope, path.display());
        written.push(path);
    }
    Ok(written)
}
