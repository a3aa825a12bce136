use crate::builder::{build, BuildOptions};
use crate::manifest::load_manifest;
use crate::reporter::Reporter;
use crate::scanner::FileScanner;
use crate::serializer::{write_documents, OutputFormat};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{debug, info};
use std::path::PathBuf;

/// Extract OpenAPI specs from annotation manifests
#[derive(Parser, Debug)]
#[command(name = "openapi-from-annotations")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the project directory containing *.api.json manifests
    #[arg(value_name = "PROJECT_PATH", default_value = ".")]
    pub project_path: PathBuf,

    /// Output file path; per-scope files get the scope as a suffix
    #[arg(short = 'o', long = "out", value_name = "FILE", default_value = "openapi.json")]
    pub output_path: PathBuf,

    /// Output format (json or yaml)
    #[arg(short = 'f', long = "format", value_enum, default_value = "json")]
    pub output_format: CliOutputFormat,

    /// OpenAPI version to declare in the output
    #[arg(long = "openapi-version", default_value = "3.0.3")]
    pub openapi_version: String,

    /// Collect all errors instead of stopping at the first one
    /// (the run still fails at the end if any were reported)
    #[arg(long = "continue-on-error")]
    pub continue_on_error: bool,

    /// Only output the first status code of every operation
    #[arg(long = "first-status-code")]
    pub first_status_code: bool,

    /// Only output the first content type of every response
    #[arg(long = "first-content-type")]
    pub first_content_type: bool,

    /// Do not emit tags
    #[arg(long = "no-tags")]
    pub no_tags: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliOutputFormat {
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(format: CliOutputFormat) -> Self {
        match format {
            CliOutputFormat::Json => OutputFormat::Json,
            CliOutputFormat::Yaml => OutputFormat::Yaml,
        }
    }
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.project_path.exists() {
        anyhow::bail!(
            "Project path does not exist: {}",
            args.project_path.display()
        );
    }
    if !args.project_path.is_dir() {
        anyhow::bail!(
            "Project path is not a directory: {}",
            args.project_path.display()
        );
    }

    info!("Project path: {}", args.project_path.display());
    info!("Output file: {}", args.output_path.display());
    info!("Output format: {:?}", args.output_format);

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting OpenAPI spec extraction...");

    info!("Scanning project directory...");
    let scanner = FileScanner::new(args.project_path.clone());
    let scan_result = scanner.scan()?;

    info!("Found {} manifest fragments", scan_result.manifest_files.len());
    if scan_result.manifest_files.is_empty() {
        anyhow::bail!("No *.api.json manifests found in the project directory");
    }

    info!("Loading manifests...");
    let manifest = load_manifest(&scan_result.manifest_files)?;

    let reporter = Reporter::new(!args.continue_on_error);
    let options = BuildOptions {
        openapi_version: args.openapi_version.clone(),
        first_status_code: args.first_status_code,
        first_content_type: args.first_content_type,
        use_tags: !args.no_tags,
    };

    info!("Building OpenAPI documents...");
    let documents = build(&manifest, &options, &reporter)?;

    info!("Writing {} scope documents...", documents.len());
    let written = write_documents(
        &documents,
        &args.output_path,
        args.output_format.into(),
    )?;
    for path in &written {
        info!("  - {}", path.display());
    }

    if reporter.has_errors() {
        anyhow::bail!(
            "Encountered {} errors that need to be fixed!",
            reporter.error_count()
        );
    }
    if reporter.warning_count() > 0 {
        info!("Finished with {} warnings", reporter.warning_count());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::parse_from(["openapi-from-annotations"]);

        assert_eq!(args.project_path, PathBuf::from("."));
        assert_eq!(args.output_path, PathBuf::from("openapi.json"));
        assert!(matches!(args.output_format, CliOutputFormat::Json));
        assert!(!args.continue_on_error);
        assert!(!args.first_status_code);
        assert!(!args.no_tags);
    }

    #[test]
    fn test_flags() {
        let args = CliArgs::parse_from([
            "openapi-from-annotations",
            "project",
            "--out",
            "build/openapi.json",
            "--format",
            "yaml",
            "--continue-on-error",
            "--first-status-code",
            "--first-content-type",
            "--openapi-version",
            "3.1.0",
        ]);

        assert_eq!(args.project_path, PathBuf::from("project"));
        assert_eq!(args.output_path, PathBuf::from("build/openapi.json"));
        assert!(matches!(args.output_format, CliOutputFormat::Yaml));
        assert!(args.continue_on_error);
        assert!(args.first_status_code);
        assert!(args.first_content_type);
        assert_eq!(args.openapi_version, "3.1.0");
    }

    #[test]
    fn test_nonexistent_project_path_is_rejected() {
        let args = CliArgs::parse_from(["openapi-from-annotations", "/nonexistent/path"]);

        assert!(parse_args_from_parsed(args).is_err());
    }
}
