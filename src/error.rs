use std::path::PathBuf;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the application
#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),
    /// Syntax error in an annotation type string
    Grammar { context: String, message: String },
    /// Fatal resolution failure (unknown identifier, unsupported construct, ...)
    Resolution { context: String, message: String },
    /// A reported diagnostic promoted to an error because strict mode is enabled
    Diagnostic { context: String, message: String },
    /// Malformed or inconsistent extraction manifest
    Manifest { file: PathBuf, message: String },
    /// Structurally incompatible schemas passed to the merger
    Merge(String),
    SerializationError(String),
}

impl Error {
    /// Fatal resolution error carrying the context breadcrumb
    pub fn resolution(context: &str, message: impl Into<String>) -> Self {
        Error::Resolution {
            context: context.to_string(),
            message: message.into(),
        }
    }

    pub fn grammar(context: &str, message: impl Into<String>) -> Self {
        Error::Grammar {
            context: context.to_string(),
            message: message.into(),
        }
    }

    pub fn manifest(file: &std::path::Path, message: impl Into<String>) -> Self {
        Error::Manifest {
            file: file.to_path_buf(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "IO error: {}", e),
            Error::Grammar { context, message } => {
                write!(f, "Syntax error: {}: {}", context, message)
            }
            Error::Resolution { context, message } => write!(f, "{}: {}", context, message),
            Error::Diagnostic { context, message } => write!(f, "{}: {}", context, message),
            Error::Manifest { file, message } => {
                write!(f, "Invalid manifest {}: {}", file.display(), message)
            }
            Error::Merge(msg) => write!(f, "Merge error: {}", msg),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::SerializationError(format!("YAML error: {}", err))
    }
}
