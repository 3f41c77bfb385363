//! Error types for validation, storage and plugin lifecycle operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::component::ComponentKind;

/// Errors raised while validating a staged plugin directory.
///
/// Validation is effect-free, so every variant is recoverable: the caller can
/// fix the offending file and retry.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A metadata file does not conform to its schema.
    #[error("{} schema invalid{}: {message}", kind_label(*kind), cid_label(cid.as_deref()))]
    SchemaInvalid {
        kind: Option<ComponentKind>,
        cid: Option<String>,
        message: String,
    },

    /// MDX or Python content was rejected by an external validator.
    #[error("{} '{cid}' content invalid: {message}", kind.type_name())]
    ContentInvalid {
        kind: ComponentKind,
        cid: String,
        message: String,
    },

    /// A required sibling file is absent.
    #[error("{} '{cid}' is missing {asset}", kind.type_name())]
    MissingAsset {
        kind: ComponentKind,
        cid: String,
        asset: String,
    },

    /// A resolved path escapes the directory it must stay inside.
    #[error("Invalid data path: {path}")]
    PathTraversal { path: PathBuf },

    /// Two metadata files of the same kind declare the same cid.
    #[error("duplicate {} cid '{cid}'", kind.type_name())]
    DuplicateComponent { kind: ComponentKind, cid: String },

    /// A file could not be read.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn kind_label(kind: Option<ComponentKind>) -> &'static str {
    kind.map_or("plugin", ComponentKind::type_name)
}

fn cid_label(cid: Option<&str>) -> String {
    cid.map(|c| format!(" for '{c}'")).unwrap_or_default()
}

impl ValidationError {
    /// Create a schema error for the plugin metadata file.
    pub fn plugin_schema(message: impl Into<String>) -> Self {
        Self::SchemaInvalid {
            kind: None,
            cid: None,
            message: message.into(),
        }
    }

    /// Create a schema error for a component metadata file.
    pub fn component_schema(
        kind: ComponentKind,
        cid: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::SchemaInvalid {
            kind: Some(kind),
            cid,
            message: message.into(),
        }
    }

    /// Create a missing-asset error.
    pub fn missing(kind: ComponentKind, cid: impl Into<String>, asset: impl Into<String>) -> Self {
        Self::MissingAsset {
            kind,
            cid: cid.into(),
            asset: asset.into(),
        }
    }

    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors from the registry store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport or backend failure.
    #[error("store backend error: {message}")]
    Backend { message: String },

    /// A stored record could not be decoded.
    #[error("malformed record at {key}: {message}")]
    Decode { key: String, message: String },

    /// A key does not follow the registry key format.
    #[error("invalid registry key: {key}")]
    InvalidKey { key: String },
}

impl StoreError {
    /// Create a backend error from any displayable failure.
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend {
            message: err.to_string(),
        }
    }

    /// Create a decode error for a key.
    pub fn decode(key: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            key: key.into(),
            message: err.to_string(),
        }
    }
}

/// Errors raised while scanning a validated plugin directory.
///
/// The scanner only runs on directories that already passed validation, so
/// these indicate a changed filesystem or a store failure.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A file could not be read.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON file could not be parsed.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The registry rejected the write batch.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The project template service failed.
    #[error("project template service error: {message}")]
    TemplateService { message: String },
}

impl ScanError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors from plugin lifecycle operations.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The staged plugin failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The gid resolves outside the plugins root.
    #[error("Invalid GID: {gid}")]
    InvalidGid { gid: String },

    /// No plugin or component with this gid.
    #[error("Not found: {gid}")]
    NotFound { gid: String },

    /// Scanning failed after validation.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Registry access failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Moving or removing plugin files failed.
    #[error("filesystem error at {path}: {message}")]
    Filesystem { path: PathBuf, message: String },
}

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`crate::PortalConfig`].
    #[error("cannot parse config: {message}")]
    Parse { message: String },

    /// Config values are inconsistent.
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_names_component() {
        let err = ValidationError::component_schema(
            ComponentKind::Widget,
            Some("bar-chart".to_string()),
            "/name: expected string",
        );
        let msg = err.to_string();
        assert!(msg.contains("ReportWidget"));
        assert!(msg.contains("bar-chart"));
    }

    #[test]
    fn test_plugin_schema_error() {
        let err = ValidationError::plugin_schema("missing required property 'gid'");
        assert_eq!(
            err.to_string(),
            "plugin schema invalid: missing required property 'gid'"
        );
    }

    #[test]
    fn test_path_traversal_message() {
        let err = ValidationError::PathTraversal {
            path: PathBuf::from("../../etc/passwd"),
        };
        assert!(err.to_string().starts_with("Invalid data path"));
    }

    #[test]
    fn test_plugin_error_wraps_validation() {
        let err: PluginError = ValidationError::missing(
            ComponentKind::Algorithm,
            "shap",
            "requirements.txt",
        )
        .into();
        assert!(matches!(err, PluginError::Validation(_)));
        assert!(err.to_string().contains("requirements.txt"));
    }
}
