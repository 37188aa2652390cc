//! Command document loading.
//!
//! Documents are YAML or JSON, chosen by file extension. Anything else is
//! parsed as YAML, which also accepts JSON.

use std::path::Path;

use cmdkit_core::command::CommandDocument;
use cmdkit_types::codec::{from_json_str, from_yaml_str};
use cmdkit_types::error::CommandError;
use cmdkit_types::value::Value;

/// Errors that can occur while loading a command document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid command document {path}: {source}")]
    Invalid {
        path: String,
        #[source]
        source: CommandError,
    },
}

/// Parse document text according to the extension of `path`.
pub fn parse_document(path: &Path, content: &str) -> Result<Value, CommandError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match extension.as_str() {
        "json" => from_json_str(content),
        _ => from_yaml_str(content),
    }
}

/// Read and parse a command document from disk.
pub async fn load_command_document(path: &Path) -> Result<CommandDocument, DocumentError> {
    let shown = path.display().to_string();
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| DocumentError::Io {
            path: shown.clone(),
            source,
        })?;

    let invalid = |source| DocumentError::Invalid {
        path: shown.clone(),
        source,
    };
    let value = parse_document(path, &content).map_err(invalid)?;
    let document = CommandDocument::from_value(&value).map_err(invalid)?;
    tracing::debug!(
        path = %shown,
        operations = document.operations.len(),
        "command document loaded"
    );
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_yaml_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deploy.yaml");
        tokio::fs::write(
            &path,
            "name: deploy\noperations:\n  - operation: Log\n    message: hi\n",
        )
        .await
        .unwrap();

        let document = load_command_document(&path).await.unwrap();
        assert_eq!(document.name.as_deref(), Some("deploy"));
        assert_eq!(document.operations.len(), 1);
    }

    #[tokio::test]
    async fn test_load_json_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("steps.json");
        tokio::fs::write(&path, r#"[{"operation": "Log", "message": "hi"}]"#)
            .await
            .unwrap();

        let document = load_command_document(&path).await.unwrap();
        assert!(document.name.is_none());
        assert_eq!(document.operations.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = load_command_document(&dir.path().join("nope.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::Io { .. }));
    }

    #[tokio::test]
    async fn test_malformed_document_is_invalid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.yml");
        tokio::fs::write(&path, "name: only\n").await.unwrap();

        let err = load_command_document(&path).await.unwrap_err();
        assert!(matches!(err, DocumentError::Invalid { .. }));
        assert!(err.to_string().contains("bad.yml"));
    }
}
