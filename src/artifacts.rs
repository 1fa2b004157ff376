//! Loads training artifacts from disk with SHA-256 integrity checks.
//!
//! Every artifact is hashed as it is read. The digest is reported through `/health`
//! and, when an expected digest is configured, compared before the artifact is parsed
//! so a swapped or truncated file never reaches the scoring path.
use anyhow::Context;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::path::Path;

/// A parsed artifact together with the digest of the bytes it came from.
#[derive(Debug, Clone)]
pub struct LoadedArtifact<T> {
    pub value: T,
    /// SHA-256 checksum of the file contents (hex encoded).
    pub checksum: String,
}

/// Computes the SHA-256 checksum of `data`, hex encoded.
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compares a computed digest against an expected one (case-insensitive).
pub fn verify_checksum(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual)
}

/// Parses an artifact already read into memory.
pub fn parse_artifact<T: DeserializeOwned>(
    bytes: &[u8],
    expected_checksum: Option<&str>,
) -> anyhow::Result<LoadedArtifact<T>> {
    let checksum = compute_checksum(bytes);

    if let Some(expected) = expected_checksum {
        if !verify_checksum(expected, &checksum) {
            tracing::warn!(
                "Artifact checksum mismatch. Expected: {}, Actual: {}, Data length: {}",
                expected,
                checksum,
                bytes.len()
            );
            anyhow::bail!(
                "artifact checksum mismatch: expected {}, got {}",
                expected,
                checksum
            );
        }
    }

    let value = serde_json::from_slice(bytes).context("artifact is not valid JSON")?;
    Ok(LoadedArtifact { value, checksum })
}

/// Reads and parses the JSON artifact at `path`.
pub fn load_artifact<T: DeserializeOwned>(
    path: &Path,
    expected_checksum: Option<&str>,
) -> anyhow::Result<LoadedArtifact<T>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let artifact = parse_artifact(&bytes, expected_checksum)
        .with_context(|| format!("failed to load {}", path.display()))?;

    tracing::debug!(
        "Loaded artifact {} ({} bytes, sha256 {})",
        path.display(),
        bytes.len(),
        artifact.checksum
    );
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_checksum_consistency() {
        let a = compute_checksum(b"{\"feature_cols\": []}");
        let b = compute_checksum(b"{\"feature_cols\": []}");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            compute_checksum(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_matching_checksum_accepted() {
        let data = br#"{"medians": {}}"#;
        let sum = compute_checksum(data).to_uppercase();
        let loaded: LoadedArtifact<Value> = parse_artifact(data, Some(&sum)).unwrap();
        assert!(loaded.value.get("medians").is_some());
    }

    #[test]
    fn test_tampered_artifact_rejected() {
        let original = br#"{"threshold": 0.07}"#;
        let sum = compute_checksum(original);

        let tampered = br#"{"threshold": 0.70}"#;
        let result: anyhow::Result<LoadedArtifact<Value>> = parse_artifact(tampered, Some(&sum));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_json_rejected() {
        let result: anyhow::Result<LoadedArtifact<Value>> = parse_artifact(b"not json", None);
        assert!(result.is_err());
    }
}
