//! Versioned on-disk artifact format.
//!
//! An artifact file is a bincode-encoded [`ArtifactHeader`] immediately
//! followed by the bincode-encoded payload. The header is decoded and checked
//! on its own first, so a payload layout change surfaces as a version
//! mismatch rather than as an undecodable blob.

use crate::error::ArtifactError;
use crate::models::classifier::{Classifier, ClassifierArtifact};
use crate::models::scaler::StandardScaler;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ARTIFACT_MAGIC: [u8; 4] = *b"HRPA";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Classifier,
    Scaler,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Classifier => f.write_str("classifier"),
            ArtifactKind::Scaler => f.write_str("scaler"),
        }
    }
}

/// Payload types that can be stored in an artifact file
pub trait ArtifactPayload: Serialize + DeserializeOwned {
    const KIND: ArtifactKind;

    fn feature_count(&self) -> usize;

    /// Structural check run on every decoded payload
    fn validate(&self) -> Result<(), String>;
}

impl ArtifactPayload for ClassifierArtifact {
    const KIND: ArtifactKind = ArtifactKind::Classifier;

    fn feature_count(&self) -> usize {
        self.n_features()
    }

    fn validate(&self) -> Result<(), String> {
        ClassifierArtifact::validate(self)
    }
}

impl ArtifactPayload for StandardScaler {
    const KIND: ArtifactKind = ArtifactKind::Scaler;

    fn feature_count(&self) -> usize {
        self.n_features()
    }

    fn validate(&self) -> Result<(), String> {
        StandardScaler::validate(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactHeader {
    pub magic: [u8; 4],
    pub format_version: u32,
    pub kind: ArtifactKind,
    /// Shared by the classifier and scaler produced by one training run
    pub model_id: String,
    pub trained_at: DateTime<Utc>,
    pub feature_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Artifact<T> {
    pub header: ArtifactHeader,
    pub payload: T,
}

impl<T: ArtifactPayload> Artifact<T> {
    pub fn new(payload: T, model_id: &str, trained_at: DateTime<Utc>) -> Self {
        Self {
            header: ArtifactHeader {
                magic: ARTIFACT_MAGIC,
                format_version: FORMAT_VERSION,
                kind: T::KIND,
                model_id: model_id.to_string(),
                trained_at,
                feature_count: payload.feature_count(),
            },
            payload,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ArtifactError> {
        let mut bytes = bincode::serialize(&self.header)
            .map_err(|e| ArtifactError::Serialize(e.to_string()))?;
        let payload = bincode::serialize(&self.payload)
            .map_err(|e| ArtifactError::Serialize(e.to_string()))?;
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Decode and validate an artifact expected to hold `expected_features` features
    pub fn from_bytes(
        bytes: &[u8],
        path: &Path,
        expected_features: usize,
    ) -> Result<Self, ArtifactError> {
        let corrupt = |reason: String| ArtifactError::Corrupt {
            path: path.to_path_buf(),
            reason,
        };

        let header: ArtifactHeader =
            bincode::deserialize(bytes).map_err(|e| corrupt(format!("unreadable header: {e}")))?;

        if header.magic != ARTIFACT_MAGIC {
            return Err(corrupt("not a model artifact".to_string()));
        }
        if header.format_version != FORMAT_VERSION {
            return Err(ArtifactError::VersionMismatch {
                path: path.to_path_buf(),
                found: header.format_version,
                expected: FORMAT_VERSION,
            });
        }
        if header.kind != T::KIND {
            return Err(ArtifactError::KindMismatch {
                path: path.to_path_buf(),
                found: header.kind.to_string(),
                expected: T::KIND.to_string(),
            });
        }
        if header.feature_count != expected_features {
            return Err(ArtifactError::FeatureCountMismatch {
                path: path.to_path_buf(),
                found: header.feature_count,
                expected: expected_features,
            });
        }

        let offset = bincode::serialized_size(&header)
            .map_err(|e| corrupt(e.to_string()))? as usize;
        let payload: T = bincode::deserialize(&bytes[offset.min(bytes.len())..])
            .map_err(|e| corrupt(format!("unreadable payload: {e}")))?;

        if payload.feature_count() != header.feature_count {
            return Err(corrupt(format!(
                "payload has {} features but header declares {}",
                payload.feature_count(),
                header.feature_count
            )));
        }
        ArtifactPayload::validate(&payload).map_err(corrupt)?;

        Ok(Self { header, payload })
    }

    /// Read and validate an artifact file
    pub fn load(path: impl AsRef<Path>, expected_features: usize) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ArtifactError::Missing(path.to_path_buf())
            } else {
                ArtifactError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Self::from_bytes(&bytes, path, expected_features)
    }

    /// Write the artifact next to its destination and rename it into place,
    /// so readers never observe a partially written file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ArtifactError> {
        let path = path.as_ref();
        let io_err = |source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let bytes = self.to_bytes()?;
        let tmp = temp_path(path);
        fs::write(&tmp, &bytes).map_err(io_err)?;
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(io_err(e));
        }

        debug!(
            path = %path.display(),
            kind = %self.header.kind,
            bytes = bytes.len(),
            "Artifact written"
        );
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".tmp-{}", std::process::id()));
    path.with_file_name(name)
}
