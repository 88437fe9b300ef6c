//! Artifact persistence
//!
//! Objects are written as bincode inside an [`ArtifactEnvelope`] carrying magic
//! bytes, a format version, the kind tag of the stored type and an FNV-1a
//! checksum of the payload. Every failure surfaces as
//! [`ScorecastError::SerializationError`].

use crate::error::{Result, ScorecastError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// A type that can be stored in the artifact store
pub trait Artifact: Serialize + DeserializeOwned {
    /// Tag checked on load so that one artifact kind is never decoded as another
    const KIND: &'static str;
}

/// On-disk wrapper around a serialized artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEnvelope {
    pub magic: [u8; 4],
    pub format_version: u32,
    pub kind: String,
    pub payload: Vec<u8>,
    pub checksum: u64,
}

impl ArtifactEnvelope {
    const MAGIC: [u8; 4] = [b'S', b'C', b'A', b'F'];
    const VERSION: u32 = 1;

    fn seal<T: Artifact>(object: &T) -> Result<Self> {
        let payload = bincode::serialize(object).map_err(|e| {
            ScorecastError::SerializationError(format!("Failed to encode {}: {}", T::KIND, e))
        })?;
        Ok(Self {
            magic: Self::MAGIC,
            format_version: Self::VERSION,
            kind: T::KIND.to_string(),
            checksum: fnv1a(&payload),
            payload,
        })
    }

    fn open<T: Artifact>(self) -> Result<T> {
        if self.magic != Self::MAGIC {
            return Err(ScorecastError::SerializationError(
                "not a scorecast artifact (bad magic bytes)".to_string(),
            ));
        }
        if self.format_version != Self::VERSION {
            return Err(ScorecastError::SerializationError(format!(
                "unsupported artifact format version {} (expected {})",
                self.format_version,
                Self::VERSION
            )));
        }
        if self.kind != T::KIND {
            return Err(ScorecastError::SerializationError(format!(
                "artifact holds '{}', expected '{}'",
                self.kind,
                T::KIND
            )));
        }
        if fnv1a(&self.payload) != self.checksum {
            return Err(ScorecastError::SerializationError(
                "artifact checksum mismatch".to_string(),
            ));
        }
        bincode::deserialize(&self.payload).map_err(|e| {
            ScorecastError::SerializationError(format!("Failed to decode {}: {}", T::KIND, e))
        })
    }
}

fn fnv1a(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 14695981039346656037;
    const FNV_PRIME: u64 = 1099511628211;

    data.iter().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ *byte as u64).wrapping_mul(FNV_PRIME)
    })
}

fn io_failure(action: &str, path: &Path, err: std::io::Error) -> ScorecastError {
    ScorecastError::SerializationError(format!("{} {}: {}", action, path.display(), err))
}

/// Serialize `object` to `path`, creating parent directories as needed
pub fn save<T: Artifact>(path: impl AsRef<Path>, object: &T) -> Result<()> {
    let path = path.as_ref();
    let envelope = ArtifactEnvelope::seal(object)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| io_failure("Failed to create directory for", path, e))?;
    }

    let file = File::create(path).map_err(|e| io_failure("Failed to create", path, e))?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, &envelope).map_err(|e| {
        ScorecastError::SerializationError(format!("Failed to write {}: {}", path.display(), e))
    })?;
    writer
        .flush()
        .map_err(|e| io_failure("Failed to flush", path, e))?;

    tracing::debug!(path = %path.display(), kind = T::KIND, "Artifact saved");
    Ok(())
}

/// Load and verify an artifact previously written by [`save`]
pub fn load<T: Artifact>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| io_failure("Failed to open", path, e))?;
    let mut bytes = Vec::new();
    BufReader::new(file)
        .read_to_end(&mut bytes)
        .map_err(|e| io_failure("Failed to read", path, e))?;
    // decoding from a slice bounds every length prefix by the file size
    let envelope: ArtifactEnvelope = bincode::deserialize(&bytes).map_err(|e| {
        ScorecastError::SerializationError(format!("Failed to read {}: {}", path.display(), e))
    })?;
    envelope.open()
}
