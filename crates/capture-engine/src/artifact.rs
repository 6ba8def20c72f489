//! Chunk accumulation and artifact assembly.

use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use screenrec_common::error::ScreenrecResult;
use screenrec_platform_core::{ArtifactExporter, ArtifactLink};
use serde::{Deserialize, Serialize};

use crate::format::file_extension;

/// Ordered, append-only sequence of encoded chunks.
#[derive(Debug, Default, Clone)]
pub struct ChunkBuffer {
    chunks: Vec<Vec<u8>>,
    bytes: u64,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk. Empty chunks are dropped; returns whether it was kept.
    pub fn push(&mut self, chunk: Vec<u8>) -> bool {
        if chunk.is_empty() {
            return false;
        }
        self.bytes += chunk.len() as u64;
        self.chunks.push(chunk);
        true
    }

    /// Cumulative size of every kept chunk, including drained ones.
    pub fn total_bytes(&self) -> u64 {
        self.bytes
    }

    /// Chunks currently held.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Concatenate and release the held chunks. The byte counter is kept
    /// so the last session's size stays visible.
    pub fn drain_concat(&mut self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.chunks.iter().map(Vec::len).sum());
        for chunk in self.chunks.drain(..) {
            data.extend_from_slice(&chunk);
        }
        data
    }

    /// Forget everything, including the byte counter.
    pub fn reset(&mut self) {
        self.chunks.clear();
        self.bytes = 0;
    }
}

/// A finished recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    /// Every chunk of the session, concatenated in emission order.
    pub data: Vec<u8>,
    /// Container the recorder produced.
    pub mime_type: String,
    /// Suggested download name, `screen-<timestamp>.<ext>`.
    pub filename: String,
    /// When the session was finalized.
    pub created_at: DateTime<Utc>,
}

/// What a session remembers about its artifact once it has been handed to
/// the exporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSummary {
    /// Suggested download name.
    pub filename: String,
    /// Container the recorder produced.
    pub mime_type: String,
    /// Total payload size.
    pub size_bytes: u64,
    /// When the session was finalized.
    pub created_at: DateTime<Utc>,
}

impl OutputArtifact {
    /// Build the artifact from every held chunk, in emission order.
    pub fn assemble(chunks: &mut ChunkBuffer, mime_type: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            data: chunks.drain_concat(),
            mime_type: mime_type.to_string(),
            filename: artifact_filename(mime_type, created_at),
            created_at,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Metadata without the payload.
    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            filename: self.filename.clone(),
            mime_type: self.mime_type.clone(),
            size_bytes: self.data.len() as u64,
            created_at: self.created_at,
        }
    }
}

/// `screen-<timestamp>.<ext>` where the timestamp is ISO-8601 UTC with
/// millisecond precision and every `:` and `.` replaced by `-`.
pub fn artifact_filename(mime_type: &str, at: DateTime<Utc>) -> String {
    let stamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace(|c: char| c == ':' || c == '.', "-");
    format!("screen-{stamp}.{}", file_extension(mime_type))
}

/// Writes artifacts into a directory and links them as `file://` URLs.
///
/// An existing file is never overwritten; a numeric suffix is added.
#[derive(Debug, Clone)]
pub struct DirectoryExporter {
    dir: PathBuf,
}

impl DirectoryExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn unique_path(&self, filename: &str) -> PathBuf {
        let candidate = self.dir.join(filename);
        if !candidate.exists() {
            return candidate;
        }
        let (stem, ext) = filename.rsplit_once('.').unwrap_or((filename, ""));
        (1..)
            .map(|n| {
                if ext.is_empty() {
                    self.dir.join(format!("{stem}-{n}"))
                } else {
                    self.dir.join(format!("{stem}-{n}.{ext}"))
                }
            })
            .find(|p| !p.exists())
            .unwrap_or(candidate)
    }
}

impl ArtifactExporter for DirectoryExporter {
    fn export(
        &self,
        data: &[u8],
        mime_type: &str,
        filename: &str,
    ) -> ScreenrecResult<ArtifactLink> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.unique_path(filename);
        std::fs::write(&path, data)?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| filename.to_string());
        let absolute = std::fs::canonicalize(&path).unwrap_or(path);

        tracing::info!(path = %absolute.display(), bytes = data.len(), "Recording exported");

        Ok(ArtifactLink {
            url: format!("file://{}", absolute.display()),
            filename,
            mime_type: mime_type.to_string(),
            size_bytes: data.len() as u64,
        })
    }
}
