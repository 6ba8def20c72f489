//! In-memory artifact exporter.

use std::sync::{Mutex, MutexGuard, PoisonError};

use screenrec_common::error::{ScreenrecError, ScreenrecResult};
use screenrec_platform_core::{ArtifactExporter, ArtifactLink};

/// An exported artifact and its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub link: ArtifactLink,
    pub data: Vec<u8>,
}

/// Keeps every artifact in memory behind a `blob:` URL.
#[derive(Debug, Default)]
pub struct MemoryExporter {
    artifacts: Mutex<Vec<StoredArtifact>>,
    fail: bool,
}

impl MemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// An exporter that refuses every artifact.
    pub fn failing() -> Self {
        Self {
            artifacts: Mutex::default(),
            fail: true,
        }
    }

    fn stored(&self) -> MutexGuard<'_, Vec<StoredArtifact>> {
        self.artifacts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Everything exported so far, oldest first.
    pub fn artifacts(&self) -> Vec<StoredArtifact> {
        self.stored().clone()
    }

    pub fn len(&self) -> usize {
        self.stored().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stored().is_empty()
    }
}

impl ArtifactExporter for MemoryExporter {
    fn export(
        &self,
        data: &[u8],
        mime_type: &str,
        filename: &str,
    ) -> ScreenrecResult<ArtifactLink> {
        if self.fail {
            return Err(ScreenrecError::capture("Storage is full"));
        }
        let mut stored = self.stored();
        let link = ArtifactLink {
            url: format!("blob:screenrec/{}", stored.len() + 1),
            filename: filename.to_string(),
            mime_type: mime_type.to_string(),
            size_bytes: data.len() as u64,
        };
        stored.push(StoredArtifact {
            link: link.clone(),
            data: data.to_vec(),
        });
        Ok(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_are_unique() {
        let exporter = MemoryExporter::new();
        let a = exporter.export(b"a", "video/webm", "a.webm").unwrap();
        let b = exporter.export(b"bb", "video/webm", "b.webm").unwrap();
        assert_ne!(a.url, b.url);
        assert_eq!(b.size_bytes, 2);
        assert_eq!(exporter.artifacts()[1].data, b"bb");
    }

    #[test]
    fn test_failing_exporter_keeps_nothing() {
        let exporter = MemoryExporter::failing();
        assert!(matches!(
            exporter.export(b"a", "video/webm", "a.webm"),
            Err(ScreenrecError::Capture { .. })
        ));
        assert!(exporter.is_empty());
    }
}
