//! Fixed-vector extractor fixtures for tests.

use crate::{ExtractionError, FaceExtractor};
use async_trait::async_trait;
use common_types::{BoundingBox, DetectedFace};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Extractor that answers from a scripted table of image bytes.
///
/// Unknown bytes behave like a corrupt image, which is exactly what the
/// failure-path tests need.
#[derive(Default)]
pub struct ScriptedExtractor {
    by_image: HashMap<Vec<u8>, Vec<DetectedFace>>,
    calls: AtomicUsize,
}

impl ScriptedExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_image(mut self, image: &[u8], faces: Vec<DetectedFace>) -> Self {
        self.by_image.insert(image.to_vec(), faces);
        self
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FaceExtractor for ScriptedExtractor {
    async fn extract_faces(&self, image: &[u8]) -> Result<Vec<DetectedFace>, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.by_image
            .get(image)
            .cloned()
            .ok_or(ExtractionError::UndecodableImage)
    }
}

/// Extractor that fails transiently a fixed number of times before
/// delegating, for retry-policy tests.
pub struct FlakyExtractor<E> {
    inner: E,
    failures_left: AtomicUsize,
}

impl<E: FaceExtractor> FlakyExtractor<E> {
    pub fn new(inner: E, failures: usize) -> Self {
        Self {
            inner,
            failures_left: AtomicUsize::new(failures),
        }
    }
}

#[async_trait]
impl<E: FaceExtractor> FaceExtractor for FlakyExtractor<E> {
    async fn extract_faces(&self, image: &[u8]) -> Result<Vec<DetectedFace>, ExtractionError> {
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ExtractionError::Backend("inference unavailable".into()));
        }
        self.inner.extract_faces(image).await
    }
}

/// A face at a fixed position with the given embedding, for fixtures.
#[must_use]
pub fn face_with_embedding(embedding: Vec<f32>) -> DetectedFace {
    DetectedFace {
        bounding_box: BoundingBox {
            x: 10,
            y: 10,
            width: 64,
            height: 64,
        },
        confidence: 0.99,
        embedding,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_extractor_is_deterministic() {
        let image = b"jpeg-bytes";
        let extractor = ScriptedExtractor::new()
            .with_image(image, vec![face_with_embedding(vec![1.0, 0.0, 0.0])]);

        let first = extractor.extract_faces(image).await.expect("faces");
        let second = extractor.extract_faces(image).await.expect("faces");
        assert_eq!(first, second);
        assert_eq!(extractor.calls(), 2);
    }

    #[tokio::test]
    async fn unknown_bytes_are_undecodable() {
        let extractor = ScriptedExtractor::new();
        let err = extractor.extract_faces(b"garbage").await.unwrap_err();
        assert!(matches!(err, ExtractionError::UndecodableImage));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn flaky_extractor_recovers_after_failures() {
        let image = b"jpeg-bytes";
        let inner = ScriptedExtractor::new().with_image(image, vec![]);
        let flaky = FlakyExtractor::new(inner, 2);

        assert!(flaky.extract_faces(image).await.unwrap_err().is_transient());
        assert!(flaky.extract_faces(image).await.unwrap_err().is_transient());
        assert!(flaky.extract_faces(image).await.is_ok());
    }
}
