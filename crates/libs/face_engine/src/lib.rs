//! Face detection and embedding extraction.
//!
//! The pretrained model is a black box behind [`FaceExtractor`]: image bytes
//! in, an ordered list of detections out. The production implementation
//! talks to an inference sidecar over HTTP; tests substitute fixed-vector
//! fixtures so nothing downstream depends on real model inference.

mod error;
mod remote;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::ExtractionError;
pub use remote::RemoteFaceExtractor;

use async_trait::async_trait;
use common_types::DetectedFace;

/// Contract for the embedding extractor: stateless, side-effect free, and
/// deterministic for a given model version and input bytes, so retried
/// pipeline passes reproduce the same detections.
///
/// An image with no faces yields an empty list, not an error.
#[async_trait]
pub trait FaceExtractor: Send + Sync {
    async fn extract_faces(&self, image: &[u8]) -> Result<Vec<DetectedFace>, ExtractionError>;
}
