use crate::{ExtractionError, FaceExtractor};
use async_trait::async_trait;
use common_types::DetectedFace;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Face extractor backed by an inference sidecar.
///
/// The sidecar owns the actual model; this client posts raw image bytes to
/// its `/detect` endpoint and gets back bounding boxes, confidences and
/// embeddings. Keeping inference out of process means the worker binary
/// never links an ML runtime and the model can be swapped independently.
pub struct RemoteFaceExtractor {
    client: reqwest::Client,
    detect_url: Url,
    embedding_dim: usize,
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    faces: Vec<DetectedFace>,
}

impl RemoteFaceExtractor {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        embedding_dim: usize,
    ) -> Result<Self, ExtractionError> {
        let detect_url = Url::parse(base_url)
            .and_then(|url| url.join("detect"))
            .map_err(|e| ExtractionError::Backend(format!("invalid inference url: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractionError::Backend(e.to_string()))?;

        Ok(Self {
            client,
            detect_url,
            embedding_dim,
        })
    }
}

#[async_trait]
impl FaceExtractor for RemoteFaceExtractor {
    async fn extract_faces(&self, image: &[u8]) -> Result<Vec<DetectedFace>, ExtractionError> {
        let response = self
            .client
            .post(self.detect_url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractionError::Timeout
                } else {
                    ExtractionError::Backend(e.to_string())
                }
            })?;

        // The sidecar answers 422 for bytes it cannot decode as an image;
        // that is a property of the input, not of the backend.
        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(ExtractionError::UndecodableImage);
        }
        if !response.status().is_success() {
            return Err(ExtractionError::Backend(format!(
                "inference returned {}",
                response.status()
            )));
        }

        let parsed: DetectResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::Backend(e.to_string()))?;

        for face in &parsed.faces {
            if face.embedding.len() != self.embedding_dim {
                return Err(ExtractionError::BadEmbedding {
                    expected: self.embedding_dim,
                    got: face.embedding.len(),
                });
            }
        }

        debug!("Extracted {} face(s)", parsed.faces.len());
        Ok(parsed.faces)
    }
}
