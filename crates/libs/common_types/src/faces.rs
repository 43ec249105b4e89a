use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Embedding dimensionality of the default face model. The schema pins the
/// vector column to this width; deployments with a different model must
/// adjust both the migration and `matcher.embedding_dim`.
pub const DEFAULT_EMBEDDING_DIM: usize = 128;

/// Pixel-space location of a detected face within its source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// One face as produced by the embedding extractor: where it is, how sure
/// the detector is, and its fixed-length embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedFace {
    pub bounding_box: BoundingBox,
    pub confidence: f32,
    pub embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_uses_camel_case_wire_names() {
        let bbox = BoundingBox {
            x: 1,
            y: 2,
            width: 30,
            height: 40,
        };
        let json = serde_json::to_value(&bbox).expect("serialize");
        assert_eq!(json["width"], 30);
        assert_eq!(json["height"], 40);
    }
}
