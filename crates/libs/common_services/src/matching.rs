//! Vector matcher policy.
//!
//! The similarity metric is cosine over the embedding space. The store's
//! nearest-neighbor query (pgvector `<=>` under an ivfflat index) and the
//! in-memory store both reduce to the ordering defined here, so the policy
//! is written once as plain functions and unit tested without a database.
//!
//! The index is approximate: callers may only rely on a returned match
//! satisfying the similarity floor, never on it being the exact global
//! optimum.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::cmp::Ordering;
use uuid::Uuid;

/// A person-linked face considered as a match for a fresh embedding.
#[derive(Debug, Clone, FromRow)]
pub struct MatchCandidate {
    pub face_id: Uuid,
    pub person_id: Uuid,
    pub similarity: f64,
    /// When the candidate face was registered; earliest wins ties.
    pub registered_at: DateTime<Utc>,
}

/// Cosine similarity of two vectors, computed in f64. Zero-magnitude
/// vectors yield 0 rather than NaN.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (&x, &y) in a.iter().zip(b) {
        dot += f64::from(x) * f64::from(y);
        norm_a += f64::from(x) * f64::from(x);
        norm_b += f64::from(y) * f64::from(y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Pick the winning candidate: highest similarity, ties broken by earliest
/// registration and then by face id, so repeated calls over the same corpus
/// return the same answer.
pub fn select_best<I>(candidates: I) -> Option<MatchCandidate>
where
    I: IntoIterator<Item = MatchCandidate>,
{
    candidates
        .into_iter()
        .reduce(|best, next| if beats(&next, &best) { next } else { best })
}

fn beats(challenger: &MatchCandidate, incumbent: &MatchCandidate) -> bool {
    match challenger.similarity.partial_cmp(&incumbent.similarity) {
        Some(Ordering::Greater) => true,
        Some(Ordering::Less) | None => false,
        Some(Ordering::Equal) => match challenger.registered_at.cmp(&incumbent.registered_at) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => challenger.face_id < incumbent.face_id,
        },
    }
}

/// The assignment threshold is inclusive: a score exactly at the floor is a
/// match, one below it is not.
#[must_use]
pub fn meets_threshold(similarity: f64, threshold: f32) -> bool {
    similarity >= f64::from(threshold)
}

/// Apply the auto-assignment policy to the store's best candidate.
#[must_use]
pub fn resolve_match(candidate: Option<MatchCandidate>, threshold: f32) -> Option<MatchCandidate> {
    candidate.filter(|c| meets_threshold(c.similarity, threshold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candidate(similarity: f64, registered_secs: i64, face_id: u128) -> MatchCandidate {
        MatchCandidate {
            face_id: Uuid::from_u128(face_id),
            person_id: Uuid::from_u128(face_id + 1000),
            similarity,
            registered_at: Utc.timestamp_opt(registered_secs, 0).unwrap(),
        }
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.3, -0.5, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
    }

    #[test]
    fn cosine_of_zero_vector_is_zero_not_nan() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn highest_similarity_wins() {
        let best = select_best(vec![
            candidate(0.7, 10, 1),
            candidate(0.9, 50, 2),
            candidate(0.8, 1, 3),
        ])
        .unwrap();
        assert_eq!(best.face_id, Uuid::from_u128(2));
    }

    #[test]
    fn similarity_tie_goes_to_earliest_registration() {
        let best = select_best(vec![candidate(0.9, 50, 1), candidate(0.9, 10, 2)]).unwrap();
        assert_eq!(best.face_id, Uuid::from_u128(2));
    }

    #[test]
    fn full_tie_goes_to_lowest_face_id() {
        let best = select_best(vec![candidate(0.9, 10, 7), candidate(0.9, 10, 3)]).unwrap();
        assert_eq!(best.face_id, Uuid::from_u128(3));
    }

    #[test]
    fn selection_is_deterministic_across_repeated_calls() {
        let corpus = vec![
            candidate(0.72, 30, 4),
            candidate(0.72, 30, 9),
            candidate(0.65, 5, 1),
        ];
        let first = select_best(corpus.clone()).unwrap();
        for _ in 0..10 {
            let again = select_best(corpus.clone()).unwrap();
            assert_eq!(again.face_id, first.face_id);
            assert!((again.similarity - first.similarity).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn threshold_is_inclusive_at_the_boundary() {
        let threshold = 0.6_f32;
        let exactly_at = f64::from(threshold);
        assert!(meets_threshold(exactly_at, threshold));
        assert!(!meets_threshold(exactly_at - 1e-9, threshold));
    }

    #[test]
    fn resolve_match_filters_below_threshold() {
        assert!(resolve_match(Some(candidate(0.3, 1, 1)), 0.6).is_none());
        assert!(resolve_match(Some(candidate(0.92, 1, 1)), 0.6).is_some());
        assert!(resolve_match(None, 0.6).is_none());
    }
}
