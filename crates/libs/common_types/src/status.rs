use serde::{Deserialize, Serialize};
use sqlx::Type;
use utoipa::ToSchema;

/// Processing state of a photo's analysis record.
///
/// Valid transitions are enforced through [`AnalysisStatus::can_transition`];
/// every store implementation goes through that single guard rather than
/// scattering status checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "analysis_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Complete,
    Failed,
}

impl AnalysisStatus {
    /// The transition table: PENDING → PROCESSING → {COMPLETE, FAILED},
    /// with FAILED → PROCESSING allowed for retries.
    #[must_use]
    pub const fn can_transition(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending | Self::Failed, Self::Processing)
                | (Self::Processing, Self::Complete | Self::Failed)
        )
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::AnalysisStatus::{Complete, Failed, Pending, Processing};

    #[test]
    fn allows_the_documented_transitions() {
        assert!(Pending.can_transition(Processing));
        assert!(Failed.can_transition(Processing));
        assert!(Processing.can_transition(Complete));
        assert!(Processing.can_transition(Failed));
    }

    #[test]
    fn rejects_skipping_processing() {
        assert!(!Pending.can_transition(Complete));
        assert!(!Pending.can_transition(Failed));
        assert!(!Failed.can_transition(Complete));
    }

    #[test]
    fn rejects_leaving_terminal_complete() {
        assert!(!Complete.can_transition(Processing));
        assert!(!Complete.can_transition(Pending));
        assert!(!Complete.can_transition(Failed));
    }

    #[test]
    fn terminal_states() {
        assert!(Complete.is_terminal());
        assert!(Failed.is_terminal());
        assert!(!Pending.is_terminal());
        assert!(!Processing.is_terminal());
    }
}
