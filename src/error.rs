use thiserror::Error;

/// Failures of the grading core. All of them are deterministic data or logic
/// errors; none are retried.
#[derive(Debug, Error)]
pub enum GradeError {
    #[error("no grade range contains {percent}")]
    RangeLookup { percent: f64 },

    #[error("grade scheme has no letter grade '{letter}'")]
    UnknownGrade { letter: String },

    #[error("cannot move '{letter}' to {lower_bound}: {reason}")]
    InvalidBoundary {
        letter: String,
        lower_bound: f64,
        reason: String,
    },

    #[error("invalid grade scheme: {0}")]
    InvalidScheme(String),

    #[error("no score recorded for student {student_id} on assignment {assignment_id}")]
    MissingScore {
        student_id: String,
        assignment_id: String,
    },

    #[error("statistics requested over an empty score set")]
    EmptyScoreSet,

    #[error("storage error: {0}")]
    Storage(String),
}

impl GradeError {
    /// Stable wire code reported in IPC error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            GradeError::RangeLookup { .. } => "range_lookup",
            GradeError::UnknownGrade { .. } => "unknown_grade",
            GradeError::InvalidBoundary { .. } => "invalid_boundary",
            GradeError::InvalidScheme(_) => "invalid_scheme",
            GradeError::MissingScore { .. } => "missing_score",
            GradeError::EmptyScoreSet => "empty_score_set",
            GradeError::Storage(_) => "storage",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            GradeError::RangeLookup { percent } => Some(serde_json::json!({ "percent": percent })),
            GradeError::UnknownGrade { letter } => Some(serde_json::json!({ "letter": letter })),
            GradeError::InvalidBoundary {
                letter,
                lower_bound,
                ..
            } => Some(serde_json::json!({ "letter": letter, "lowerBound": lower_bound })),
            GradeError::MissingScore {
                student_id,
                assignment_id,
            } => Some(serde_json::json!({
                "studentId": student_id,
                "assignmentId": assignment_id,
            })),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for GradeError {
    fn from(err: rusqlite::Error) -> Self {
        GradeError::Storage(err.to_string())
    }
}
