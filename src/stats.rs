use crate::error::GradeError;
use crate::source::{Assignment, DataSource, Student};
use serde::Serialize;

/// Unweighted summary of raw scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Statistics {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

pub fn aggregate(raw_scores: &[f64]) -> Result<Statistics, GradeError> {
    let Some(&first) = raw_scores.first() else {
        return Err(GradeError::EmptyScoreSet);
    };
    let mut sum = 0.0_f64;
    let mut min = first;
    let mut max = first;
    for &v in raw_scores {
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }
    Ok(Statistics {
        mean: sum / (raw_scores.len() as f64),
        min,
        max,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentStats {
    pub assignment_id: String,
    pub title: String,
    pub out_of: f64,
    #[serde(flatten)]
    pub stats: Statistics,
}

/// Per-assignment statistics for everything in scope, in hierarchy order.
#[derive(Debug, Clone, Default)]
pub struct StatsContainer {
    rows: Vec<AssignmentStats>,
}

impl StatsContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes statistics for every assignment over every student.
    ///
    /// A missing score anywhere fails the whole refresh and the previous rows
    /// are kept.
    pub fn refresh<'a, I, D>(
        &mut self,
        assignments: I,
        students: &[Student],
        scores: &D,
    ) -> Result<(), GradeError>
    where
        I: IntoIterator<Item = &'a Assignment>,
        D: DataSource + ?Sized,
    {
        let mut rows = Vec::new();
        for assignment in assignments {
            let raw: Vec<f64> = students
                .iter()
                .map(|s| scores.raw_score(s, assignment))
                .collect::<Result<_, _>>()?;
            rows.push(AssignmentStats {
                assignment_id: assignment.id.clone(),
                title: assignment.title.clone(),
                out_of: assignment.out_of,
                stats: aggregate(&raw)?,
            });
        }
        tracing::debug!(assignments = rows.len(), students = students.len(), "statistics refreshed");
        self.rows = rows;
        Ok(())
    }

    pub fn rows(&self) -> &[AssignmentStats] {
        &self.rows
    }

    pub fn get(&self, assignment_id: &str) -> Option<&Statistics> {
        self.rows
            .iter()
            .find(|r| r.assignment_id == assignment_id)
            .map(|r| &r.stats)
    }
}
