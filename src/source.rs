//! Contracts between the grading core and whatever supplies its data.
//!
//! The core never reaches for a global workspace: every refresh receives a
//! [`DataSource`] explicitly, and commits go through a [`SchemeStore`].

use crate::error::GradeError;
use crate::scheme::{GradeScheme, Percentage};
use serde::Serialize;
use std::collections::HashMap;

/// Raw scores of one student, keyed by assignment id.
pub type ScoreMap = HashMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: String,
    pub category_id: String,
    pub title: String,
    pub out_of: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub weight: f64,
    pub assignments: Vec<Assignment>,
}

/// Weighted categories of assignments, in display order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AssignmentTree {
    categories: Vec<Category>,
}

impl AssignmentTree {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Every assignment, category by category. Restartable: each call walks
    /// the tree from the top.
    pub fn iterate(&self) -> impl Iterator<Item = &Assignment> + '_ {
        self.categories.iter().flat_map(|c| c.assignments.iter())
    }
}

pub trait PercentageCalculator {
    fn calculate_percentage(
        &self,
        student: &Student,
        scores: &ScoreMap,
    ) -> Result<Percentage, GradeError>;
}

impl PercentageCalculator for AssignmentTree {
    /// Category percentage is `100 * sum(raw) / sum(out_of)`; the result is
    /// the weight-averaged category percentage. Categories with no weight or
    /// nothing to score against are left out; if none remain the result is 0.
    fn calculate_percentage(
        &self,
        student: &Student,
        scores: &ScoreMap,
    ) -> Result<Percentage, GradeError> {
        let mut weighted_sum = 0.0_f64;
        let mut weighted_denom = 0.0_f64;

        for category in self.categories() {
            let mut raw_total = 0.0_f64;
            let mut out_of_total = 0.0_f64;
            for a in &category.assignments {
                let Some(raw) = scores.get(&a.id) else {
                    return Err(GradeError::MissingScore {
                        student_id: student.id.clone(),
                        assignment_id: a.id.clone(),
                    });
                };
                raw_total += raw;
                out_of_total += a.out_of;
            }
            if out_of_total <= 0.0 || category.weight <= 0.0 {
                continue;
            }
            weighted_sum += category.weight * 100.0 * raw_total / out_of_total;
            weighted_denom += category.weight;
        }

        if weighted_denom > 0.0 {
            Ok(Percentage::new(weighted_sum / weighted_denom))
        } else {
            Ok(Percentage::new(0.0))
        }
    }
}

/// Supplies students, the assignment hierarchy and raw scores on demand.
pub trait DataSource {
    fn students(&self) -> Result<Vec<Student>, GradeError>;

    fn assignment_tree(&self) -> Result<AssignmentTree, GradeError>;

    /// Fails with [`GradeError::MissingScore`] when nothing is recorded.
    fn raw_score(&self, student: &Student, assignment: &Assignment) -> Result<f64, GradeError>;

    /// Every recorded score of `student`. Absent assignments are simply not in
    /// the map.
    fn scores_for(&self, student: &Student) -> Result<ScoreMap, GradeError>;
}

/// Owner of the committed grade scheme. `replace_scheme` must be all or
/// nothing: readers see either the old scheme or the new one.
pub trait SchemeStore {
    fn committed_scheme(&self) -> Result<GradeScheme, GradeError>;

    fn replace_scheme(&mut self, scheme: &GradeScheme) -> Result<(), GradeError>;
}

#[cfg(test)]
pub(crate) mod memory {
    use super::*;

    #[derive(Debug, Default)]
    pub struct MemorySource {
        pub students: Vec<Student>,
        pub tree: AssignmentTree,
        pub scores: HashMap<(String, String), f64>,
    }

    impl MemorySource {
        pub fn student(&mut self, id: &str) -> &mut Self {
            self.students.push(Student {
                id: id.to_string(),
                name: format!("Student {}", id),
            });
            self
        }

        pub fn score(&mut self, student_id: &str, assignment_id: &str, raw: f64) -> &mut Self {
            self.scores
                .insert((student_id.to_string(), assignment_id.to_string()), raw);
            self
        }
    }

    /// One category of weight 1 holding the given `(id, out_of)` assignments.
    pub fn flat_tree(assignments: &[(&str, f64)]) -> AssignmentTree {
        AssignmentTree::new(vec![Category {
            id: "cat".to_string(),
            name: "All".to_string(),
            weight: 1.0,
            assignments: assignments
                .iter()
                .map(|(id, out_of)| Assignment {
                    id: id.to_string(),
                    category_id: "cat".to_string(),
                    title: id.to_uppercase(),
                    out_of: *out_of,
                })
                .collect(),
        }])
    }

    impl DataSource for MemorySource {
        fn students(&self) -> Result<Vec<Student>, GradeError> {
            Ok(self.students.clone())
        }

        fn assignment_tree(&self) -> Result<AssignmentTree, GradeError> {
            Ok(self.tree.clone())
        }

        fn raw_score(&self, student: &Student, assignment: &Assignment) -> Result<f64, GradeError> {
            self.scores
                .get(&(student.id.clone(), assignment.id.clone()))
                .copied()
                .ok_or_else(|| GradeError::MissingScore {
                    student_id: student.id.clone(),
                    assignment_id: assignment.id.clone(),
                })
        }

        fn scores_for(&self, student: &Student) -> Result<ScoreMap, GradeError> {
            Ok(self
                .scores
                .iter()
                .filter(|((s, _), _)| *s == student.id)
                .map(|((_, a), v)| (a.clone(), *v))
                .collect())
        }
    }

    pub struct MemoryScope {
        pub scheme: GradeScheme,
        pub fail_next_replace: bool,
    }

    impl SchemeStore for MemoryScope {
        fn committed_scheme(&self) -> Result<GradeScheme, GradeError> {
            Ok(self.scheme.clone())
        }

        fn replace_scheme(&mut self, scheme: &GradeScheme) -> Result<(), GradeError> {
            if self.fail_next_replace {
                self.fail_next_replace = false;
                return Err(GradeError::Storage("disk full".to_string()));
            }
            self.scheme = scheme.clone();
            Ok(())
        }
    }
}
