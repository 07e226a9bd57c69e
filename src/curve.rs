use crate::error::GradeError;
use crate::scheme::{GradeScheme, LetterGrade, Percentage};
use crate::source::{DataSource, PercentageCalculator, SchemeStore, Student};
use serde::Serialize;

/// One bucket per integer percent, 0 through 100 inclusive.
pub const BUCKET_COUNT: usize = 101;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CurveState {
    Idle,
    Editing,
}

/// One histogram row, ready for a renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramEntry {
    pub percent: u32,
    /// `"<letter> -------"` on the first row of a grade band, blank otherwise.
    pub label: String,
    pub count: usize,
    pub stars: String,
}

/// Speculative curve editing plus the class histogram.
///
/// The committed scheme is never held here; it is passed in by whoever owns
/// it. While editing, a full working copy lives in this model and can be
/// adjusted any number of times before being committed or dropped.
#[derive(Debug, Clone)]
pub struct CurveModel {
    working: Option<GradeScheme>,
    buckets: [usize; BUCKET_COUNT],
}

impl Default for CurveModel {
    fn default() -> Self {
        Self::new()
    }
}

impl CurveModel {
    pub fn new() -> Self {
        Self {
            working: None,
            buckets: [0; BUCKET_COUNT],
        }
    }

    pub fn state(&self) -> CurveState {
        if self.working.is_some() {
            CurveState::Editing
        } else {
            CurveState::Idle
        }
    }

    pub fn working(&self) -> Option<&GradeScheme> {
        self.working.as_ref()
    }

    /// Starts an editing session from `committed`. Does nothing if a session
    /// is already open.
    pub fn begin_edit(&mut self, committed: &GradeScheme) {
        if self.working.is_none() {
            tracing::debug!("curve edit started");
            self.working = Some(committed.clone());
        }
    }

    /// Moves `letter`'s lower bound in the working copy, opening a session
    /// first if needed. A rejected adjustment leaves the working copy as it
    /// was.
    pub fn adjust_boundary(
        &mut self,
        committed: &GradeScheme,
        letter: &LetterGrade,
        new_lower_bound: Percentage,
    ) -> Result<&GradeScheme, GradeError> {
        if self.working.is_none() {
            tracing::debug!("curve edit started");
        }
        let working = self.working.get_or_insert_with(|| committed.clone());
        let next = working.with_adjusted_boundary(letter, new_lower_bound)?;
        tracing::debug!(letter = %letter, lower_bound = %new_lower_bound, "curve adjusted");
        *working = next;
        Ok(&*working)
    }

    /// Pushes the working copy into `store` and closes the session.
    ///
    /// If the store rejects it, the session stays open with the working copy
    /// intact. Committing while idle returns the store's current scheme.
    pub fn commit<S>(&mut self, store: &mut S) -> Result<GradeScheme, GradeError>
    where
        S: SchemeStore + ?Sized,
    {
        let Some(working) = self.working.take() else {
            return store.committed_scheme();
        };
        if let Err(e) = store.replace_scheme(&working) {
            tracing::warn!(error = %e, "curve commit rejected");
            self.working = Some(working);
            return Err(e);
        }
        tracing::info!(ranges = working.ranges().len(), "curve committed");
        Ok(working)
    }

    pub fn discard(&mut self) {
        if self.working.take().is_some() {
            tracing::debug!("curve edit discarded");
        }
    }

    /// Rebuilds every bucket from the students' current percentages.
    ///
    /// Percentages are rounded up to the next integer; anything that lands
    /// outside 0..=100 is counted in the nearest end bucket. On failure the
    /// previous buckets are kept.
    pub fn refresh<D, C>(
        &mut self,
        students: &[Student],
        scores: &D,
        calculator: &C,
    ) -> Result<(), GradeError>
    where
        D: DataSource + ?Sized,
        C: PercentageCalculator + ?Sized,
    {
        let mut buckets = [0usize; BUCKET_COUNT];
        for student in students {
            let map = scores.scores_for(student)?;
            let percent = calculator.calculate_percentage(student, &map)?;
            buckets[bucket_index(percent)] += 1;
        }
        self.buckets = buckets;
        tracing::debug!(students = students.len(), "histogram refreshed");
        Ok(())
    }

    pub fn buckets(&self) -> &[usize; BUCKET_COUNT] {
        &self.buckets
    }

    /// The row for `percent`, labelled against the committed scheme.
    pub fn entry_for(
        &self,
        committed: &GradeScheme,
        percent: u32,
    ) -> Result<HistogramEntry, GradeError> {
        let Some(&count) = self.buckets.get(percent as usize) else {
            return Err(GradeError::RangeLookup {
                percent: f64::from(percent),
            });
        };
        let range = committed.range_containing(Percentage::new(f64::from(percent)))?;
        let label = if range.lower_bound.value() == f64::from(percent) {
            format!("{} -------", range.letter)
        } else {
            String::new()
        };
        Ok(HistogramEntry {
            percent,
            label,
            count,
            stars: " *".repeat(count),
        })
    }

    pub fn entries(&self, committed: &GradeScheme) -> Result<Vec<HistogramEntry>, GradeError> {
        (0..BUCKET_COUNT as u32)
            .map(|p| self.entry_for(committed, p))
            .collect()
    }
}

fn bucket_index(p: Percentage) -> usize {
    let rounded = p.value().ceil();
    if rounded.is_nan() || rounded <= 0.0 {
        0
    } else if rounded >= (BUCKET_COUNT - 1) as f64 {
        BUCKET_COUNT - 1
    } else {
        rounded as usize
    }
}
